// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bearer-token authentication.
//!
//! Tokens are opaque random strings issued at signup and looked up in
//! storage on every request. The resolved [`User`] is attached to the
//! request as an extension.

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use parley_core::types::User;
use rand::RngCore;

use crate::response::ApiError;
use crate::server::AppState;

/// Length of a signup token in random bytes before hex encoding.
const TOKEN_BYTES: usize = 32;

/// Fresh random bearer token.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// The token from an `Authorization: Bearer <token>` header. The scheme is
/// matched case-insensitively.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get("authorization")?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Middleware resolving the bearer token to a user, or 401.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(token) = bearer_token(request.headers()) else {
        return Err(ApiError::unauthorized("Missing bearer token"));
    };

    let user: User = state
        .storage
        .get_user_by_token(token)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid token"))?;

    tracing::debug!(user_id = user.id, "request authenticated");
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}
