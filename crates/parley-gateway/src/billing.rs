// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Payment-provider boundary.
//!
//! `POST /subscribe/pro` hands out a hosted checkout link tagged with the
//! caller's user id. The provider later calls `POST /webhook/billing` with a
//! body signed by the shared secret; a completed checkout upgrades the
//! referenced user to [`Tier::Pro`].

use axum::Extension;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use hmac::{Hmac, Mac};
use parley_core::ParleyError;
use parley_core::types::{Tier, User};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::{debug, info, warn};

use crate::response::{ApiError, ApiResponse};
use crate::server::AppState;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the hex HMAC-SHA256 of the raw webhook body.
pub const SIGNATURE_HEADER: &str = "x-parley-signature";

/// Event type that upgrades a user.
pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";

/// Billing routes are disabled while their setting is `None`.
#[derive(Debug, Clone, Default)]
pub struct BillingSettings {
    pub checkout_url: Option<String>,
    pub webhook_secret: Option<String>,
}

/// Webhook body.
#[derive(Debug, Deserialize)]
pub struct BillingEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub user_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct CheckoutLink {
    pub checkout_url: String,
}

#[derive(Debug, Serialize)]
pub struct WebhookReceipt {
    pub received: bool,
    pub upgraded: bool,
}

/// Hex HMAC-SHA256 of `body` under `secret`.
pub fn sign(secret: &str, body: &[u8]) -> Result<String, ParleyError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| ParleyError::Internal(format!("invalid webhook key: {e}")))?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time check of a hex signature.
pub fn verify(secret: &str, body: &[u8], signature: &str) -> bool {
    let Ok(expected) = hex::decode(signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

fn checkout_link(base: &str, user_id: i64) -> String {
    let sep = if base.contains('?') { '&' } else { '?' };
    format!("{base}{sep}client_reference_id={user_id}")
}

/// POST /subscribe/pro
pub async fn subscribe_pro(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<ApiResponse<CheckoutLink>, ApiError> {
    if user.tier == Tier::Pro {
        return Err(ParleyError::Conflict("Already subscribed to Pro".to_string()).into());
    }
    let Some(base) = state.billing.checkout_url.as_deref() else {
        return Err(ApiError::bad_request("Billing not configured"));
    };
    Ok(ApiResponse::ok(CheckoutLink {
        checkout_url: checkout_link(base, user.id),
    })
    .message("Checkout created"))
}

/// POST /webhook/billing
pub async fn billing_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<ApiResponse<WebhookReceipt>, ApiError> {
    let Some(secret) = state.billing.webhook_secret.as_deref() else {
        return Err(ApiError::new(StatusCode::NOT_FOUND, "Billing not configured"));
    };
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !verify(secret, &body, signature) {
        warn!("billing webhook with invalid signature");
        return Err(ApiError::bad_request("Invalid signature"));
    }

    let event: BillingEvent = serde_json::from_slice(&body)
        .map_err(|e| ApiError::bad_request(format!("invalid event: {e}")))?;

    let mut upgraded = false;
    match (event.kind.as_str(), event.user_id) {
        (CHECKOUT_COMPLETED, Some(user_id)) => match state.storage.get_user(user_id).await? {
            Some(user) if user.tier == Tier::Pro => {
                debug!(user_id, "user already on pro");
            }
            Some(_) => {
                state.storage.set_user_tier(user_id, Tier::Pro).await?;
                info!(user_id, "user upgraded to pro");
                upgraded = true;
            }
            None => warn!(user_id, "checkout completed for unknown user"),
        },
        (kind, user_id) => debug!(kind, ?user_id, "billing event ignored"),
    }

    Ok(ApiResponse::ok(WebhookReceipt {
        received: true,
        upgraded,
    })
    .message("received"))
}
