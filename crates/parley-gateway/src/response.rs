// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Response envelope and error-to-status mapping.

use std::borrow::Cow;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use parley_core::ParleyError;
use serde::Serialize;

/// Wire shape of every response body.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub ok: bool,
    pub message: Cow<'static, str>,
    pub data: Option<T>,
}

/// Successful response: `{ok: true, message, data}`.
#[derive(Debug)]
pub struct ApiResponse<T> {
    status: StatusCode,
    message: Cow<'static, str>,
    data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            status: StatusCode::OK,
            message: Cow::Borrowed("ok"),
            data,
        }
    }

    pub fn message(mut self, message: impl Into<Cow<'static, str>>) -> Self {
        self.message = message.into();
        self
    }

    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let body = Envelope {
            ok: true,
            message: self.message,
            data: Some(self.data),
        };
        (self.status, Json(body)).into_response()
    }
}

/// Error response: `{ok: false, message, data: null}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: Cow<'static, str>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn status_code(&self) -> StatusCode {
        self.status
    }

    pub fn message_text(&self) -> &str {
        &self.message
    }
}

impl From<ParleyError> for ApiError {
    fn from(err: ParleyError) -> Self {
        match err {
            ParleyError::NotFound { resource } => {
                Self::new(StatusCode::NOT_FOUND, format!("{} not found", capitalize(&resource)))
            }
            ParleyError::QuotaExceeded { limit } => Self::new(
                StatusCode::TOO_MANY_REQUESTS,
                format!("Daily prompt limit of {limit} reached. Upgrade to Pro for unlimited prompts."),
            ),
            ParleyError::QueueUnavailable { .. } => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "Queue unavailable, please try again later.",
            ),
            ParleyError::Unauthorized => Self::unauthorized("Invalid token"),
            ParleyError::Validation(message) => Self::bad_request(message),
            ParleyError::Conflict(message) => Self::new(StatusCode::CONFLICT, message),
            other => {
                tracing::error!(error = %other, "request failed");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Envelope::<()> {
            ok: false,
            message: self.message,
            data: None,
        };
        (self.status, Json(body)).into_response()
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
