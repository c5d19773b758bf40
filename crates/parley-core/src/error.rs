// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for Parley.

use thiserror::Error;

/// The primary error type used across all Parley adapter traits and pipeline operations.
#[derive(Debug, Error)]
pub enum ParleyError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Relational storage errors (connection, query failure, row decoding).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Key-value store errors (backing the rate limiter and the chatroom cache).
    #[error("key-value store error: {message}")]
    KeyValue {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Job queue errors raised by queue adapters.
    #[error("queue error: {message}")]
    Queue {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Job submission failed after the triggering message was persisted.
    #[error("queue unavailable, please try again later")]
    QueueUnavailable {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Generation service errors (API failure, empty candidates, bad payload).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The resource does not exist or is not owned by the caller.
    #[error("{resource} not found")]
    NotFound { resource: String },

    /// The caller's tier has used up its daily prompt quota.
    #[error("daily prompt limit of {limit} reached")]
    QuotaExceeded { limit: u32 },

    /// Missing or unknown bearer token.
    #[error("unauthorized")]
    Unauthorized,

    /// Request failed input validation.
    #[error("invalid request: {0}")]
    Validation(String),

    /// Request conflicts with existing state (e.g. duplicate mobile number).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ParleyError {
    /// Shorthand for a missing chatroom, the most common lookup failure.
    pub fn chatroom_not_found() -> Self {
        ParleyError::NotFound {
            resource: "chatroom".to_string(),
        }
    }

    /// Returns true if this error is caused by the client rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ParleyError::NotFound { .. }
                | ParleyError::QuotaExceeded { .. }
                | ParleyError::Unauthorized
                | ParleyError::Validation(_)
                | ParleyError::Conflict(_)
        )
    }
}
