// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP API for Parley.
//!
//! Every response uses the `{ok, message, data}` envelope. Routes other than
//! `/`, `/health`, `/auth/signup` and `/webhook/billing` require
//! `Authorization: Bearer <token>`.

pub mod auth;
pub mod billing;
pub mod handlers;
pub mod response;
pub mod server;

pub use billing::BillingSettings;
pub use response::{ApiError, ApiResponse};
pub use server::{AppState, ServerConfig, build_router, start_server};
