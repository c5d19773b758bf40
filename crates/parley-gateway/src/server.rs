// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.

use std::sync::Arc;
use std::time::Instant;

use axum::routing::{get, post};
use axum::{Router, middleware as axum_middleware};
use parley_core::{JobQueue, KvStore, ParleyError, StorageAdapter};
use parley_pipeline::{ChatroomService, JobProducer, RateLimiter};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::auth_middleware;
use crate::billing::{self, BillingSettings};
use crate::handlers;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn StorageAdapter>,
    pub kv: Arc<dyn KvStore>,
    pub queue: Arc<dyn JobQueue>,
    pub producer: JobProducer,
    pub chatrooms: ChatroomService,
    pub limiter: RateLimiter,
    pub billing: BillingSettings,
    /// Process start time for uptime reporting.
    pub started_at: Instant,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// All routes with CORS and request tracing applied.
pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/auth/signup", post(handlers::signup))
        .route("/webhook/billing", post(billing::billing_webhook));

    let api_routes = Router::new()
        .route("/user/me", get(handlers::me))
        .route("/subscription/status", get(handlers::subscription_status))
        .route("/subscribe/pro", post(billing::subscribe_pro))
        .route(
            "/chatroom",
            post(handlers::create_chatroom).get(handlers::list_chatrooms),
        )
        .route("/chatroom/{id}", get(handlers::get_chatroom))
        .route("/chatroom/{id}/message", post(handlers::send_message))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve until `shutdown` is cancelled.
pub async fn start_server(
    config: &ServerConfig,
    state: AppState,
    shutdown: CancellationToken,
) -> Result<(), ParleyError> {
    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ParleyError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| ParleyError::Internal(format!("gateway server error: {e}")))?;

    tracing::info!("gateway stopped");
    Ok(())
}
