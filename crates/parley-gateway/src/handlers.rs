// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers.

use axum::Extension;
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use parley_core::types::{Chatroom, ChatroomSummary, Message, Role, Tier, User};
use parley_core::{HealthStatus, PluginAdapter};
use parley_pipeline::ListingSource;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::generate_token;
use crate::response::{ApiError, ApiResponse};
use crate::server::AppState;

/// Longest accepted mobile number, including a leading `+`.
const MAX_MOBILE_LEN: usize = 20;

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub mobile: String,
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub user_id: i64,
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateChatroomRequest {
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct MessageQueued {
    pub message_id: i64,
    pub job_id: String,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionStatus {
    pub tier: Tier,
    pub status: &'static str,
    /// `None` when the tier is unlimited.
    pub daily_limit: Option<u32>,
    /// `None` when usage could not be read.
    pub used_today: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct MessageView {
    pub id: i64,
    pub role: Role,
    pub content: String,
    pub created_at: String,
}

impl From<Message> for MessageView {
    fn from(msg: Message) -> Self {
        Self {
            id: msg.id,
            role: msg.role,
            content: msg.content,
            created_at: msg.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChatroomDetailView {
    pub id: i64,
    pub title: String,
    pub created_at: String,
    pub messages: Vec<MessageView>,
}

#[derive(Debug, Serialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
    pub components: Vec<ComponentHealth>,
}

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}

fn validate_mobile(raw: &str) -> Result<String, ApiError> {
    let mobile = raw.trim();
    let digits = mobile.strip_prefix('+').unwrap_or(mobile);
    if digits.is_empty() || mobile.len() > MAX_MOBILE_LEN || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ApiError::bad_request(
            "mobile must be digits with an optional leading '+'",
        ));
    }
    Ok(mobile.to_string())
}

/// GET /
pub async fn root() -> ApiResponse<serde_json::Value> {
    ApiResponse::ok(serde_json::json!({ "version": env!("CARGO_PKG_VERSION") }))
        .message("Parley API")
}

async fn check_component<A: PluginAdapter + ?Sized>(adapter: &A) -> (ComponentHealth, bool) {
    let (status, healthy) = match adapter.health_check().await {
        Ok(HealthStatus::Healthy) => ("healthy".to_string(), true),
        Ok(HealthStatus::Degraded(reason)) => (format!("degraded: {reason}"), true),
        Ok(HealthStatus::Unhealthy(reason)) => (format!("unhealthy: {reason}"), false),
        Err(e) => (format!("unhealthy: {e}"), false),
    };
    (
        ComponentHealth {
            name: adapter.name().to_string(),
            status,
        },
        healthy,
    )
}

/// GET /health
///
/// 503 when storage or the queue is down. A down key-value store only
/// degrades the report since the limiter and cache fail open.
pub async fn health(State(state): State<AppState>) -> Response {
    let (storage, storage_ok) = check_component(state.storage.as_ref()).await;
    let (queue, queue_ok) = check_component(state.queue.as_ref()).await;
    let (kv, kv_ok) = check_component(state.kv.as_ref()).await;

    let (status, code) = match (storage_ok && queue_ok, kv_ok) {
        (true, true) => ("ok", StatusCode::OK),
        (true, false) => ("degraded", StatusCode::OK),
        (false, _) => ("unavailable", StatusCode::SERVICE_UNAVAILABLE),
    };
    let report = HealthReport {
        status,
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.started_at.elapsed().as_secs(),
        components: vec![storage, queue, kv],
    };
    ApiResponse::ok(report)
        .message(status)
        .status(code)
        .into_response()
}

/// POST /auth/signup
pub async fn signup(
    State(state): State<AppState>,
    body: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<ApiResponse<SignupResponse>, ApiError> {
    let body = json_body(body)?;
    let mobile = validate_mobile(&body.mobile)?;
    let token = generate_token();
    let user = state.storage.create_user(&mobile, &token).await?;
    info!(user_id = user.id, "user signed up");
    Ok(ApiResponse::ok(SignupResponse {
        user_id: user.id,
        token,
    })
    .message("User created")
    .status(StatusCode::CREATED))
}

/// GET /user/me
pub async fn me(Extension(user): Extension<User>) -> ApiResponse<serde_json::Value> {
    ApiResponse::ok(serde_json::json!({ "user": user }))
}

/// GET /subscription/status
pub async fn subscription_status(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> ApiResponse<SubscriptionStatus> {
    let daily_limit = state.producer.quotas().limit_for(user.tier);
    let used_today = match daily_limit {
        Some(_) => match state.limiter.usage_today(user.id).await {
            Ok(used) => Some(used),
            Err(e) => {
                warn!(user_id = user.id, error = %e, "could not read quota usage");
                None
            }
        },
        None => None,
    };
    ApiResponse::ok(SubscriptionStatus {
        tier: user.tier,
        status: match user.tier {
            Tier::Pro => "active",
            Tier::Basic => "inactive",
        },
        daily_limit,
        used_today,
    })
}

/// POST /chatroom
pub async fn create_chatroom(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    body: Result<Json<CreateChatroomRequest>, JsonRejection>,
) -> Result<ApiResponse<serde_json::Value>, ApiError> {
    let body = json_body(body)?;
    let room: Chatroom = state.chatrooms.create(&user, &body.title).await?;
    let summary = ChatroomSummary::from(&room);
    Ok(ApiResponse::ok(serde_json::json!({ "chatroom": summary }))
        .message("Chatroom created")
        .status(StatusCode::CREATED))
}

/// GET /chatroom
pub async fn list_chatrooms(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<ApiResponse<serde_json::Value>, ApiError> {
    let (rooms, source) = state.chatrooms.list(&user).await?;
    let message = match source {
        ListingSource::Cache => "ok (cache)",
        ListingSource::Storage => "ok",
    };
    Ok(ApiResponse::ok(serde_json::json!({ "chatrooms": rooms })).message(message))
}

/// GET /chatroom/{id}
pub async fn get_chatroom(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<i64>,
) -> Result<ApiResponse<serde_json::Value>, ApiError> {
    let detail = state.chatrooms.detail(&user, id).await?;
    let view = ChatroomDetailView {
        id: detail.chatroom.id,
        title: detail.chatroom.title,
        created_at: detail.chatroom.created_at,
        messages: detail.messages.into_iter().map(MessageView::from).collect(),
    };
    Ok(ApiResponse::ok(serde_json::json!({ "chatroom": view })))
}

/// POST /chatroom/{id}/message
pub async fn send_message(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<i64>,
    body: Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<ApiResponse<MessageQueued>, ApiError> {
    let body = json_body(body)?;
    let submission = state.producer.submit(&user, id, &body.content).await?;
    Ok(ApiResponse::ok(MessageQueued {
        message_id: submission.message.id,
        job_id: submission.job.0,
    })
    .message("Message queued")
    .status(StatusCode::ACCEPTED))
}
