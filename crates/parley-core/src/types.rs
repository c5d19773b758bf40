// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by storage, pipeline, gateway, and client crates.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Task identifier carried by reply-generation jobs.
pub const TASK_GENERATE_REPLY: &str = "generate_reply";

/// Author of a message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Subscription level of a user. Gates whether a daily quota applies.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    #[default]
    Basic,
    Pro,
}

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub mobile: String,
    pub tier: Tier,
    /// Bearer token issued at signup.
    #[serde(skip_serializing, default)]
    pub token: String,
    pub created_at: String,
}

/// A chat session owned by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chatroom {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub created_at: String,
}

/// Listing view of a chatroom. This is the cached snapshot element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatroomSummary {
    pub id: i64,
    pub title: String,
    pub created_at: String,
}

impl From<&Chatroom> for ChatroomSummary {
    fn from(room: &Chatroom) -> Self {
        Self {
            id: room.id,
            title: room.title.clone(),
            created_at: room.created_at.clone(),
        }
    }
}

/// A persisted chat message. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub chatroom_id: i64,
    pub role: Role,
    pub content: String,
    /// ISO 8601 timestamp with millisecond precision.
    pub created_at: String,
    /// True on assistant replies.
    pub processed: bool,
    /// For assistant replies: the user message this reply answers.
    pub reply_to: Option<i64>,
}

/// One (role, content) entry of the conversation context handed to the
/// generation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl From<&Message> for ChatTurn {
    fn from(msg: &Message) -> Self {
        Self {
            role: msg.role,
            content: msg.content.clone(),
        }
    }
}

/// Input to a generation service call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    /// Text of the triggering user message.
    pub prompt: String,
    /// Earlier turns, oldest first.
    pub history: Vec<ChatTurn>,
}

/// Unit of deferred work: generate a reply for one user message.
///
/// Carries only identifiers; the worker reloads everything else from storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub task: String,
    pub chatroom_id: i64,
    pub message_id: i64,
}

impl Job {
    pub fn generate_reply(chatroom_id: i64, message_id: i64) -> Self {
        Self {
            task: TASK_GENERATE_REPLY.to_string(),
            chatroom_id,
            message_id,
        }
    }
}

/// Opaque handle returned to the submitter of a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobHandle(pub String);

impl std::fmt::Display for JobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A job handed out by a queue, locked to the receiving worker until
/// acknowledged or failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedJob {
    /// Queue-internal entry id used for ack/fail.
    pub entry_id: i64,
    pub handle: JobHandle,
    pub job: Job,
    /// Number of previous failed or abandoned deliveries.
    pub attempts: u32,
    /// Token of this delivery. Ack and fail are ignored once it is stale.
    pub lease: String,
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a trait object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Storage,
    KeyValue,
    Queue,
    Generation,
}
