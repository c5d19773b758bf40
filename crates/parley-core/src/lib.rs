// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for Parley.
//!
//! This crate provides the error type, domain types, and adapter traits used
//! throughout the workspace. Storage, key-value, queue, and generation
//! backends implement the traits defined here.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::ParleyError;
pub use types::{
    AdapterType, ChatTurn, Chatroom, ChatroomSummary, GenerationRequest, HealthStatus, Job,
    JobHandle, Message, QueuedJob, Role, Tier, User,
};

pub use traits::{GenerationService, JobQueue, KvStore, PluginAdapter, StorageAdapter};

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn role_parses_case_insensitively() {
        assert_eq!(Role::from_str("user").unwrap(), Role::User);
        assert_eq!(Role::from_str("Assistant").unwrap(), Role::Assistant);
        assert!(Role::from_str("model").is_err());
        assert_eq!(Role::Assistant.to_string(), "assistant");
    }

    #[test]
    fn tier_serializes_lowercase() {
        let json = serde_json::to_string(&Tier::Pro).unwrap();
        assert_eq!(json, "\"pro\"");
        assert_eq!(Tier::default(), Tier::Basic);
        assert_eq!(Tier::from_str("BASIC").unwrap(), Tier::Basic);
    }

    #[test]
    fn job_wire_format_carries_only_identifiers() {
        let job = Job::generate_reply(7, 42);
        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"task": "generate_reply", "chatroom_id": 7, "message_id": 42})
        );
    }

    #[test]
    fn chat_turn_drops_everything_but_role_and_content() {
        let msg = Message {
            id: 3,
            chatroom_id: 1,
            role: Role::Assistant,
            content: "hi".into(),
            created_at: "2026-01-01T00:00:00.000Z".into(),
            processed: true,
            reply_to: Some(2),
        };
        let turn = ChatTurn::from(&msg);
        assert_eq!(
            turn,
            ChatTurn {
                role: Role::Assistant,
                content: "hi".into()
            }
        );
    }

    #[test]
    fn user_token_is_never_serialized() {
        let user = User {
            id: 1,
            mobile: "+15550100".into(),
            tier: Tier::Basic,
            token: "secret".into(),
            created_at: "2026-01-01T00:00:00.000Z".into(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret"));
    }

    #[test]
    fn client_errors_are_classified() {
        assert!(ParleyError::chatroom_not_found().is_client_error());
        assert!(ParleyError::QuotaExceeded { limit: 5 }.is_client_error());
        assert!(
            !ParleyError::QueueUnavailable {
                source: "redis down".into()
            }
            .is_client_error()
        );
        assert_eq!(
            ParleyError::chatroom_not_found().to_string(),
            "chatroom not found"
        );
    }
}
