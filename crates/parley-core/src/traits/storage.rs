// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Relational storage trait: users, chatrooms, and messages.

use async_trait::async_trait;

use crate::error::ParleyError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{Chatroom, Message, Tier, User};

/// Source of truth for users, chatrooms, and messages.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Initializes the storage backend (migrations, connection).
    async fn initialize(&self) -> Result<(), ParleyError>;

    /// Closes the storage backend, flushing pending writes.
    async fn close(&self) -> Result<(), ParleyError>;

    // --- Users ---

    async fn create_user(&self, mobile: &str, token: &str) -> Result<User, ParleyError>;

    async fn get_user(&self, id: i64) -> Result<Option<User>, ParleyError>;

    async fn get_user_by_token(&self, token: &str) -> Result<Option<User>, ParleyError>;

    async fn get_user_by_mobile(&self, mobile: &str) -> Result<Option<User>, ParleyError>;

    async fn set_user_tier(&self, id: i64, tier: Tier) -> Result<(), ParleyError>;

    // --- Chatrooms ---

    async fn create_chatroom(&self, user_id: i64, title: &str) -> Result<Chatroom, ParleyError>;

    /// Chatrooms owned by `user_id`, newest first.
    async fn list_chatrooms(&self, user_id: i64) -> Result<Vec<Chatroom>, ParleyError>;

    /// The chatroom with `id` if it exists and is owned by `user_id`.
    async fn get_chatroom(&self, id: i64, user_id: i64) -> Result<Option<Chatroom>, ParleyError>;

    // --- Messages ---

    /// All messages of a chatroom ordered by (created_at, id) ascending.
    async fn get_messages(&self, chatroom_id: i64) -> Result<Vec<Message>, ParleyError>;

    /// Persists a user message (processed = false) and returns it with its id.
    async fn insert_user_message(
        &self,
        chatroom_id: i64,
        content: &str,
    ) -> Result<Message, ParleyError>;

    /// Persists an assistant reply to `reply_to`. Returns `None` without
    /// writing if a reply to that message already exists.
    async fn insert_assistant_reply(
        &self,
        chatroom_id: i64,
        reply_to: i64,
        content: &str,
    ) -> Result<Option<Message>, ParleyError>;

    /// The assistant reply to `message_id`, if any.
    async fn find_reply(&self, message_id: i64) -> Result<Option<Message>, ParleyError>;

    /// At most `limit` user messages created before `cutoff` (ISO 8601) that
    /// have no reply and were never enqueued, oldest first.
    async fn unanswered_user_messages(
        &self,
        cutoff: &str,
        limit: usize,
    ) -> Result<Vec<Message>, ParleyError>;
}
