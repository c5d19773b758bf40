// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chatroom creation, cached listing, and detail reads.

use std::sync::Arc;

use parley_core::types::{Chatroom, ChatroomSummary, Message, User};
use parley_core::{ParleyError, StorageAdapter};
use tracing::debug;

use crate::cache::ChatroomCache;

/// Longest accepted chatroom title, in characters.
pub const MAX_TITLE_CHARS: usize = 255;

/// Where a listing came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingSource {
    Cache,
    Storage,
}

/// A chatroom together with its ordered messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatroomDetail {
    pub chatroom: Chatroom,
    pub messages: Vec<Message>,
}

#[derive(Clone)]
pub struct ChatroomService {
    storage: Arc<dyn StorageAdapter>,
    cache: ChatroomCache,
}

impl ChatroomService {
    pub fn new(storage: Arc<dyn StorageAdapter>, cache: ChatroomCache) -> Self {
        Self { storage, cache }
    }

    /// Create a chatroom and drop the owner's cached listing.
    pub async fn create(&self, user: &User, title: &str) -> Result<Chatroom, ParleyError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ParleyError::Validation("title must not be empty".to_string()));
        }
        if title.chars().count() > MAX_TITLE_CHARS {
            return Err(ParleyError::Validation(format!(
                "title must be at most {MAX_TITLE_CHARS} characters"
            )));
        }

        let room = self.storage.create_chatroom(user.id, title).await?;
        self.cache.invalidate(user.id).await;
        debug!(user_id = user.id, chatroom_id = room.id, "chatroom created");
        Ok(room)
    }

    /// The user's chatrooms, newest first, served from cache when possible.
    pub async fn list(
        &self,
        user: &User,
    ) -> Result<(Vec<ChatroomSummary>, ListingSource), ParleyError> {
        if let Some(cached) = self.cache.get(user.id).await {
            return Ok((cached, ListingSource::Cache));
        }

        let rooms = self.storage.list_chatrooms(user.id).await?;
        let summaries: Vec<ChatroomSummary> = rooms.iter().map(ChatroomSummary::from).collect();
        self.cache.put(user.id, &summaries, self.cache.ttl()).await;
        Ok((summaries, ListingSource::Storage))
    }

    /// Chatroom `id` with its messages, if owned by `user`.
    pub async fn detail(&self, user: &User, id: i64) -> Result<ChatroomDetail, ParleyError> {
        let chatroom = self
            .storage
            .get_chatroom(id, user.id)
            .await?
            .ok_or_else(ParleyError::chatroom_not_found)?;
        let messages = self.storage.get_messages(chatroom.id).await?;
        Ok(ChatroomDetail { chatroom, messages })
    }
}
