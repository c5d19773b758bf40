// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message submission: quota check, persist, enqueue.

use std::sync::Arc;

use parley_core::types::{Job, JobHandle, Message, User};
use parley_core::{JobQueue, ParleyError, StorageAdapter};
use tracing::{error, info, warn};

use crate::rate_limit::{QuotaPolicy, RateLimiter};

/// Result of a successful submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub message: Message,
    pub job: JobHandle,
}

#[derive(Clone)]
pub struct JobProducer {
    storage: Arc<dyn StorageAdapter>,
    queue: Arc<dyn JobQueue>,
    limiter: RateLimiter,
    quotas: QuotaPolicy,
}

impl JobProducer {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        queue: Arc<dyn JobQueue>,
        limiter: RateLimiter,
        quotas: QuotaPolicy,
    ) -> Self {
        Self {
            storage,
            queue,
            limiter,
            quotas,
        }
    }

    pub fn quotas(&self) -> QuotaPolicy {
        self.quotas
    }

    /// Accept `text` from `user` into `chatroom_id` and schedule the reply.
    ///
    /// Nothing is written unless the chatroom belongs to the user and the
    /// quota allows it. The message is always stored before its job is
    /// enqueued; if enqueueing fails the message stays and the
    /// reconciliation sweep picks it up later.
    pub async fn submit(
        &self,
        user: &User,
        chatroom_id: i64,
        text: &str,
    ) -> Result<Submission, ParleyError> {
        if text.trim().is_empty() {
            return Err(ParleyError::Validation("content must not be empty".to_string()));
        }

        self.storage
            .get_chatroom(chatroom_id, user.id)
            .await?
            .ok_or_else(ParleyError::chatroom_not_found)?;

        if let Some(limit) = self.quotas.limit_for(user.tier) {
            match self.limiter.check_and_increment(user.id, limit).await {
                Ok(true) => {}
                Ok(false) => {
                    info!(user_id = user.id, limit, tier = %user.tier, "daily quota exhausted");
                    return Err(ParleyError::QuotaExceeded { limit });
                }
                Err(e) => {
                    warn!(user_id = user.id, error = %e, "rate limiter unavailable, allowing request");
                }
            }
        }

        let message = self.storage.insert_user_message(chatroom_id, text).await?;

        let job = Job::generate_reply(chatroom_id, message.id);
        let handle = self.queue.enqueue(&job).await.map_err(|e| {
            error!(
                chatroom_id,
                message_id = message.id,
                error = %e,
                "enqueue failed, message left for reconciliation"
            );
            ParleyError::QueueUnavailable {
                source: Box::new(e),
            }
        })?;

        info!(
            user_id = user.id,
            chatroom_id,
            message_id = message.id,
            job_id = %handle,
            "message queued"
        );
        Ok(Submission {
            message,
            job: handle,
        })
    }
}
