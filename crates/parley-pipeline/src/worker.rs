// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reply generation worker.
//!
//! A worker claims one job at a time, rebuilds the conversation up to the
//! triggering message, asks the generation service for a reply, and stores
//! it. Generation problems never fail a job: the stored reply becomes
//! [`FALLBACK_REPLY`] instead. Storage problems fail the job so the queue
//! delivers it again.

use std::sync::Arc;
use std::time::Duration;

use parley_core::types::{
    ChatTurn, GenerationRequest, Job, Message, QueuedJob, Role, TASK_GENERATE_REPLY,
};
use parley_core::{GenerationService, JobQueue, ParleyError, StorageAdapter};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Stored as the assistant reply when generation fails or returns nothing.
pub const FALLBACK_REPLY: &str = "Sorry, I couldn't generate a response. Please try again later.";

/// What processing a job amounted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// A new assistant reply was stored.
    Replied { reply: Message },
    /// The trigger already had a reply; generation was skipped.
    AlreadyAnswered { reply_id: i64 },
    /// Another delivery stored a reply between the check and the insert.
    LostRace,
    /// The chatroom has no user message to answer.
    NoTrigger,
    /// The job names a task this worker does not run.
    UnknownTask(String),
}

/// Index of the message to answer: `message_id` if present, otherwise the
/// latest user message.
pub fn select_trigger(messages: &[Message], message_id: i64) -> Option<usize> {
    messages
        .iter()
        .position(|m| m.id == message_id)
        .or_else(|| messages.iter().rposition(|m| m.role == Role::User))
}

/// The last `limit` messages strictly before `trigger`, oldest first.
///
/// `messages` must already be in `(created_at, id)` order.
pub fn build_history(messages: &[Message], trigger: usize, limit: usize) -> Vec<ChatTurn> {
    let earlier = &messages[..trigger.min(messages.len())];
    let start = earlier.len().saturating_sub(limit);
    earlier[start..].iter().map(ChatTurn::from).collect()
}

pub struct Worker {
    storage: Arc<dyn StorageAdapter>,
    queue: Arc<dyn JobQueue>,
    generator: Arc<dyn GenerationService>,
    history_limit: usize,
    poll_interval: Duration,
}

impl Worker {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        queue: Arc<dyn JobQueue>,
        generator: Arc<dyn GenerationService>,
    ) -> Self {
        Self {
            storage,
            queue,
            generator,
            history_limit: 20,
            poll_interval: Duration::from_millis(500),
        }
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Produce and store the reply for one job.
    pub async fn process(&self, job: &Job) -> Result<JobOutcome, ParleyError> {
        if job.task != TASK_GENERATE_REPLY {
            return Ok(JobOutcome::UnknownTask(job.task.clone()));
        }

        let messages = self.storage.get_messages(job.chatroom_id).await?;
        let Some(trigger_idx) = select_trigger(&messages, job.message_id) else {
            return Ok(JobOutcome::NoTrigger);
        };
        let trigger = &messages[trigger_idx];
        if trigger.id != job.message_id {
            warn!(
                chatroom_id = job.chatroom_id,
                message_id = job.message_id,
                fallback_id = trigger.id,
                "triggering message missing, answering latest user message"
            );
        }

        if let Some(existing) = self.storage.find_reply(trigger.id).await? {
            return Ok(JobOutcome::AlreadyAnswered {
                reply_id: existing.id,
            });
        }

        let request = GenerationRequest {
            prompt: trigger.content.clone(),
            history: build_history(&messages, trigger_idx, self.history_limit),
        };
        let turns = request.history.len();
        let text = match self.generator.generate(request).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                warn!(message_id = trigger.id, "generation returned empty text, using fallback");
                FALLBACK_REPLY.to_string()
            }
            Err(e) => {
                warn!(message_id = trigger.id, error = %e, "generation failed, using fallback");
                FALLBACK_REPLY.to_string()
            }
        };
        debug!(message_id = trigger.id, history_turns = turns, "reply generated");

        match self
            .storage
            .insert_assistant_reply(job.chatroom_id, trigger.id, &text)
            .await?
        {
            Some(reply) => Ok(JobOutcome::Replied { reply }),
            None => Ok(JobOutcome::LostRace),
        }
    }

    /// Process a claimed job and settle it with the queue.
    pub async fn handle(&self, queued: QueuedJob) {
        let job = &queued.job;
        match self.process(job).await {
            Ok(outcome) => {
                match &outcome {
                    JobOutcome::Replied { reply } => info!(
                        job_id = %queued.handle,
                        chatroom_id = job.chatroom_id,
                        message_id = job.message_id,
                        reply_id = reply.id,
                        "reply stored"
                    ),
                    JobOutcome::NoTrigger => warn!(
                        job_id = %queued.handle,
                        chatroom_id = job.chatroom_id,
                        "no user message to answer, skipping job"
                    ),
                    JobOutcome::UnknownTask(task) => warn!(
                        job_id = %queued.handle,
                        task = %task,
                        "unknown task, skipping job"
                    ),
                    JobOutcome::AlreadyAnswered { .. } | JobOutcome::LostRace => debug!(
                        job_id = %queued.handle,
                        message_id = job.message_id,
                        "message already answered"
                    ),
                }
                if let Err(e) = self.queue.ack(&queued).await {
                    error!(job_id = %queued.handle, error = %e, "failed to ack job");
                }
            }
            Err(e) => {
                error!(
                    job_id = %queued.handle,
                    chatroom_id = job.chatroom_id,
                    message_id = job.message_id,
                    attempts = queued.attempts,
                    error = %e,
                    "job failed"
                );
                if let Err(e) = self.queue.fail(&queued).await {
                    error!(job_id = %queued.handle, error = %e, "failed to mark job failed");
                }
            }
        }
    }

    /// Claim and handle at most one job. Returns whether a job was found.
    pub async fn run_once(&self) -> Result<bool, ParleyError> {
        match self.queue.dequeue().await? {
            Some(queued) => {
                self.handle(queued).await;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Loop until `shutdown` fires. An in-flight job always finishes first.
    pub async fn run(&self, worker_id: usize, shutdown: CancellationToken) {
        info!(worker_id, "worker started");
        while !shutdown.is_cancelled() {
            let idle = match self.run_once().await {
                Ok(found) => !found,
                Err(e) => {
                    error!(worker_id, error = %e, "dequeue failed");
                    true
                }
            };
            if idle {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(self.poll_interval) => {}
                }
            }
        }
        info!(worker_id, "worker stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn msg(id: i64, role: Role) -> Message {
        Message {
            id,
            chatroom_id: 1,
            role,
            content: format!("m{id}"),
            created_at: format!("2026-01-01T00:00:{:02}.000Z", id % 60),
            processed: role == Role::Assistant,
            reply_to: None,
        }
    }

    fn alternating(n: i64) -> Vec<Message> {
        (1..=n)
            .map(|id| msg(id, if id % 2 == 1 { Role::User } else { Role::Assistant }))
            .collect()
    }

    #[test]
    fn twenty_five_prior_messages_keep_last_twenty() {
        let mut messages = alternating(25);
        messages.push(msg(26, Role::User));
        let history = build_history(&messages, 25, 20);
        assert_eq!(history.len(), 20);
        assert_eq!(history[0].content, "m6");
        assert_eq!(history[19].content, "m25");
        assert_eq!(history[0].role, Role::Assistant);
    }

    #[test]
    fn empty_chatroom_has_empty_history() {
        let messages = vec![msg(1, Role::User)];
        assert_eq!(select_trigger(&messages, 1), Some(0));
        assert!(build_history(&messages, 0, 20).is_empty());
    }

    #[test]
    fn missing_trigger_falls_back_to_latest_user_message() {
        let messages = vec![msg(1, Role::User), msg(2, Role::Assistant), msg(3, Role::User), msg(4, Role::Assistant)];
        assert_eq!(select_trigger(&messages, 99), Some(2));
        assert_eq!(select_trigger(&[msg(2, Role::Assistant)], 99), None);
        assert_eq!(select_trigger(&[], 1), None);
    }

    #[test]
    fn history_excludes_messages_after_trigger() {
        let messages = alternating(6);
        let history = build_history(&messages, 2, 20);
        let contents: Vec<&str> = history.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["m1", "m2"]);
    }

    proptest! {
        #[test]
        fn history_is_the_tail_before_the_trigger(
            len in 1usize..80,
            trigger_seed in any::<usize>(),
            limit in 1usize..40,
        ) {
            let messages = alternating(len as i64);
            let trigger = trigger_seed % len;
            let history = build_history(&messages, trigger, limit);

            prop_assert_eq!(history.len(), trigger.min(limit));
            let expected: Vec<ChatTurn> = messages[trigger - history.len()..trigger]
                .iter()
                .map(ChatTurn::from)
                .collect();
            prop_assert_eq!(history, expected);
        }
    }
}
