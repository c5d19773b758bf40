// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded polling for the assistant reply to a submitted message.
//!
//! Replies are produced asynchronously, so after submitting a message the
//! client re-reads the chatroom until a non-user message newer than the
//! submitted one appears. Each pass is bounded. When a pass runs out the
//! message stays pending and [`Poller::refresh`] can run another pass.

use std::time::Duration;

use async_trait::async_trait;
use parley_config::model::ClientConfig;
use parley_core::types::Role;
use tracing::{debug, warn};

use crate::api::{ApiClient, ChatroomDetail, MessageInfo};
use crate::error::ClientError;

/// Anything that can fetch a chatroom with its messages.
#[async_trait]
pub trait ChatroomSource: Send + Sync {
    async fn fetch_chatroom(&self, chatroom_id: i64) -> Result<ChatroomDetail, ClientError>;
}

#[async_trait]
impl ChatroomSource for ApiClient {
    async fn fetch_chatroom(&self, chatroom_id: i64) -> Result<ChatroomDetail, ClientError> {
        self.chatroom(chatroom_id).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    /// Attempts right after sending.
    pub send_attempts: u32,
    /// Attempts per manual refresh.
    pub refresh_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(500),
            send_attempts: 80,
            refresh_attempts: 60,
        }
    }
}

impl From<&ClientConfig> for PollConfig {
    fn from(config: &ClientConfig) -> Self {
        Self {
            interval: Duration::from_millis(config.poll_interval_ms),
            send_attempts: config.send_attempts,
            refresh_attempts: config.refresh_attempts,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Replied(MessageInfo),
    /// The pass ran out of attempts. Not an error.
    StillProcessing,
}

/// A submitted message still waiting for its reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pending {
    pub chatroom_id: i64,
    pub message_id: i64,
}

/// First non-user message with an id greater than `after`.
pub fn find_reply(messages: &[MessageInfo], after: i64) -> Option<&MessageInfo> {
    messages.iter().find(|m| m.role != Role::User && m.id > after)
}

pub struct Poller<S> {
    source: S,
    config: PollConfig,
    pending: Option<Pending>,
}

impl<S: ChatroomSource> Poller<S> {
    pub fn new(source: S, config: PollConfig) -> Self {
        Self {
            source,
            config,
            pending: None,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn pending(&self) -> Option<Pending> {
        self.pending
    }

    /// Remember `message_id` and poll for its reply.
    pub async fn wait_for_reply(&mut self, chatroom_id: i64, message_id: i64) -> PollOutcome {
        let pending = Pending {
            chatroom_id,
            message_id,
        };
        self.pending = Some(pending);
        self.poll(pending, self.config.send_attempts).await
    }

    /// Poll again for the pending message. `None` when nothing is pending.
    pub async fn refresh(&mut self) -> Option<PollOutcome> {
        let pending = self.pending?;
        Some(self.poll(pending, self.config.refresh_attempts).await)
    }

    async fn poll(&mut self, pending: Pending, attempts: u32) -> PollOutcome {
        for attempt in 1..=attempts {
            tokio::time::sleep(self.config.interval).await;
            let detail = match self.source.fetch_chatroom(pending.chatroom_id).await {
                Ok(detail) => detail,
                Err(e) => {
                    warn!(attempt, chatroom_id = pending.chatroom_id, error = %e, "poll fetch failed");
                    continue;
                }
            };
            if let Some(reply) = find_reply(&detail.messages, pending.message_id) {
                debug!(attempt, reply_id = reply.id, "reply arrived");
                let reply = reply.clone();
                self.pending = None;
                return PollOutcome::Replied(reply);
            }
        }
        PollOutcome::StillProcessing
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn msg(id: i64, role: Role) -> MessageInfo {
        MessageInfo {
            id,
            role,
            content: format!("m{id}"),
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
        }
    }

    fn detail(messages: Vec<MessageInfo>) -> ChatroomDetail {
        ChatroomDetail {
            id: 1,
            title: "t".to_string(),
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
            messages,
        }
    }

    /// Serves scripted responses, repeating the last one.
    struct Scripted {
        responses: Mutex<VecDeque<Result<ChatroomDetail, ClientError>>>,
        last: ChatroomDetail,
        calls: AtomicU32,
    }

    impl Scripted {
        fn new(responses: Vec<Result<ChatroomDetail, ClientError>>, last: ChatroomDetail) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                last,
                calls: AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ChatroomSource for Scripted {
        async fn fetch_chatroom(&self, _chatroom_id: i64) -> Result<ChatroomDetail, ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.responses.lock().unwrap().pop_front() {
                Some(response) => response,
                None => Ok(self.last.clone()),
            }
        }
    }

    fn quick() -> PollConfig {
        PollConfig {
            interval: Duration::from_millis(500),
            send_attempts: 4,
            refresh_attempts: 3,
        }
    }

    #[test]
    fn reply_must_be_newer_and_not_from_user() {
        let messages = vec![
            msg(1, Role::User),
            msg(2, Role::Assistant),
            msg(3, Role::User),
            msg(4, Role::User),
        ];
        assert_eq!(find_reply(&messages, 3), None);
        assert_eq!(find_reply(&messages, 1).map(|m| m.id), Some(2));

        let mut later = messages.clone();
        later.push(msg(5, Role::Assistant));
        assert_eq!(find_reply(&later, 3).map(|m| m.id), Some(5));
    }

    #[tokio::test(start_paused = true)]
    async fn reply_on_third_fetch() {
        let waiting = detail(vec![msg(7, Role::User)]);
        let source = Scripted::new(
            vec![Ok(waiting.clone()), Ok(waiting)],
            detail(vec![msg(7, Role::User), msg(8, Role::Assistant)]),
        );
        let mut poller = Poller::new(source, quick());

        let started = tokio::time::Instant::now();
        let outcome = poller.wait_for_reply(1, 7).await;
        assert_eq!(outcome, PollOutcome::Replied(msg(8, Role::Assistant)));
        assert_eq!(poller.source().calls(), 3);
        assert_eq!(started.elapsed(), Duration::from_millis(1500));
        assert_eq!(poller.pending(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_pass_keeps_message_pending() {
        let source = Scripted::new(vec![], detail(vec![msg(7, Role::User)]));
        let mut poller = Poller::new(source, quick());

        assert_eq!(poller.wait_for_reply(1, 7).await, PollOutcome::StillProcessing);
        assert_eq!(poller.source().calls(), 4);
        assert_eq!(
            poller.pending(),
            Some(Pending {
                chatroom_id: 1,
                message_id: 7
            })
        );

        assert_eq!(poller.refresh().await, Some(PollOutcome::StillProcessing));
        assert_eq!(poller.source().calls(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_errors_use_up_attempts() {
        let source = Scripted::new(
            vec![
                Err(ClientError::Decode("boom".into())),
                Err(ClientError::Api {
                    status: 500,
                    message: "oops".into(),
                }),
            ],
            detail(vec![msg(7, Role::User), msg(9, Role::Assistant)]),
        );
        let mut poller = Poller::new(source, quick());
        assert_eq!(
            poller.wait_for_reply(1, 7).await,
            PollOutcome::Replied(msg(9, Role::Assistant))
        );
        assert_eq!(poller.source().calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_finds_late_reply_and_clears_pending() {
        let waiting = detail(vec![msg(7, Role::User)]);
        let source = Scripted::new(
            (0..5).map(|_| Ok(waiting.clone())).collect(),
            detail(vec![msg(7, Role::User), msg(8, Role::Assistant)]),
        );
        let mut poller = Poller::new(source, quick());
        assert_eq!(poller.wait_for_reply(1, 7).await, PollOutcome::StillProcessing);

        let outcome = poller.refresh().await;
        assert_eq!(outcome, Some(PollOutcome::Replied(msg(8, Role::Assistant))));
        assert_eq!(poller.pending(), None);
        assert_eq!(poller.refresh().await, None);
    }

    #[tokio::test]
    async fn refresh_without_pending_does_nothing() {
        let source = Scripted::new(vec![], detail(vec![]));
        let mut poller = Poller::new(source, quick());
        assert_eq!(poller.refresh().await, None);
        assert_eq!(poller.source().calls(), 0);
    }

    #[test]
    fn config_from_client_section() {
        let config = PollConfig::from(&ClientConfig::default());
        assert_eq!(config, PollConfig::default());
    }
}
