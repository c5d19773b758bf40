// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock generation service for deterministic testing.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use parley_core::types::GenerationRequest;
use parley_core::{AdapterType, GenerationService, HealthStatus, ParleyError, PluginAdapter};

/// A generation service that returns pre-configured replies.
///
/// Replies are popped from a FIFO queue. When the queue is empty the reply
/// is `"mock reply to: <prompt>"`. Every request is recorded.
pub struct MockGenerator {
    replies: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<GenerationRequest>>,
    failing: AtomicBool,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self::with_replies(Vec::new())
    }

    pub fn with_replies(replies: Vec<String>) -> Self {
        Self {
            replies: Mutex::new(VecDeque::from(replies)),
            requests: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
        }
    }

    /// Add a reply to the end of the queue.
    pub async fn add_reply(&self, text: impl Into<String>) {
        self.replies.lock().await.push_back(text.into());
    }

    /// Make every following call return a provider error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Requests received so far, in call order.
    pub async fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().await.clone()
    }
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockGenerator {
    fn name(&self) -> &str {
        "mock-generator"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Generation
    }

    async fn health_check(&self) -> Result<HealthStatus, ParleyError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ParleyError> {
        Ok(())
    }
}

#[async_trait]
impl GenerationService for MockGenerator {
    async fn generate(&self, request: GenerationRequest) -> Result<String, ParleyError> {
        let prompt = request.prompt.clone();
        self.requests.lock().await.push(request);
        if self.failing.load(Ordering::SeqCst) {
            return Err(ParleyError::Provider {
                message: "mock generator failure".to_string(),
                source: None,
            });
        }
        Ok(self
            .replies
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| format!("mock reply to: {prompt}")))
    }
}
