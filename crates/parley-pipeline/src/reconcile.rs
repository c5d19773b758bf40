// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Periodic re-enqueue of user messages that never got a reply.
//!
//! Covers messages whose enqueue failed after they were stored. A message is
//! only re-enqueued once it is older than `min_age` and the queue holds no
//! entry for it in any state, so jobs that exhausted their attempts stay
//! failed. Each sweep handles at most one batch; the rest wait for the next
//! tick.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parley_core::types::Job;
use parley_core::{JobQueue, ParleyError, StorageAdapter};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Default number of messages one sweep looks at.
pub const DEFAULT_SWEEP_BATCH: usize = 100;

pub struct Reconciler {
    storage: Arc<dyn StorageAdapter>,
    queue: Arc<dyn JobQueue>,
    min_age: Duration,
    batch_size: usize,
}

impl Reconciler {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        queue: Arc<dyn JobQueue>,
        min_age: Duration,
    ) -> Self {
        Self {
            storage,
            queue,
            min_age,
            batch_size: DEFAULT_SWEEP_BATCH,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// One pass. Returns how many jobs were enqueued.
    pub async fn sweep(&self) -> Result<usize, ParleyError> {
        let age = chrono::Duration::from_std(self.min_age)
            .map_err(|e| ParleyError::Internal(format!("reconcile age out of range: {e}")))?;
        let cutoff = (Utc::now() - age)
            .format("%Y-%m-%dT%H:%M:%S%.3fZ")
            .to_string();

        let orphans = self
            .storage
            .unanswered_user_messages(&cutoff, self.batch_size)
            .await?;
        let mut enqueued = 0;
        for message in orphans {
            let job = Job::generate_reply(message.chatroom_id, message.id);
            let handle = self.queue.enqueue(&job).await?;
            debug!(message_id = message.id, job_id = %handle, "re-enqueued unanswered message");
            enqueued += 1;
        }
        Ok(enqueued)
    }

    /// Sweep every `interval` until `shutdown` fires.
    pub async fn run(&self, interval: Duration, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }
            match self.sweep().await {
                Ok(0) => {}
                Ok(count) => info!(count, "reconciliation re-enqueued messages"),
                Err(e) => warn!(error = %e, "reconciliation sweep failed"),
            }
        }
        debug!("reconciler stopped");
    }
}
