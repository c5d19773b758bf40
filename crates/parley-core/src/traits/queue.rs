// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable at-least-once job queue.

use async_trait::async_trait;

use crate::error::ParleyError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{Job, JobHandle, QueuedJob};

/// Work queue decoupling message submission from reply generation.
///
/// Delivery is at-least-once: a job whose worker neither acks nor fails it
/// within the visibility timeout is handed out again. Jobs of the same
/// chatroom are never in flight concurrently.
#[async_trait]
pub trait JobQueue: PluginAdapter {
    /// Durably records `job` and returns its handle.
    async fn enqueue(&self, job: &Job) -> Result<JobHandle, ParleyError>;

    /// Claims the oldest deliverable job, or returns `None` if there is none.
    async fn dequeue(&self) -> Result<Option<QueuedJob>, ParleyError>;

    /// Marks a claimed job as done and releases its chatroom. Does nothing
    /// if the delivery's lease has expired and the job was handed out again.
    async fn ack(&self, job: &QueuedJob) -> Result<(), ParleyError>;

    /// Marks a claimed job as failed. It is retried until the attempt budget
    /// is exhausted. A stale lease is ignored as for `ack`.
    async fn fail(&self, job: &QueuedJob) -> Result<(), ParleyError>;

    /// Returns true if any job (in any state) references `message_id`.
    async fn is_tracked(&self, message_id: i64) -> Result<bool, ParleyError>;
}
