// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapters that fail every operation, for degraded-mode tests.

use std::time::Duration;

use async_trait::async_trait;

use parley_core::types::{Job, JobHandle, QueuedJob};
use parley_core::{AdapterType, HealthStatus, JobQueue, KvStore, ParleyError, PluginAdapter};

/// Key-value store that is always unreachable.
pub struct FailingKv;

fn kv_down() -> ParleyError {
    ParleyError::KeyValue {
        message: "kv store unreachable".to_string(),
        source: None,
    }
}

#[async_trait]
impl PluginAdapter for FailingKv {
    fn name(&self) -> &str {
        "failing-kv"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::KeyValue
    }

    async fn health_check(&self) -> Result<HealthStatus, ParleyError> {
        Ok(HealthStatus::Unhealthy("kv store unreachable".to_string()))
    }

    async fn shutdown(&self) -> Result<(), ParleyError> {
        Ok(())
    }
}

#[async_trait]
impl KvStore for FailingKv {
    async fn get(&self, _key: &str) -> Result<Option<String>, ParleyError> {
        Err(kv_down())
    }

    async fn set_ex(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), ParleyError> {
        Err(kv_down())
    }

    async fn delete(&self, _key: &str) -> Result<(), ParleyError> {
        Err(kv_down())
    }

    async fn incr_with_expiry(&self, _key: &str, _ttl_if_new: Duration) -> Result<i64, ParleyError> {
        Err(kv_down())
    }
}

/// Job queue that is always unreachable.
pub struct FailingQueue;

fn queue_down() -> ParleyError {
    ParleyError::Queue {
        message: "queue unreachable".to_string(),
        source: None,
    }
}

#[async_trait]
impl PluginAdapter for FailingQueue {
    fn name(&self) -> &str {
        "failing-queue"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Queue
    }

    async fn health_check(&self) -> Result<HealthStatus, ParleyError> {
        Ok(HealthStatus::Unhealthy("queue unreachable".to_string()))
    }

    async fn shutdown(&self) -> Result<(), ParleyError> {
        Ok(())
    }
}

#[async_trait]
impl JobQueue for FailingQueue {
    async fn enqueue(&self, _job: &Job) -> Result<JobHandle, ParleyError> {
        Err(queue_down())
    }

    async fn dequeue(&self) -> Result<Option<QueuedJob>, ParleyError> {
        Err(queue_down())
    }

    async fn ack(&self, _job: &QueuedJob) -> Result<(), ParleyError> {
        Err(queue_down())
    }

    async fn fail(&self, _job: &QueuedJob) -> Result<(), ParleyError> {
        Err(queue_down())
    }

    async fn is_tracked(&self, _message_id: i64) -> Result<bool, ParleyError> {
        Err(queue_down())
    }
}
