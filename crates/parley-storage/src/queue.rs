// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of [`JobQueue`].

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use parley_config::model::QueueConfig;
use parley_core::types::{Job, JobHandle, QueuedJob};
use parley_core::{AdapterType, HealthStatus, JobQueue, ParleyError, PluginAdapter};

use crate::database::Database;
use crate::queries::queue::{self, NewEntry};

/// Job queue stored in the `queue` table, partitioned by chatroom.
pub struct SqliteJobQueue {
    db: Database,
    name: String,
    max_attempts: u32,
    visibility: Duration,
}

impl SqliteJobQueue {
    pub fn new(db: Database, config: &QueueConfig) -> Self {
        Self {
            db,
            name: config.name.clone(),
            max_attempts: config.max_attempts,
            visibility: Duration::from_secs(config.visibility_timeout_secs),
        }
    }

    /// Override the lock duration of claimed jobs.
    pub fn with_visibility_timeout(mut self, visibility: Duration) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn queue_name(&self) -> &str {
        &self.name
    }

    /// Entry counts per status.
    pub async fn status_counts(&self) -> Result<Vec<(String, i64)>, ParleyError> {
        queue::status_counts(&self.db, &self.name).await
    }
}

fn queue_err(message: &str, source: ParleyError) -> ParleyError {
    ParleyError::Queue {
        message: message.to_string(),
        source: Some(Box::new(source)),
    }
}

#[async_trait]
impl PluginAdapter for SqliteJobQueue {
    fn name(&self) -> &str {
        "sqlite-queue"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Queue
    }

    async fn health_check(&self) -> Result<HealthStatus, ParleyError> {
        Ok(match self.status_counts().await {
            Ok(_) => HealthStatus::Healthy,
            Err(e) => HealthStatus::Unhealthy(e.to_string()),
        })
    }

    async fn shutdown(&self) -> Result<(), ParleyError> {
        Ok(())
    }
}

#[async_trait]
impl JobQueue for SqliteJobQueue {
    async fn enqueue(&self, job: &Job) -> Result<JobHandle, ParleyError> {
        let payload = serde_json::to_string(job)
            .map_err(|e| ParleyError::Internal(format!("failed to encode job: {e}")))?;
        let job_id = uuid::Uuid::new_v4().to_string();
        let partition_key = job.chatroom_id.to_string();

        queue::enqueue(
            &self.db,
            NewEntry {
                job_id: &job_id,
                queue_name: &self.name,
                partition_key: &partition_key,
                message_id: Some(job.message_id),
                payload: &payload,
                max_attempts: self.max_attempts,
            },
        )
        .await
        .map_err(|e| queue_err("enqueue failed", e))?;

        debug!(
            job_id = %job_id,
            chatroom_id = job.chatroom_id,
            message_id = job.message_id,
            queue = %self.name,
            "job enqueued"
        );
        Ok(JobHandle(job_id))
    }

    async fn dequeue(&self) -> Result<Option<QueuedJob>, ParleyError> {
        loop {
            let Some(entry) = queue::dequeue(&self.db, &self.name, self.visibility)
                .await
                .map_err(|e| queue_err("dequeue failed", e))?
            else {
                return Ok(None);
            };

            match serde_json::from_str::<Job>(&entry.payload) {
                Ok(job) => {
                    return Ok(Some(QueuedJob {
                        entry_id: entry.id,
                        handle: JobHandle(entry.job_id),
                        job,
                        attempts: entry.attempts,
                        lease: entry.lease.unwrap_or_default(),
                    }));
                }
                Err(e) => {
                    warn!(entry_id = entry.id, error = %e, "burying malformed job payload");
                    queue::bury(&self.db, entry.id)
                        .await
                        .map_err(|e| queue_err("bury failed", e))?;
                }
            }
        }
    }

    async fn ack(&self, job: &QueuedJob) -> Result<(), ParleyError> {
        let settled = queue::ack(&self.db, job.entry_id, &job.lease)
            .await
            .map_err(|e| queue_err("ack failed", e))?;
        if !settled {
            warn!(entry_id = job.entry_id, job_id = %job.handle, "lease lost before ack");
        }
        Ok(())
    }

    async fn fail(&self, job: &QueuedJob) -> Result<(), ParleyError> {
        let status = queue::fail(&self.db, job.entry_id, &job.lease)
            .await
            .map_err(|e| queue_err("fail failed", e))?;
        match status.as_deref() {
            None => warn!(entry_id = job.entry_id, job_id = %job.handle, "lease lost before fail"),
            Some("failed") => warn!(entry_id = job.entry_id, "job exhausted its attempts"),
            Some(_) => {}
        }
        Ok(())
    }

    async fn is_tracked(&self, message_id: i64) -> Result<bool, ParleyError> {
        queue::is_tracked(&self.db, &self.name, message_id)
            .await
            .map_err(|e| queue_err("lookup failed", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::test_support::setup_db;

    fn config() -> QueueConfig {
        QueueConfig {
            name: "gemini".to_string(),
            max_attempts: 3,
            visibility_timeout_secs: 300,
        }
    }

    #[tokio::test]
    async fn job_round_trips_through_queue() {
        let (db, _dir) = setup_db().await;
        let q = SqliteJobQueue::new(db.clone(), &config());

        let handle = q.enqueue(&Job::generate_reply(4, 9)).await.unwrap();
        assert!(q.is_tracked(9).await.unwrap());

        let claimed = q.dequeue().await.unwrap().unwrap();
        assert_eq!(claimed.handle, handle);
        assert_eq!(claimed.job, Job::generate_reply(4, 9));
        assert_eq!(claimed.attempts, 0);

        q.ack(&claimed).await.unwrap();
        assert!(q.dequeue().await.unwrap().is_none());
        assert!(q.is_tracked(9).await.unwrap());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn late_ack_from_expired_worker_keeps_chatroom_locked() {
        let (db, _dir) = setup_db().await;
        let slow = SqliteJobQueue::new(db.clone(), &config())
            .with_visibility_timeout(Duration::from_millis(20));
        let q = SqliteJobQueue::new(db.clone(), &config());
        q.enqueue(&Job::generate_reply(4, 9)).await.unwrap();
        q.enqueue(&Job::generate_reply(4, 10)).await.unwrap();

        let expired = slow.dequeue().await.unwrap().unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;
        let current = q.dequeue().await.unwrap().unwrap();
        assert_eq!(current.entry_id, expired.entry_id);
        assert_eq!(current.attempts, 1);

        slow.ack(&expired).await.unwrap();
        slow.fail(&expired).await.unwrap();
        assert!(q.dequeue().await.unwrap().is_none());

        q.ack(&current).await.unwrap();
        assert_eq!(q.dequeue().await.unwrap().unwrap().job.message_id, 10);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn payload_is_the_wire_job() {
        let (db, _dir) = setup_db().await;
        let q = SqliteJobQueue::new(db.clone(), &config());
        q.enqueue(&Job::generate_reply(1, 2)).await.unwrap();

        let entry = queue::dequeue(&db, "gemini", Duration::from_secs(1))
            .await
            .unwrap()
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&entry.payload).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"task": "generate_reply", "chatroom_id": 1, "message_id": 2})
        );
        assert_eq!(entry.partition_key, "1");
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn malformed_payload_is_skipped() {
        let (db, _dir) = setup_db().await;
        queue::enqueue(
            &db,
            NewEntry {
                job_id: "bad",
                queue_name: "gemini",
                partition_key: "1",
                message_id: None,
                payload: "not json",
                max_attempts: 3,
            },
        )
        .await
        .unwrap();
        let q = SqliteJobQueue::new(db.clone(), &config());
        q.enqueue(&Job::generate_reply(2, 5)).await.unwrap();

        let claimed = q.dequeue().await.unwrap().unwrap();
        assert_eq!(claimed.job.message_id, 5);
        db.close().await.unwrap();
    }
}
