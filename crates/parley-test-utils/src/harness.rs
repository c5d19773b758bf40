// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end pipeline tests.
//!
//! `TestHarness` assembles storage, key-value store, queue, producer, worker,
//! chatroom service, and reconciler over a temporary SQLite database, with a
//! [`MockGenerator`] standing in for the model.

use std::sync::Arc;
use std::time::Duration;

use parley_config::model::{CacheConfig, QueueConfig, StorageConfig};
use parley_core::types::{Tier, User};
use parley_core::{GenerationService, JobQueue, KvStore, ParleyError, StorageAdapter};
use parley_pipeline::{
    ChatroomCache, ChatroomService, JobProducer, QuotaPolicy, RateLimiter, Reconciler, Worker,
};
use parley_storage::{Database, MemoryKv, SqliteJobQueue, SqliteStorage};

use crate::mock_generator::MockGenerator;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    replies: Vec<String>,
    quotas: QuotaPolicy,
    history_limit: usize,
    visibility: Duration,
    reconcile_after: Duration,
    kv: Option<Arc<dyn KvStore>>,
    queue: Option<Arc<dyn JobQueue>>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            replies: Vec::new(),
            quotas: QuotaPolicy {
                basic: Some(5),
                pro: None,
            },
            history_limit: 20,
            visibility: Duration::from_secs(300),
            reconcile_after: Duration::ZERO,
            kv: None,
            queue: None,
        }
    }

    /// Scripted generator replies, consumed in order.
    pub fn with_replies(mut self, replies: Vec<String>) -> Self {
        self.replies = replies;
        self
    }

    pub fn with_quotas(mut self, quotas: QuotaPolicy) -> Self {
        self.quotas = quotas;
        self
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// Lock duration of claimed jobs.
    pub fn with_visibility_timeout(mut self, visibility: Duration) -> Self {
        self.visibility = visibility;
        self
    }

    /// Minimum message age before the reconciler re-enqueues it.
    pub fn with_reconcile_after(mut self, age: Duration) -> Self {
        self.reconcile_after = age;
        self
    }

    /// Replace the in-memory key-value store.
    pub fn with_kv(mut self, kv: Arc<dyn KvStore>) -> Self {
        self.kv = Some(kv);
        self
    }

    /// Replace the queue the producer and reconciler enqueue into.
    /// The worker keeps draining the SQLite queue.
    pub fn with_producer_queue(mut self, queue: Arc<dyn JobQueue>) -> Self {
        self.queue = Some(queue);
        self
    }

    pub async fn build(self) -> Result<TestHarness, ParleyError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| ParleyError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("test.db");
        let storage = SqliteStorage::new(StorageConfig {
            database_path: db_path.to_string_lossy().into_owned(),
        });
        storage.initialize().await?;
        let db = storage.database()?;
        let storage: Arc<dyn StorageAdapter> = Arc::new(storage);

        let sqlite_queue = Arc::new(
            SqliteJobQueue::new(db.clone(), &QueueConfig::default())
                .with_visibility_timeout(self.visibility),
        );
        let producer_queue: Arc<dyn JobQueue> = match self.queue {
            Some(queue) => queue,
            None => sqlite_queue.clone(),
        };

        let kv: Arc<dyn KvStore> = match self.kv {
            Some(kv) => kv,
            None => Arc::new(MemoryKv::new()),
        };

        let generator = Arc::new(MockGenerator::with_replies(self.replies));
        let limiter = RateLimiter::new(kv.clone());
        let cache = ChatroomCache::new(kv.clone(), &CacheConfig::default());

        let producer = JobProducer::new(
            storage.clone(),
            producer_queue.clone(),
            limiter.clone(),
            self.quotas,
        );
        let worker = Worker::new(
            storage.clone(),
            sqlite_queue.clone(),
            generator.clone() as Arc<dyn GenerationService>,
        )
        .with_history_limit(self.history_limit)
        .with_poll_interval(Duration::from_millis(10));
        let chatrooms = ChatroomService::new(storage.clone(), cache.clone());
        let reconciler = Reconciler::new(storage.clone(), producer_queue, self.reconcile_after);

        Ok(TestHarness {
            storage,
            db,
            kv,
            queue: sqlite_queue,
            generator,
            limiter,
            cache,
            producer,
            worker,
            chatrooms,
            reconciler,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete pipeline over a temp database.
pub struct TestHarness {
    pub storage: Arc<dyn StorageAdapter>,
    /// The database behind `storage` and `queue`.
    pub db: Database,
    pub kv: Arc<dyn KvStore>,
    /// The queue the worker drains.
    pub queue: Arc<SqliteJobQueue>,
    pub generator: Arc<MockGenerator>,
    pub limiter: RateLimiter,
    pub cache: ChatroomCache,
    pub producer: JobProducer,
    pub worker: Worker,
    pub chatrooms: ChatroomService,
    pub reconciler: Reconciler,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Register a user with a random token.
    pub async fn create_user(&self, mobile: &str, tier: Tier) -> Result<User, ParleyError> {
        let token = uuid::Uuid::new_v4().simple().to_string();
        let mut user = self.storage.create_user(mobile, &token).await?;
        if tier != user.tier {
            self.storage.set_user_tier(user.id, tier).await?;
            user.tier = tier;
        }
        Ok(user)
    }

    /// Run the worker until the queue has nothing claimable. Returns the
    /// number of jobs handled.
    pub async fn drain(&self) -> Result<usize, ParleyError> {
        let mut handled = 0;
        while self.worker.run_once().await? {
            handled += 1;
        }
        Ok(handled)
    }
}
