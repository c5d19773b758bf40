// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wiring shared by `parley serve` and `parley worker`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parley_config::ParleyConfig;
use parley_config::model::KvBackend;
use parley_core::{GenerationService, JobQueue, KvStore, ParleyError, StorageAdapter};
use parley_gateway::{AppState, BillingSettings};
use parley_gemini::GeminiProvider;
use parley_pipeline::{
    ChatroomCache, ChatroomService, JobProducer, QuotaPolicy, RateLimiter, Reconciler, Worker,
};
use parley_storage::{Database, MemoryKv, SqliteJobQueue, SqliteKv, SqliteStorage};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Installs the global tracing subscriber. `RUST_LOG` overrides the
/// configured level.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("parley={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

/// Opened adapters for one process.
pub struct Services {
    pub storage: Arc<dyn StorageAdapter>,
    pub kv: Arc<dyn KvStore>,
    pub queue: Arc<dyn JobQueue>,
}

impl Services {
    pub async fn open(config: &ParleyConfig) -> Result<Self, ParleyError> {
        let db = Database::open(&config.storage.database_path).await?;
        info!(path = %db.path(), "database opened");

        let kv: Arc<dyn KvStore> = match config.kv.backend {
            KvBackend::Memory => {
                warn!("in-memory kv backend: quotas and cache are not shared between processes");
                Arc::new(MemoryKv::new())
            }
            KvBackend::Sqlite => {
                let kv_path = config.kv_database_path();
                let kv_db = if kv_path == db.path() {
                    db.clone()
                } else {
                    Database::open(kv_path).await?
                };
                Arc::new(SqliteKv::new(kv_db))
            }
        };

        let queue = Arc::new(SqliteJobQueue::new(db.clone(), &config.queue));
        let storage = Arc::new(SqliteStorage::from_database(db));

        Ok(Self { storage, kv, queue })
    }

    pub fn app_state(&self, config: &ParleyConfig) -> AppState {
        let limiter = RateLimiter::new(self.kv.clone());
        let cache = ChatroomCache::new(self.kv.clone(), &config.cache);
        AppState {
            storage: self.storage.clone(),
            kv: self.kv.clone(),
            queue: self.queue.clone(),
            producer: JobProducer::new(
                self.storage.clone(),
                self.queue.clone(),
                limiter.clone(),
                QuotaPolicy::from(&config.rate_limit),
            ),
            chatrooms: ChatroomService::new(self.storage.clone(), cache),
            limiter,
            billing: BillingSettings {
                checkout_url: config.billing.checkout_url.clone(),
                webhook_secret: config.billing.webhook_secret.clone(),
            },
            started_at: Instant::now(),
        }
    }

    pub fn worker(&self, config: &ParleyConfig, generator: Arc<dyn GenerationService>) -> Worker {
        Worker::new(self.storage.clone(), self.queue.clone(), generator)
            .with_history_limit(config.worker.history_limit)
            .with_poll_interval(Duration::from_millis(config.worker.poll_interval_ms))
    }

    /// Spawn `count` worker loops and, unless disabled, the reconciliation
    /// sweep.
    pub fn spawn_background(
        &self,
        config: &ParleyConfig,
        generator: Arc<dyn GenerationService>,
        count: usize,
        shutdown: &CancellationToken,
    ) -> Vec<JoinHandle<()>> {
        let mut tasks = Vec::with_capacity(count + 1);
        for worker_id in 0..count {
            let worker = self.worker(config, generator.clone());
            let token = shutdown.clone();
            tasks.push(tokio::spawn(async move { worker.run(worker_id, token).await }));
        }

        if config.worker.reconcile_interval_secs > 0 {
            let reconciler = Reconciler::new(
                self.storage.clone(),
                self.queue.clone(),
                Duration::from_secs(config.worker.reconcile_after_secs),
            );
            let interval = Duration::from_secs(config.worker.reconcile_interval_secs);
            let token = shutdown.clone();
            tasks.push(tokio::spawn(async move { reconciler.run(interval, token).await }));
        }
        tasks
    }

    pub async fn close(&self) -> Result<(), ParleyError> {
        self.storage.close().await
    }
}

pub fn build_generator(config: &ParleyConfig) -> Result<Arc<dyn GenerationService>, ParleyError> {
    let provider = GeminiProvider::from_config(&config.gemini).inspect_err(|_| {
        eprintln!(
            "error: Gemini API key required. Set gemini.api_key, the GEMINI_API_KEY env var, or gemini.echo = true"
        );
    })?;
    Ok(Arc::new(provider))
}

/// Wait for background tasks after shutdown was requested.
pub async fn join_all(tasks: Vec<JoinHandle<()>>) {
    for result in futures::future::join_all(tasks).await {
        if let Err(e) = result {
            warn!(error = %e, "background task ended abnormally");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::PluginAdapter;
    use parley_core::types::Tier;

    fn config_for(dir: &tempfile::TempDir, backend: KvBackend) -> ParleyConfig {
        let mut config = ParleyConfig::default();
        config.storage.database_path = dir.path().join("parley.db").to_string_lossy().into_owned();
        config.kv.backend = backend;
        config.gemini.echo = true;
        config
    }

    #[tokio::test]
    async fn serve_wiring_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_for(&dir, KvBackend::Sqlite);
        let services = Services::open(&config).await.unwrap();
        let state = services.app_state(&config);

        let user = services.storage.create_user("+15550123", "tok").await.unwrap();
        assert_eq!(user.tier, Tier::Basic);
        let room = state.chatrooms.create(&user, "wired").await.unwrap();
        let submission = state.producer.submit(&user, room.id, "ping").await.unwrap();

        let worker = services.worker(&config, build_generator(&config).unwrap());
        assert!(worker.run_once().await.unwrap());
        let reply = services
            .storage
            .find_reply(submission.message.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reply.content, "ECHO: ping");
        assert_eq!(state.limiter.usage_today(user.id).await.unwrap(), 1);

        services.close().await.unwrap();
    }

    #[tokio::test]
    async fn memory_backend_is_process_local() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_for(&dir, KvBackend::Memory);
        let services = Services::open(&config).await.unwrap();
        assert_eq!(services.kv.name(), "memory-kv");
        services.close().await.unwrap();
    }

    #[tokio::test]
    async fn background_tasks_stop_on_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_for(&dir, KvBackend::Sqlite);
        let services = Services::open(&config).await.unwrap();
        let shutdown = CancellationToken::new();
        let tasks =
            services.spawn_background(&config, build_generator(&config).unwrap(), 2, &shutdown);
        assert_eq!(tasks.len(), 3);
        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(5), join_all(tasks))
            .await
            .unwrap();
        services.close().await.unwrap();
    }
}
