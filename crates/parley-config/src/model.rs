// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so a misspelled key fails
//! at startup instead of silently falling back to a default.

use serde::{Deserialize, Serialize};

/// Top-level Parley configuration. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ParleyConfig {
    /// HTTP listener and logging.
    #[serde(default)]
    pub server: ServerConfig,

    /// Relational store (users, chatrooms, messages, job queue).
    #[serde(default)]
    pub storage: StorageConfig,

    /// Key-value store backing the rate limiter and cache.
    #[serde(default)]
    pub kv: KvConfig,

    /// Job queue settings.
    #[serde(default)]
    pub queue: QueueConfig,

    /// Worker pool and reconciliation sweep.
    #[serde(default)]
    pub worker: WorkerConfig,

    /// Chatroom listing cache.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Per-tier daily prompt quotas.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Gemini generation service.
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// Payment-provider boundary: checkout link and tier-upgrade webhook.
    #[serde(default)]
    pub billing: BillingConfig,

    /// Settings for the `parley chat` client.
    #[serde(default)]
    pub client: ClientConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Logging level (trace, debug, info, warn, error). `RUST_LOG` overrides it.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("parley").join("parley.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("parley.db"))
        .to_string_lossy()
        .into_owned()
}

/// Which key-value backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KvBackend {
    /// SQLite table shared by every process pointing at the same file.
    #[default]
    Sqlite,
    /// Process-local map. Only correct for a single `parley serve` process.
    Memory,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct KvConfig {
    #[serde(default)]
    pub backend: KvBackend,

    /// Database file for the SQLite backend. Defaults to `storage.database_path`.
    #[serde(default)]
    pub database_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QueueConfig {
    /// Queue name; separate deployments can share one database.
    #[serde(default = "default_queue_name")]
    pub name: String,

    /// Deliveries before a job is marked permanently failed.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Seconds a claimed job stays invisible to other workers.
    #[serde(default = "default_visibility_timeout_secs")]
    pub visibility_timeout_secs: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            name: default_queue_name(),
            max_attempts: default_max_attempts(),
            visibility_timeout_secs: default_visibility_timeout_secs(),
        }
    }
}

fn default_queue_name() -> String {
    "gemini".to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_visibility_timeout_secs() -> u64 {
    300
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WorkerConfig {
    /// Worker loops spawned inside `parley serve`. 0 means replies are only
    /// produced by separate `parley worker` processes.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Sleep between dequeue attempts when the queue is empty.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Number of earlier messages handed to the generation service.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Seconds between reconciliation sweeps. 0 disables the sweep.
    #[serde(default = "default_reconcile_interval_secs")]
    pub reconcile_interval_secs: u64,

    /// Minimum age of an unanswered, unqueued message before it is re-enqueued.
    #[serde(default = "default_reconcile_after_secs")]
    pub reconcile_after_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            poll_interval_ms: default_poll_interval_ms(),
            history_limit: default_history_limit(),
            reconcile_interval_secs: default_reconcile_interval_secs(),
            reconcile_after_secs: default_reconcile_after_secs(),
        }
    }
}

fn default_concurrency() -> usize {
    2
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_history_limit() -> usize {
    20
}

fn default_reconcile_interval_secs() -> u64 {
    60
}

fn default_reconcile_after_secs() -> u64 {
    120
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: default_cache_ttl_secs(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_cache_ttl_secs() -> u64 {
    600
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimitConfig {
    /// Daily prompt quota for the basic tier. `None` means unlimited.
    #[serde(default = "default_basic_daily_limit")]
    pub basic_daily_limit: Option<u32>,

    /// Daily prompt quota for the pro tier. `None` means unlimited.
    #[serde(default)]
    pub pro_daily_limit: Option<u32>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            basic_daily_limit: default_basic_daily_limit(),
            pro_daily_limit: None,
        }
    }
}

fn default_basic_daily_limit() -> Option<u32> {
    Some(5)
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GeminiConfig {
    /// API key. `None` requires `echo = true` or the `GEMINI_API_KEY` env var.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_gemini_model")]
    pub model: String,

    /// Base URL of the Generative Language API.
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,

    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    #[serde(default = "default_gemini_timeout_secs")]
    pub timeout_secs: u64,

    /// System instruction sent with every request.
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Reply with `ECHO: <prompt>` instead of calling the API.
    #[serde(default)]
    pub echo: bool,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_gemini_model(),
            base_url: default_gemini_base_url(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            max_output_tokens: default_max_output_tokens(),
            timeout_secs: default_gemini_timeout_secs(),
            system_prompt: default_system_prompt(),
            echo: false,
        }
    }
}

fn default_gemini_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_top_p() -> f32 {
    0.9
}

fn default_max_output_tokens() -> u32 {
    256
}

fn default_gemini_timeout_secs() -> u64 {
    30
}

fn default_system_prompt() -> String {
    "You are Parley, a concise and helpful assistant. \
     If the user asks your name, answer exactly: 'Parley'. \
     Use prior messages in this chat for context."
        .to_string()
}

/// Both fields unset disables the billing routes.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BillingConfig {
    /// Hosted checkout page for the pro plan. The user id is appended as
    /// `client_reference_id`.
    #[serde(default)]
    pub checkout_url: Option<String>,

    /// Shared secret for HMAC-SHA256 webhook signatures.
    #[serde(default)]
    pub webhook_secret: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    #[serde(default = "default_client_base_url")]
    pub base_url: String,

    /// Bearer token; the `chat` REPL can also set it with `/token`.
    #[serde(default)]
    pub token: Option<String>,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Poll attempts right after sending a message.
    #[serde(default = "default_send_attempts")]
    pub send_attempts: u32,

    /// Poll attempts for a manual refresh.
    #[serde(default = "default_refresh_attempts")]
    pub refresh_attempts: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_client_base_url(),
            token: None,
            poll_interval_ms: default_poll_interval_ms(),
            send_attempts: default_send_attempts(),
            refresh_attempts: default_refresh_attempts(),
        }
    }
}

fn default_client_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_send_attempts() -> u32 {
    80
}

fn default_refresh_attempts() -> u32 {
    60
}

impl ParleyConfig {
    /// Database file used by the SQLite key-value backend.
    pub fn kv_database_path(&self) -> &str {
        self.kv
            .database_path
            .as_deref()
            .unwrap_or(&self.storage.database_path)
    }
}
