// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Semantic checks that serde attributes cannot express.

use crate::diagnostic::ConfigError;
use crate::model::{KvBackend, ParleyConfig};

/// Validate a deserialized configuration, collecting every problem found.
pub fn validate_config(config: &ParleyConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    let host = config.server.host.trim();
    if host.is_empty() {
        fail("server.host must not be empty".to_string());
    } else if host.parse::<std::net::IpAddr>().is_err()
        && !host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    {
        fail(format!(
            "server.host `{host}` is not a valid IP address or hostname"
        ));
    }

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    if config.kv.backend == KvBackend::Sqlite && config.kv_database_path().trim().is_empty() {
        fail("kv.database_path must not be empty".to_string());
    }

    if config.queue.name.trim().is_empty() {
        fail("queue.name must not be empty".to_string());
    }
    if config.queue.max_attempts == 0 {
        fail("queue.max_attempts must be at least 1".to_string());
    }
    if config.queue.visibility_timeout_secs == 0 {
        fail("queue.visibility_timeout_secs must be at least 1".to_string());
    }

    if config.worker.history_limit == 0 {
        fail("worker.history_limit must be at least 1".to_string());
    }
    if config.worker.poll_interval_ms == 0 {
        fail("worker.poll_interval_ms must be at least 1".to_string());
    }

    if config.cache.enabled && config.cache.ttl_secs == 0 {
        fail("cache.ttl_secs must be at least 1 when the cache is enabled".to_string());
    }

    if config.rate_limit.basic_daily_limit == Some(0) {
        fail("rate_limit.basic_daily_limit must be at least 1".to_string());
    }
    if config.rate_limit.pro_daily_limit == Some(0) {
        fail("rate_limit.pro_daily_limit must be at least 1 (omit it for unlimited)".to_string());
    }

    let gemini = &config.gemini;
    if !(0.0..=2.0).contains(&gemini.temperature) {
        fail(format!(
            "gemini.temperature must be between 0.0 and 2.0, got {}",
            gemini.temperature
        ));
    }
    if !(gemini.top_p > 0.0 && gemini.top_p <= 1.0) {
        fail(format!(
            "gemini.top_p must be in (0.0, 1.0], got {}",
            gemini.top_p
        ));
    }
    if gemini.max_output_tokens == 0 {
        fail("gemini.max_output_tokens must be at least 1".to_string());
    }
    if gemini.model.trim().is_empty() {
        fail("gemini.model must not be empty".to_string());
    }
    if !gemini.base_url.starts_with("http://") && !gemini.base_url.starts_with("https://") {
        fail(format!(
            "gemini.base_url `{}` must start with http:// or https://",
            gemini.base_url
        ));
    }

    if let Some(url) = &config.billing.checkout_url {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            fail(format!(
                "billing.checkout_url `{url}` must start with http:// or https://"
            ));
        }
    }
    if config
        .billing
        .webhook_secret
        .as_deref()
        .is_some_and(|secret| secret.trim().is_empty())
    {
        fail("billing.webhook_secret must not be empty (omit it to disable the webhook)".to_string());
    }

    if config.client.poll_interval_ms == 0 {
        fail("client.poll_interval_ms must be at least 1".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
