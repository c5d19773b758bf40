// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-user daily prompt quota.
//!
//! One counter per user and UTC calendar day, stored in the shared
//! key-value store under `user:<id>:daily_prompts:<YYYY-MM-DD>`. The counter
//! is created by its first increment and expires at the next UTC midnight.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Days, NaiveDate, Utc};
use parley_config::model::RateLimitConfig;
use parley_core::types::Tier;
use parley_core::{KvStore, ParleyError};

/// Daily quota for each tier. `None` means unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaPolicy {
    pub basic: Option<u32>,
    pub pro: Option<u32>,
}

impl QuotaPolicy {
    pub fn limit_for(&self, tier: Tier) -> Option<u32> {
        match tier {
            Tier::Basic => self.basic,
            Tier::Pro => self.pro,
        }
    }
}

impl From<&RateLimitConfig> for QuotaPolicy {
    fn from(config: &RateLimitConfig) -> Self {
        Self {
            basic: config.basic_daily_limit,
            pro: config.pro_daily_limit,
        }
    }
}

pub fn counter_key(user_id: i64, day: NaiveDate) -> String {
    format!("user:{user_id}:daily_prompts:{}", day.format("%Y-%m-%d"))
}

/// Time left until the next UTC midnight, never less than one second.
pub fn ttl_until_next_midnight(now: DateTime<Utc>) -> Duration {
    let next_midnight = now
        .date_naive()
        .checked_add_days(Days::new(1))
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc());
    let secs = next_midnight
        .map(|midnight| (midnight - now).num_seconds())
        .unwrap_or(1);
    Duration::from_secs(secs.max(1).unsigned_abs())
}

/// Atomic daily counter over a [`KvStore`].
#[derive(Clone)]
pub struct RateLimiter {
    kv: Arc<dyn KvStore>,
}

impl RateLimiter {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// Count one prompt for `user_id` today and report whether it is within
    /// `limit`. The increment happens even when the answer is no, so the
    /// counter reflects every attempt.
    pub async fn check_and_increment(&self, user_id: i64, limit: u32) -> Result<bool, ParleyError> {
        self.check_and_increment_at(user_id, limit, Utc::now()).await
    }

    /// [`check_and_increment`](Self::check_and_increment) as of `now`.
    pub async fn check_and_increment_at(
        &self,
        user_id: i64,
        limit: u32,
        now: DateTime<Utc>,
    ) -> Result<bool, ParleyError> {
        let key = counter_key(user_id, now.date_naive());
        let count = self
            .kv
            .incr_with_expiry(&key, ttl_until_next_midnight(now))
            .await?;
        Ok(count <= i64::from(limit))
    }

    /// Prompts counted for `user_id` so far today.
    pub async fn usage_today(&self, user_id: i64) -> Result<u32, ParleyError> {
        let key = counter_key(user_id, Utc::now().date_naive());
        let raw = self.kv.get(&key).await?;
        Ok(raw
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or_default())
    }
}
