// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared key-value store backing the rate limiter and the chatroom cache.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ParleyError;
use crate::traits::adapter::PluginAdapter;

/// Expiring string key-value store.
///
/// Implementations must be safe for concurrent use from many request
/// handlers. Expired keys behave exactly like missing keys.
#[async_trait]
pub trait KvStore: PluginAdapter {
    /// Returns the value stored at `key`, or `None` if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, ParleyError>;

    /// Stores `value` at `key`, replacing any previous value, expiring after `ttl`.
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), ParleyError>;

    /// Removes `key`. Removing a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), ParleyError>;

    /// Atomically increments the integer at `key` (missing counts as 0) and
    /// returns the new value. When the new value is 1 the key's expiry is set
    /// to `ttl_if_new`; otherwise the existing expiry is kept.
    async fn incr_with_expiry(&self, key: &str, ttl_if_new: Duration) -> Result<i64, ParleyError>;
}
