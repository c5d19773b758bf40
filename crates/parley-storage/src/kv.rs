// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! [`KvStore`] implementations.
//!
//! [`SqliteKv`] keeps entries in the `kv` table and is shared by every
//! process using the same database file. [`MemoryKv`] is process-local.

use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::time::Instant;

use parley_core::{AdapterType, HealthStatus, KvStore, ParleyError, PluginAdapter};

use crate::database::Database;
use crate::queries::kv;

pub struct SqliteKv {
    db: Database,
}

impl SqliteKv {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PluginAdapter for SqliteKv {
    fn name(&self) -> &str {
        "sqlite-kv"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::KeyValue
    }

    async fn health_check(&self) -> Result<HealthStatus, ParleyError> {
        Ok(match kv::get(&self.db, "health").await {
            Ok(_) => HealthStatus::Healthy,
            Err(e) => HealthStatus::Unhealthy(e.to_string()),
        })
    }

    async fn shutdown(&self) -> Result<(), ParleyError> {
        Ok(())
    }
}

fn kv_err(op: &str, key: &str, source: ParleyError) -> ParleyError {
    match source {
        already @ ParleyError::KeyValue { .. } => already,
        other => ParleyError::KeyValue {
            message: format!("{op} `{key}` failed"),
            source: Some(Box::new(other)),
        },
    }
}

#[async_trait]
impl KvStore for SqliteKv {
    async fn get(&self, key: &str) -> Result<Option<String>, ParleyError> {
        kv::get(&self.db, key).await.map_err(|e| kv_err("get", key, e))
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), ParleyError> {
        kv::set_ex(&self.db, key, value, ttl)
            .await
            .map_err(|e| kv_err("set", key, e))
    }

    async fn delete(&self, key: &str) -> Result<(), ParleyError> {
        kv::delete(&self.db, key)
            .await
            .map_err(|e| kv_err("delete", key, e))
    }

    async fn incr_with_expiry(&self, key: &str, ttl_if_new: Duration) -> Result<i64, ParleyError> {
        kv::incr_with_expiry(&self.db, key, ttl_if_new)
            .await
            .map_err(|e| kv_err("incr", key, e))
    }
}

#[derive(Debug, Clone)]
struct Slot {
    value: String,
    expires_at: Instant,
}

impl Slot {
    fn live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// In-process key-value store.
///
/// Expiry follows `tokio::time`, so tests can drive it with a paused clock.
#[derive(Debug, Default)]
pub struct MemoryKv {
    entries: DashMap<String, Slot>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn evict_expired(&self, now: Instant) {
        self.entries.retain(|_, slot| slot.live(now));
    }
}

#[async_trait]
impl PluginAdapter for MemoryKv {
    fn name(&self) -> &str {
        "memory-kv"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::KeyValue
    }

    async fn health_check(&self) -> Result<HealthStatus, ParleyError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ParleyError> {
        self.entries.clear();
        Ok(())
    }
}

#[async_trait]
impl KvStore for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<String>, ParleyError> {
        let now = Instant::now();
        let value = self
            .entries
            .get(key)
            .filter(|slot| slot.live(now))
            .map(|slot| slot.value.clone());
        if value.is_none() {
            self.entries.remove_if(key, |_, slot| !slot.live(now));
        }
        Ok(value)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), ParleyError> {
        self.entries.insert(
            key.to_string(),
            Slot {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), ParleyError> {
        self.entries.remove(key);
        Ok(())
    }

    async fn incr_with_expiry(&self, key: &str, ttl_if_new: Duration) -> Result<i64, ParleyError> {
        let now = Instant::now();
        // Counter keys rotate daily, so a new key is the moment to drop old ones.
        let is_new = self.entries.get(key).is_none_or(|slot| !slot.live(now));
        if is_new {
            self.evict_expired(now);
        }
        let fresh = || Slot {
            value: "1".to_string(),
            expires_at: now + ttl_if_new,
        };

        match self.entries.entry(key.to_string()) {
            Entry::Vacant(vacant) => {
                vacant.insert(fresh());
                Ok(1)
            }
            Entry::Occupied(mut occupied) => {
                let slot = occupied.get_mut();
                if !slot.live(now) {
                    *slot = fresh();
                    return Ok(1);
                }
                let current: i64 = slot.value.parse().map_err(|_| ParleyError::KeyValue {
                    message: format!("value at `{key}` is not an integer: {:?}", slot.value),
                    source: None,
                })?;
                let next = current.saturating_add(1);
                slot.value = next.to_string();
                Ok(next)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::queries::test_support::setup_db;

    async fn exercise(store: &dyn KvStore) {
        store.set_ex("a", "1", Duration::from_secs(60)).await.unwrap();
        assert_eq!(store.get("a").await.unwrap().as_deref(), Some("1"));
        store.delete("a").await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), None);

        assert_eq!(store.incr_with_expiry("n", Duration::from_secs(60)).await.unwrap(), 1);
        assert_eq!(store.incr_with_expiry("n", Duration::from_secs(60)).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn sqlite_kv_contract() {
        let (db, _dir) = setup_db().await;
        let store = SqliteKv::new(db.clone());
        exercise(&store).await;
        assert_eq!(store.adapter_type(), AdapterType::KeyValue);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn memory_kv_contract() {
        exercise(&MemoryKv::new()).await;
    }

    #[tokio::test(start_paused = true)]
    async fn memory_kv_expiry_follows_tokio_clock() {
        let store = MemoryKv::new();
        store.set_ex("k", "v", Duration::from_secs(10)).await.unwrap();
        assert_eq!(store.incr_with_expiry("c", Duration::from_secs(5)).await.unwrap(), 1);
        assert_eq!(store.incr_with_expiry("c", Duration::from_secs(500)).await.unwrap(), 2);

        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
        // The first TTL sticks; later increments do not extend it.
        assert_eq!(store.get("c").await.unwrap(), None);
        assert_eq!(store.incr_with_expiry("c", Duration::from_secs(5)).await.unwrap(), 1);

        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(store.get("k").await.unwrap(), None);
        assert!(store.len() <= 1);
    }

    #[tokio::test(start_paused = true)]
    async fn memory_kv_new_counter_evicts_expired_ones() {
        let store = MemoryKv::new();
        let day = Duration::from_secs(86_400);
        store.incr_with_expiry("quota:1:2026-01-01", day).await.unwrap();
        store.incr_with_expiry("quota:2:2026-01-01", day).await.unwrap();
        store.set_ex("cache:1", "v", Duration::from_secs(2 * 86_400)).await.unwrap();

        tokio::time::advance(day + Duration::from_secs(1)).await;
        assert_eq!(store.len(), 3);

        store.incr_with_expiry("quota:1:2026-01-02", day).await.unwrap();
        assert_eq!(store.len(), 2);
        store.incr_with_expiry("quota:1:2026-01-02", day).await.unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.get("cache:1").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn memory_kv_concurrent_increments_are_atomic() {
        let store = Arc::new(MemoryKv::new());
        let mut tasks = Vec::new();
        for _ in 0..50 {
            let store = Arc::clone(&store);
            tasks.push(tokio::spawn(async move {
                store
                    .incr_with_expiry("shared", Duration::from_secs(60))
                    .await
                    .unwrap()
            }));
        }
        let mut seen = Vec::new();
        for task in tasks {
            seen.push(task.await.unwrap());
        }
        seen.sort_unstable();
        assert_eq!(seen, (1..=50).collect::<Vec<i64>>());
    }
}
