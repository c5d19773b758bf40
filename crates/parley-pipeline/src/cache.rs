// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read-through cache of each user's chatroom listing.
//!
//! Entries live at `chatrooms:<user_id>` as a JSON array of summaries. The
//! cache never fails its caller: read errors are misses and write errors are
//! logged and dropped.

use std::sync::Arc;
use std::time::Duration;

use parley_config::model::CacheConfig;
use parley_core::KvStore;
use parley_core::types::ChatroomSummary;
use tracing::{debug, warn};

pub fn cache_key(user_id: i64) -> String {
    format!("chatrooms:{user_id}")
}

#[derive(Clone)]
pub struct ChatroomCache {
    kv: Arc<dyn KvStore>,
    ttl: Duration,
    enabled: bool,
}

impl ChatroomCache {
    pub fn new(kv: Arc<dyn KvStore>, config: &CacheConfig) -> Self {
        Self {
            kv,
            ttl: Duration::from_secs(config.ttl_secs),
            enabled: config.enabled,
        }
    }

    /// Default entry lifetime.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn get(&self, user_id: i64) -> Option<Vec<ChatroomSummary>> {
        if !self.enabled {
            return None;
        }
        let key = cache_key(user_id);
        let raw = match self.kv.get(&key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(user_id, error = %e, "chatroom cache read failed, treating as miss");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(list) => Some(list),
            Err(e) => {
                warn!(user_id, error = %e, "corrupt chatroom cache entry, treating as miss");
                None
            }
        }
    }

    pub async fn put(&self, user_id: i64, chatrooms: &[ChatroomSummary], ttl: Duration) {
        if !self.enabled {
            return;
        }
        let raw = match serde_json::to_string(chatrooms) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(user_id, error = %e, "failed to encode chatroom listing");
                return;
            }
        };
        match self.kv.set_ex(&cache_key(user_id), &raw, ttl).await {
            Ok(()) => debug!(user_id, count = chatrooms.len(), "chatroom listing cached"),
            Err(e) => warn!(user_id, error = %e, "chatroom cache write failed"),
        }
    }

    pub async fn invalidate(&self, user_id: i64) {
        if let Err(e) = self.kv.delete(&cache_key(user_id)).await {
            warn!(user_id, error = %e, "chatroom cache invalidation failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_storage::MemoryKv;
    use parley_test_utils::FailingKv;
    use tracing_test::traced_test;

    fn memory_kv() -> Arc<MemoryKv> {
        Arc::new(MemoryKv::new())
    }

    fn summary(id: i64) -> ChatroomSummary {
        ChatroomSummary {
            id,
            title: format!("room {id}"),
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
        }
    }

    fn cache_over(kv: Arc<dyn KvStore>) -> ChatroomCache {
        ChatroomCache::new(kv, &CacheConfig::default())
    }

    #[tokio::test]
    async fn put_get_invalidate() {
        let cache = cache_over(memory_kv());
        assert_eq!(cache.get(1).await, None);

        let list = vec![summary(2), summary(1)];
        cache.put(1, &list, cache.ttl()).await;
        assert_eq!(cache.get(1).await, Some(list));
        assert_eq!(cache.get(2).await, None);

        cache.invalidate(1).await;
        assert_eq!(cache.get(1).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn entry_expires_after_ttl() {
        let cache = cache_over(memory_kv());
        cache.put(1, &[summary(1)], Duration::from_secs(600)).await;
        tokio::time::advance(Duration::from_secs(599)).await;
        assert!(cache.get(1).await.is_some());
        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.get(1).await, None);
    }

    #[tokio::test]
    async fn stored_layout_is_summary_array() {
        let kv = memory_kv();
        let cache = cache_over(kv.clone());
        cache.put(5, &[summary(9)], cache.ttl()).await;
        let raw = kv.get("chatrooms:5").await.unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(
            value,
            serde_json::json!([{"id": 9, "title": "room 9", "created_at": "2026-01-01T00:00:00.000Z"}])
        );
    }

    #[tokio::test]
    async fn corrupt_entry_is_a_miss() {
        let kv = memory_kv();
        kv.set_ex("chatrooms:1", "{not json", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(cache_over(kv).get(1).await, None);
    }

    #[tokio::test]
    #[traced_test]
    async fn broken_store_degrades_quietly() {
        let cache = cache_over(Arc::new(FailingKv));
        assert_eq!(cache.get(1).await, None);
        cache.put(1, &[summary(1)], cache.ttl()).await;
        cache.invalidate(1).await;
        assert!(logs_contain("chatroom cache read failed"));
        assert!(logs_contain("chatroom cache write failed"));
        assert!(logs_contain("chatroom cache invalidation failed"));
    }

    #[tokio::test]
    async fn disabled_cache_always_misses() {
        let kv = memory_kv();
        let cache = ChatroomCache::new(
            kv,
            &CacheConfig {
                enabled: false,
                ttl_secs: 600,
            },
        );
        cache.put(1, &[summary(1)], cache.ttl()).await;
        assert_eq!(cache.get(1).await, None);
    }
}
