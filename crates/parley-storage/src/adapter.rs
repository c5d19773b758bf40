// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of [`StorageAdapter`].

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use parley_config::model::StorageConfig;
use parley_core::types::{Chatroom, Message, Tier, User};
use parley_core::{AdapterType, HealthStatus, ParleyError, PluginAdapter, StorageAdapter};

use crate::database::{Database, map_tr_err};
use crate::queries;

/// SQLite-backed storage for users, chatrooms, and messages.
///
/// The database is opened by [`StorageAdapter::initialize`]; every other
/// call fails with a storage error until then.
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create an uninitialized adapter for `config.database_path`.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Wrap an already opened database.
    pub fn from_database(db: Database) -> Self {
        Self {
            config: StorageConfig {
                database_path: db.path().to_string(),
            },
            db: OnceCell::new_with(Some(db)),
        }
    }

    fn db(&self) -> Result<&Database, ParleyError> {
        self.db.get().ok_or_else(|| ParleyError::Storage {
            source: "storage not initialized, call initialize() first".into(),
        })
    }

    /// Handle to the underlying database, for adapters sharing the same file.
    pub fn database(&self) -> Result<Database, ParleyError> {
        self.db().cloned()
    }

    async fn checkpoint(db: &Database) -> Result<(), ParleyError> {
        db.connection()
            .call(|conn| conn.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(())))
            .await
            .map_err(map_tr_err)
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, ParleyError> {
        let Ok(db) = self.db() else {
            return Ok(HealthStatus::Unhealthy("not initialized".to_string()));
        };
        let ping = db
            .connection()
            .call(|conn| conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0)))
            .await;
        Ok(match ping {
            Ok(_) => HealthStatus::Healthy,
            Err(e) => HealthStatus::Unhealthy(e.to_string()),
        })
    }

    async fn shutdown(&self) -> Result<(), ParleyError> {
        if let Some(db) = self.db.get() {
            Self::checkpoint(db).await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), ParleyError> {
        let db = Database::open(&self.config.database_path).await?;
        self.db.set(db).map_err(|_| ParleyError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), ParleyError> {
        let db = self.db()?;
        Self::checkpoint(db).await?;
        db.close().await
    }

    async fn create_user(&self, mobile: &str, token: &str) -> Result<User, ParleyError> {
        queries::users::create_user(self.db()?, mobile, token)
            .await?
            .ok_or_else(|| ParleyError::Conflict("mobile number already registered".to_string()))
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>, ParleyError> {
        queries::users::get_user(self.db()?, id).await
    }

    async fn get_user_by_token(&self, token: &str) -> Result<Option<User>, ParleyError> {
        queries::users::get_user_by_token(self.db()?, token).await
    }

    async fn get_user_by_mobile(&self, mobile: &str) -> Result<Option<User>, ParleyError> {
        queries::users::get_user_by_mobile(self.db()?, mobile).await
    }

    async fn set_user_tier(&self, id: i64, tier: Tier) -> Result<(), ParleyError> {
        queries::users::set_user_tier(self.db()?, id, tier).await
    }

    async fn create_chatroom(&self, user_id: i64, title: &str) -> Result<Chatroom, ParleyError> {
        queries::chatrooms::create_chatroom(self.db()?, user_id, title).await
    }

    async fn list_chatrooms(&self, user_id: i64) -> Result<Vec<Chatroom>, ParleyError> {
        queries::chatrooms::list_chatrooms(self.db()?, user_id).await
    }

    async fn get_chatroom(&self, id: i64, user_id: i64) -> Result<Option<Chatroom>, ParleyError> {
        queries::chatrooms::get_chatroom(self.db()?, id, user_id).await
    }

    async fn get_messages(&self, chatroom_id: i64) -> Result<Vec<Message>, ParleyError> {
        queries::messages::get_messages(self.db()?, chatroom_id).await
    }

    async fn insert_user_message(
        &self,
        chatroom_id: i64,
        content: &str,
    ) -> Result<Message, ParleyError> {
        queries::messages::insert_user_message(self.db()?, chatroom_id, content).await
    }

    async fn insert_assistant_reply(
        &self,
        chatroom_id: i64,
        reply_to: i64,
        content: &str,
    ) -> Result<Option<Message>, ParleyError> {
        queries::messages::insert_assistant_reply(self.db()?, chatroom_id, reply_to, content).await
    }

    async fn find_reply(&self, message_id: i64) -> Result<Option<Message>, ParleyError> {
        queries::messages::find_reply(self.db()?, message_id).await
    }

    async fn unanswered_user_messages(
        &self,
        cutoff: &str,
        limit: usize,
    ) -> Result<Vec<Message>, ParleyError> {
        queries::messages::unanswered_user_messages(self.db()?, cutoff, limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn make_config(path: &std::path::Path) -> StorageConfig {
        StorageConfig {
            database_path: path.to_str().unwrap().to_string(),
        }
    }

    #[tokio::test]
    async fn calls_before_initialize_fail() {
        let dir = tempdir().unwrap();
        let storage = SqliteStorage::new(make_config(&dir.path().join("x.db")));
        assert_eq!(storage.name(), "sqlite");
        assert_eq!(storage.adapter_type(), AdapterType::Storage);
        assert!(matches!(
            storage.health_check().await.unwrap(),
            HealthStatus::Unhealthy(_)
        ));
        assert!(storage.get_user(1).await.is_err());
    }

    #[tokio::test]
    async fn initialize_twice_returns_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("double.db");
        let storage = SqliteStorage::new(make_config(&path));
        storage.initialize().await.unwrap();
        assert!(path.exists());
        assert!(storage.initialize().await.is_err());
        assert_eq!(storage.health_check().await.unwrap(), HealthStatus::Healthy);
        storage.close().await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_signup_is_conflict() {
        let dir = tempdir().unwrap();
        let storage = SqliteStorage::new(make_config(&dir.path().join("u.db")));
        storage.initialize().await.unwrap();
        storage.create_user("+1", "t1").await.unwrap();
        let err = storage.create_user("+1", "t2").await.unwrap_err();
        assert!(matches!(err, ParleyError::Conflict(_)));
        storage.close().await.unwrap();
    }
}
