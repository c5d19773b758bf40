// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Expiring key-value rows.
//!
//! `expires_at` is a Unix timestamp in milliseconds; rows past it are treated
//! as absent and overwritten or purged lazily.

use rusqlite::{OptionalExtension, TransactionBehavior, params};

use parley_core::ParleyError;

use crate::database::{Database, map_tr_err};

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn expiry_millis(ttl: std::time::Duration) -> i64 {
    now_millis().saturating_add(i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX))
}

pub async fn get(db: &Database, key: &str) -> Result<Option<String>, ParleyError> {
    let key = key.to_string();
    let now = now_millis();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT value FROM kv WHERE key = ?1 AND (expires_at IS NULL OR expires_at > ?2)",
                params![key, now],
                |row| row.get(0),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn set_ex(
    db: &Database,
    key: &str,
    value: &str,
    ttl: std::time::Duration,
) -> Result<(), ParleyError> {
    let key = key.to_string();
    let value = value.to_string();
    let expires_at = expiry_millis(ttl);
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO kv (key, value, expires_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at",
                params![key, value, expires_at],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn delete(db: &Database, key: &str) -> Result<(), ParleyError> {
    let key = key.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Outcome of an increment attempt, before error mapping.
enum Incr {
    Value(i64),
    NotInteger(String),
}

/// Increment `key`, creating it at 1 with `ttl_if_new` when absent or expired.
pub async fn incr_with_expiry(
    db: &Database,
    key: &str,
    ttl_if_new: std::time::Duration,
) -> Result<i64, ParleyError> {
    let key_owned = key.to_string();
    let now = now_millis();
    let expires_at = expiry_millis(ttl_if_new);
    let outcome = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let current: Option<String> = tx
                .query_row(
                    "SELECT value FROM kv WHERE key = ?1 AND (expires_at IS NULL OR expires_at > ?2)",
                    params![key_owned, now],
                    |row| row.get(0),
                )
                .optional()?;

            let outcome = match current {
                None => {
                    // First write of a fresh key; sweep other dead rows while here.
                    tx.execute(
                        "DELETE FROM kv WHERE expires_at IS NOT NULL AND expires_at <= ?1",
                        params![now],
                    )?;
                    tx.execute(
                        "INSERT INTO kv (key, value, expires_at) VALUES (?1, '1', ?2)
                         ON CONFLICT(key) DO UPDATE SET value = '1', expires_at = excluded.expires_at",
                        params![key_owned, expires_at],
                    )?;
                    Incr::Value(1)
                }
                Some(raw) => match raw.parse::<i64>() {
                    Ok(n) => {
                        let next = n.saturating_add(1);
                        tx.execute(
                            "UPDATE kv SET value = ?2 WHERE key = ?1",
                            params![key_owned, next.to_string()],
                        )?;
                        Incr::Value(next)
                    }
                    Err(_) => Incr::NotInteger(raw),
                },
            };
            tx.commit()?;
            Ok(outcome)
        })
        .await
        .map_err(map_tr_err)?;

    match outcome {
        Incr::Value(n) => Ok(n),
        Incr::NotInteger(raw) => Err(ParleyError::KeyValue {
            message: format!("value at `{key}` is not an integer: {raw:?}"),
            source: None,
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::queries::test_support::setup_db;

    #[tokio::test]
    async fn set_get_delete() {
        let (db, _dir) = setup_db().await;
        set_ex(&db, "k", "v1", Duration::from_secs(60)).await.unwrap();
        set_ex(&db, "k", "v2", Duration::from_secs(60)).await.unwrap();
        assert_eq!(get(&db, "k").await.unwrap().as_deref(), Some("v2"));
        delete(&db, "k").await.unwrap();
        delete(&db, "k").await.unwrap();
        assert_eq!(get(&db, "k").await.unwrap(), None);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn expired_value_is_absent() {
        let (db, _dir) = setup_db().await;
        set_ex(&db, "k", "v", Duration::from_millis(10)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(get(&db, "k").await.unwrap(), None);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn incr_counts_and_restarts_after_expiry() {
        let (db, _dir) = setup_db().await;
        let ttl = Duration::from_millis(50);
        assert_eq!(incr_with_expiry(&db, "c", ttl).await.unwrap(), 1);
        assert_eq!(incr_with_expiry(&db, "c", ttl).await.unwrap(), 2);
        assert_eq!(get(&db, "c").await.unwrap().as_deref(), Some("2"));
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(incr_with_expiry(&db, "c", ttl).await.unwrap(), 1);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn incr_rejects_non_integer() {
        let (db, _dir) = setup_db().await;
        set_ex(&db, "k", "abc", Duration::from_secs(60)).await.unwrap();
        let err = incr_with_expiry(&db, "k", Duration::from_secs(60)).await.unwrap_err();
        assert!(matches!(err, ParleyError::KeyValue { .. }));
        db.close().await.unwrap();
    }
}
