// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable job queue with per-partition exclusion.
//!
//! Entries move `pending -> processing -> completed | failed`. A processing
//! entry holds a lock until `locked_until`; while the lock is live no other
//! entry with the same partition key is handed out. Expired locks are
//! reclaimed on the next dequeue and count as a failed attempt.
//!
//! Every claim writes a fresh `lease`. `ack` and `fail` match on it, so a
//! worker whose lock expired cannot settle the entry out from under the
//! worker that now holds it.

use std::time::Duration;

use parley_core::ParleyError;
use rusqlite::{OptionalExtension, TransactionBehavior, params};

use crate::database::{Database, map_tr_err};
use crate::models::{QUEUE_COLUMNS, QueueEntry, queue_entry_from_row};

const NOW: &str = "strftime('%Y-%m-%dT%H:%M:%fZ', 'now')";

/// Fields of a new queue entry.
#[derive(Debug, Clone)]
pub struct NewEntry<'a> {
    pub job_id: &'a str,
    pub queue_name: &'a str,
    pub partition_key: &'a str,
    pub message_id: Option<i64>,
    pub payload: &'a str,
    pub max_attempts: u32,
}

/// Insert a pending entry. Returns its row id.
pub async fn enqueue(db: &Database, entry: NewEntry<'_>) -> Result<i64, ParleyError> {
    let job_id = entry.job_id.to_string();
    let queue_name = entry.queue_name.to_string();
    let partition_key = entry.partition_key.to_string();
    let payload = entry.payload.to_string();
    let message_id = entry.message_id;
    let max_attempts = entry.max_attempts;
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO queue (job_id, queue_name, partition_key, message_id, payload, max_attempts)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![job_id, queue_name, partition_key, message_id, payload, max_attempts],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(map_tr_err)
}

/// SQLite datetime modifier for a lock duration, e.g. `+300.000 seconds`.
fn lock_modifier(visibility: Duration) -> String {
    format!("+{:.3} seconds", visibility.as_secs_f64())
}

/// Claim the oldest deliverable entry of `queue_name`.
///
/// Runs in an immediate transaction so concurrent processes sharing the
/// database file cannot claim the same entry.
pub async fn dequeue(
    db: &Database,
    queue_name: &str,
    visibility: Duration,
) -> Result<Option<QueueEntry>, ParleyError> {
    let queue_name = queue_name.to_string();
    let modifier = lock_modifier(visibility);
    let lease = uuid::Uuid::new_v4().to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            tx.execute(
                &format!(
                    "UPDATE queue SET
                        attempts = attempts + 1,
                        status = CASE WHEN attempts + 1 >= max_attempts THEN 'failed' ELSE 'pending' END,
                        locked_until = NULL,
                        lease = NULL,
                        updated_at = {NOW}
                     WHERE queue_name = ?1 AND status = 'processing' AND locked_until < {NOW}"
                ),
                params![queue_name],
            )?;

            let entry = tx
                .query_row(
                    &format!(
                        "SELECT {QUEUE_COLUMNS} FROM queue q
                         WHERE q.queue_name = ?1 AND q.status = 'pending'
                           AND NOT EXISTS (
                               SELECT 1 FROM queue o
                               WHERE o.queue_name = q.queue_name
                                 AND o.partition_key = q.partition_key
                                 AND o.status = 'processing'
                           )
                         ORDER BY q.id ASC
                         LIMIT 1"
                    ),
                    params![queue_name],
                    queue_entry_from_row,
                )
                .optional()?;

            let claimed = match entry {
                Some(entry) => {
                    let locked_until: String = tx.query_row(
                        &format!(
                            "UPDATE queue SET status = 'processing',
                                locked_until = strftime('%Y-%m-%dT%H:%M:%fZ', 'now', ?2),
                                lease = ?3,
                                updated_at = {NOW}
                             WHERE id = ?1
                             RETURNING locked_until"
                        ),
                        params![entry.id, modifier, lease],
                        |row| row.get(0),
                    )?;
                    Some(QueueEntry {
                        status: "processing".to_string(),
                        locked_until: Some(locked_until),
                        lease: Some(lease),
                        ..entry
                    })
                }
                None => None,
            };

            tx.commit()?;
            Ok(claimed)
        })
        .await
        .map_err(map_tr_err)
}

/// Mark an entry completed, releasing its partition. Returns false, and
/// changes nothing, unless the entry is processing under `lease`.
pub async fn ack(db: &Database, id: i64, lease: &str) -> Result<bool, ParleyError> {
    let lease = lease.to_string();
    db.connection()
        .call(move |conn| {
            let updated = conn.execute(
                &format!(
                    "UPDATE queue SET status = 'completed', locked_until = NULL, lease = NULL,
                        updated_at = {NOW}
                     WHERE id = ?1 AND status = 'processing' AND lease = ?2"
                ),
                params![id, lease],
            )?;
            Ok(updated == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// Mark an entry permanently failed regardless of its remaining attempts.
pub async fn bury(db: &Database, id: i64) -> Result<(), ParleyError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                &format!(
                    "UPDATE queue SET status = 'failed', locked_until = NULL, lease = NULL,
                        updated_at = {NOW}
                     WHERE id = ?1"
                ),
                params![id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Record a failed attempt. The entry goes back to `pending` until
/// `max_attempts` is reached, then becomes `failed`. Returns the new status,
/// or `None` when the entry is not processing under `lease`.
pub async fn fail(db: &Database, id: i64, lease: &str) -> Result<Option<String>, ParleyError> {
    let lease = lease.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!(
                    "UPDATE queue SET
                        attempts = attempts + 1,
                        status = CASE WHEN attempts + 1 >= max_attempts THEN 'failed' ELSE 'pending' END,
                        locked_until = NULL,
                        lease = NULL,
                        updated_at = {NOW}
                     WHERE id = ?1 AND status = 'processing' AND lease = ?2
                     RETURNING status"
                ),
                params![id, lease],
                |row| row.get(0),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// True if any entry of `queue_name`, in any state, references `message_id`.
pub async fn is_tracked(
    db: &Database,
    queue_name: &str,
    message_id: i64,
) -> Result<bool, ParleyError> {
    let queue_name = queue_name.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT EXISTS (SELECT 1 FROM queue WHERE queue_name = ?1 AND message_id = ?2)",
                params![queue_name, message_id],
                |row| row.get(0),
            )
        })
        .await
        .map_err(map_tr_err)
}

/// Entry counts per status for `queue_name`.
pub async fn status_counts(
    db: &Database,
    queue_name: &str,
) -> Result<Vec<(String, i64)>, ParleyError> {
    let queue_name = queue_name.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT status, COUNT(*) FROM queue WHERE queue_name = ?1
                 GROUP BY status ORDER BY status",
            )?;
            let rows = stmt.query_map(params![queue_name], |row| Ok((row.get(0)?, row.get(1)?)))?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}
