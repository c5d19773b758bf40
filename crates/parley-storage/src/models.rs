// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row decoding for storage entities.
//!
//! Public entity types live in `parley-core`; this module maps SQLite rows
//! onto them and defines the queue's internal row shape.

use std::str::FromStr;

use parley_core::types::{Chatroom, Message, Role, Tier, User};
use rusqlite::Row;
use rusqlite::types::Type;

/// Read a text column and parse it with `FromStr`.
fn parse_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) const USER_COLUMNS: &str = "id, mobile, tier, token, created_at";

pub(crate) fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        mobile: row.get(1)?,
        tier: parse_column::<Tier>(row, 2)?,
        token: row.get(3)?,
        created_at: row.get(4)?,
    })
}

pub(crate) const CHATROOM_COLUMNS: &str = "id, user_id, title, created_at";

pub(crate) fn chatroom_from_row(row: &Row<'_>) -> rusqlite::Result<Chatroom> {
    Ok(Chatroom {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        created_at: row.get(3)?,
    })
}

pub(crate) const MESSAGE_COLUMNS: &str =
    "id, chatroom_id, role, content, created_at, processed, reply_to";

pub(crate) fn message_from_row(row: &Row<'_>) -> rusqlite::Result<Message> {
    Ok(Message {
        id: row.get(0)?,
        chatroom_id: row.get(1)?,
        role: parse_column::<Role>(row, 2)?,
        content: row.get(3)?,
        created_at: row.get(4)?,
        processed: row.get(5)?,
        reply_to: row.get(6)?,
    })
}

/// A row of the `queue` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    pub id: i64,
    pub job_id: String,
    pub queue_name: String,
    pub partition_key: String,
    pub message_id: Option<i64>,
    pub payload: String,
    pub status: String,
    pub attempts: u32,
    pub max_attempts: u32,
    pub created_at: String,
    pub updated_at: String,
    pub locked_until: Option<String>,
    /// Token of the current delivery while `processing`.
    pub lease: Option<String>,
}

pub(crate) const QUEUE_COLUMNS: &str = "id, job_id, queue_name, partition_key, message_id, payload, \
     status, attempts, max_attempts, created_at, updated_at, locked_until, lease";

pub(crate) fn queue_entry_from_row(row: &Row<'_>) -> rusqlite::Result<QueueEntry> {
    Ok(QueueEntry {
        id: row.get(0)?,
        job_id: row.get(1)?,
        queue_name: row.get(2)?,
        partition_key: row.get(3)?,
        message_id: row.get(4)?,
        payload: row.get(5)?,
        status: row.get(6)?,
        attempts: row.get(7)?,
        max_attempts: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
        locked_until: row.get(11)?,
        lease: row.get(12)?,
    })
}
