// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chatroom rows.

use parley_core::ParleyError;
use parley_core::types::Chatroom;
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};
use crate::models::{CHATROOM_COLUMNS, chatroom_from_row};

pub async fn create_chatroom(
    db: &Database,
    user_id: i64,
    title: &str,
) -> Result<Chatroom, ParleyError> {
    let title = title.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO chatrooms (user_id, title) VALUES (?1, ?2)",
                params![user_id, title],
            )?;
            let id = conn.last_insert_rowid();
            conn.query_row(
                &format!("SELECT {CHATROOM_COLUMNS} FROM chatrooms WHERE id = ?1"),
                params![id],
                chatroom_from_row,
            )
        })
        .await
        .map_err(map_tr_err)
}

/// Chatrooms of `user_id`, newest first.
pub async fn list_chatrooms(db: &Database, user_id: i64) -> Result<Vec<Chatroom>, ParleyError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CHATROOM_COLUMNS} FROM chatrooms WHERE user_id = ?1
                 ORDER BY created_at DESC, id DESC"
            ))?;
            let rows = stmt.query_map(params![user_id], chatroom_from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// The chatroom `id`, only if it belongs to `user_id`.
pub async fn get_chatroom(
    db: &Database,
    id: i64,
    user_id: i64,
) -> Result<Option<Chatroom>, ParleyError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {CHATROOM_COLUMNS} FROM chatrooms WHERE id = ?1 AND user_id = ?2"),
                params![id, user_id],
                chatroom_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}
