// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message rows.
//!
//! Messages are append-only. Assistant replies carry `reply_to`, which a
//! partial unique index restricts to one reply per user message.

use parley_core::ParleyError;
use parley_core::types::Message;
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};
use crate::models::{MESSAGE_COLUMNS, message_from_row};

fn select_by_id(conn: &rusqlite::Connection, id: i64) -> rusqlite::Result<Message> {
    conn.query_row(
        &format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1"),
        params![id],
        message_from_row,
    )
}

/// Persist a user message with `processed = false`.
pub async fn insert_user_message(
    db: &Database,
    chatroom_id: i64,
    content: &str,
) -> Result<Message, ParleyError> {
    let content = content.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO messages (chatroom_id, role, content, processed)
                 VALUES (?1, 'user', ?2, 0)",
                params![chatroom_id, content],
            )?;
            select_by_id(conn, conn.last_insert_rowid())
        })
        .await
        .map_err(map_tr_err)
}

/// Persist the assistant reply to `reply_to`.
///
/// Returns `None`, writing nothing, when that message already has a reply.
pub async fn insert_assistant_reply(
    db: &Database,
    chatroom_id: i64,
    reply_to: i64,
    content: &str,
) -> Result<Option<Message>, ParleyError> {
    let content = content.to_string();
    db.connection()
        .call(move |conn| {
            let inserted = conn.execute(
                "INSERT INTO messages (chatroom_id, role, content, processed, reply_to)
                 VALUES (?1, 'assistant', ?2, 1, ?3)
                 ON CONFLICT DO NOTHING",
                params![chatroom_id, content, reply_to],
            )?;
            if inserted == 0 {
                return Ok(None);
            }
            select_by_id(conn, conn.last_insert_rowid()).map(Some)
        })
        .await
        .map_err(map_tr_err)
}

/// All messages of a chatroom ordered by `(created_at, id)`.
pub async fn get_messages(db: &Database, chatroom_id: i64) -> Result<Vec<Message>, ParleyError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages WHERE chatroom_id = ?1
                 ORDER BY created_at ASC, id ASC"
            ))?;
            let rows = stmt.query_map(params![chatroom_id], message_from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn find_reply(db: &Database, message_id: i64) -> Result<Option<Message>, ParleyError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE reply_to = ?1"),
                params![message_id],
                message_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Up to `limit` user messages created before `cutoff` that have neither a
/// reply nor a queue entry in any state, oldest first.
pub async fn unanswered_user_messages(
    db: &Database,
    cutoff: &str,
    limit: usize,
) -> Result<Vec<Message>, ParleyError> {
    let cutoff = cutoff.to_string();
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT m.id, m.chatroom_id, m.role, m.content, m.created_at, m.processed, m.reply_to
                 FROM messages m
                 WHERE m.role = 'user' AND m.created_at < ?1
                   AND NOT EXISTS (SELECT 1 FROM messages r WHERE r.reply_to = m.id)
                   AND NOT EXISTS (SELECT 1 FROM queue q WHERE q.message_id = m.id)
                 ORDER BY m.created_at ASC, m.id ASC
                 LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![cutoff, limit], message_from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::now_timestamp;
    use crate::queries::test_support::{seed_chatroom, setup_db};
    use parley_core::types::Role;

    #[tokio::test]
    async fn user_message_defaults() {
        let (db, _dir) = setup_db().await;
        let (_, room) = seed_chatroom(&db).await;

        let msg = insert_user_message(&db, room, "Hello").await.unwrap();
        assert_eq!(msg.role, Role::User);
        assert!(!msg.processed);
        assert_eq!(msg.reply_to, None);
        assert_eq!(get_messages(&db, room).await.unwrap(), vec![msg]);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn second_reply_is_ignored() {
        let (db, _dir) = setup_db().await;
        let (_, room) = seed_chatroom(&db).await;
        let question = insert_user_message(&db, room, "Q").await.unwrap();

        let reply = insert_assistant_reply(&db, room, question.id, "A1")
            .await
            .unwrap()
            .unwrap();
        assert!(reply.processed);
        assert_eq!(reply.reply_to, Some(question.id));

        let dup = insert_assistant_reply(&db, room, question.id, "A2").await.unwrap();
        assert!(dup.is_none());
        assert_eq!(get_messages(&db, room).await.unwrap().len(), 2);
        assert_eq!(find_reply(&db, question.id).await.unwrap().unwrap().content, "A1");
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn order_ties_broken_by_id() {
        let (db, _dir) = setup_db().await;
        let (_, room) = seed_chatroom(&db).await;
        db.connection()
            .call(move |conn| {
                conn.execute_batch(&format!(
                    "INSERT INTO messages (id, chatroom_id, role, content, created_at)
                     VALUES (7, {room}, 'user', 'b', '2026-01-01T00:00:00.000Z');
                     INSERT INTO messages (id, chatroom_id, role, content, created_at)
                     VALUES (3, {room}, 'user', 'a', '2026-01-01T00:00:00.000Z');
                     INSERT INTO messages (id, chatroom_id, role, content, created_at)
                     VALUES (1, {room}, 'user', 'c', '2026-01-01T00:00:01.000Z');"
                ))
            })
            .await
            .unwrap();
        let ids: Vec<i64> = get_messages(&db, room).await.unwrap().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![3, 7, 1]);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn unanswered_excludes_replied_and_recent() {
        let (db, _dir) = setup_db().await;
        let (_, room) = seed_chatroom(&db).await;
        let answered = insert_user_message(&db, room, "answered").await.unwrap();
        let orphan = insert_user_message(&db, room, "orphan").await.unwrap();
        insert_assistant_reply(&db, room, answered.id, "ok").await.unwrap();

        let cutoff = "9999-01-01T00:00:00.000Z";
        let found = unanswered_user_messages(&db, cutoff, 10).await.unwrap();
        assert_eq!(found, vec![orphan]);

        let found = unanswered_user_messages(&db, "2000-01-01T00:00:00.000Z", 10)
            .await
            .unwrap();
        assert!(found.is_empty());
        assert!(now_timestamp().as_str() < cutoff);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn queued_messages_are_not_orphans() {
        let (db, _dir) = setup_db().await;
        let (_, room) = seed_chatroom(&db).await;
        let queued = insert_user_message(&db, room, "queued").await.unwrap();
        let first = insert_user_message(&db, room, "first").await.unwrap();
        let second = insert_user_message(&db, room, "second").await.unwrap();
        crate::queries::queue::enqueue(
            &db,
            crate::queries::queue::NewEntry {
                job_id: "j1",
                queue_name: "gemini",
                partition_key: "1",
                message_id: Some(queued.id),
                payload: "{}",
                max_attempts: 1,
            },
        )
        .await
        .unwrap();

        let cutoff = "9999-01-01T00:00:00.000Z";
        assert_eq!(
            unanswered_user_messages(&db, cutoff, 10).await.unwrap(),
            vec![first.clone(), second]
        );
        assert_eq!(unanswered_user_messages(&db, cutoff, 1).await.unwrap(), vec![first]);
        db.close().await.unwrap();
    }
}
