// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User rows.

use parley_core::types::{Tier, User};
use parley_core::ParleyError;
use rusqlite::{ErrorCode, OptionalExtension, params};

use crate::database::{Database, map_tr_err};
use crate::models::{USER_COLUMNS, user_from_row};

/// Insert a user on the basic tier. Returns `None` if the mobile number or
/// token is already taken.
pub async fn create_user(
    db: &Database,
    mobile: &str,
    token: &str,
) -> Result<Option<User>, ParleyError> {
    let mobile = mobile.to_string();
    let token = token.to_string();
    db.connection()
        .call(move |conn| {
            let inserted = conn.execute(
                "INSERT INTO users (mobile, token) VALUES (?1, ?2)",
                params![mobile, token],
            );
            match inserted {
                Ok(_) => {}
                Err(rusqlite::Error::SqliteFailure(err, _))
                    if err.code == ErrorCode::ConstraintViolation =>
                {
                    return Ok(None);
                }
                Err(e) => return Err(e),
            }
            let id = conn.last_insert_rowid();
            conn.query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![id],
                user_from_row,
            )
            .map(Some)
        })
        .await
        .map_err(map_tr_err)
}

async fn get_user_where(
    db: &Database,
    column: &'static str,
    value: rusqlite::types::Value,
) -> Result<Option<User>, ParleyError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1"),
                params![value],
                user_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_user(db: &Database, id: i64) -> Result<Option<User>, ParleyError> {
    get_user_where(db, "id", id.into()).await
}

pub async fn get_user_by_token(db: &Database, token: &str) -> Result<Option<User>, ParleyError> {
    get_user_where(db, "token", token.to_string().into()).await
}

pub async fn get_user_by_mobile(db: &Database, mobile: &str) -> Result<Option<User>, ParleyError> {
    get_user_where(db, "mobile", mobile.to_string().into()).await
}

/// Change a user's tier. Unknown ids are reported as `NotFound`.
pub async fn set_user_tier(db: &Database, id: i64, tier: Tier) -> Result<(), ParleyError> {
    let tier = tier.to_string();
    let updated = db
        .connection()
        .call(move |conn| conn.execute("UPDATE users SET tier = ?1 WHERE id = ?2", params![tier, id]))
        .await
        .map_err(map_tr_err)?;
    if updated == 0 {
        return Err(ParleyError::NotFound {
            resource: "user".to_string(),
        });
    }
    Ok(())
}
