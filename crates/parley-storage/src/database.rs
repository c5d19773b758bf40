// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connection lifecycle.
//!
//! Each process talks to SQLite through one `tokio-rusqlite` connection, so
//! every query runs on a single background thread. Several processes may
//! share the file; WAL mode and a busy timeout keep them from tripping over
//! each other.

use std::path::Path;
use std::time::Duration;

use parley_core::ParleyError;
use tracing::{debug, info};

use crate::migrations;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Per-connection settings. `foreign_keys` and `busy_timeout` do not persist
/// in the file, so every connection applies them.
fn apply_pragmas(conn: &rusqlite::Connection) -> rusqlite::Result<()> {
    let _mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.busy_timeout(BUSY_TIMEOUT)
}

/// Cloneable handle to an open, migrated database.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
    path: String,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").field("path", &self.path).finish()
    }
}

impl Database {
    /// Open (creating if needed) the database at `path` and bring its schema
    /// up to date.
    pub async fn open(path: &str) -> Result<Self, ParleyError> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| ParleyError::Storage {
                    source: Box::new(e),
                })?;
            }
        }

        // Migrations need a plain rusqlite connection; run them off the runtime.
        let migrate_path = path.to_string();
        tokio::task::spawn_blocking(move || -> Result<(), ParleyError> {
            let mut conn = rusqlite::Connection::open(&migrate_path).map_err(storage_err)?;
            apply_pragmas(&conn).map_err(storage_err)?;
            migrations::run_migrations(&mut conn)
        })
        .await
        .map_err(|e| ParleyError::Internal(format!("migration task failed: {e}")))??;

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| ParleyError::Storage {
                source: Box::new(e),
            })?;
        conn.call(|conn| apply_pragmas(conn))
            .await
            .map_err(map_tr_err)?;

        info!(path, "database opened");
        Ok(Self {
            conn,
            path: path.to_string(),
        })
    }

    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Close the background connection. Every clone of this handle stops
    /// working afterwards.
    pub async fn close(&self) -> Result<(), ParleyError> {
        self.conn
            .clone()
            .close()
            .await
            .map_err(|e| ParleyError::Storage {
                source: e.to_string().into(),
            })?;
        debug!(path = %self.path, "database closed");
        Ok(())
    }
}

pub(crate) fn storage_err(e: rusqlite::Error) -> ParleyError {
    ParleyError::Storage {
        source: Box::new(e),
    }
}

/// Convert a tokio-rusqlite error into `ParleyError::Storage`.
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> ParleyError {
    ParleyError::Storage {
        source: Box::new(e),
    }
}

/// Current time in the format the schema uses for `created_at` columns.
pub fn now_timestamp() -> String {
    format_timestamp(chrono::Utc::now())
}

pub fn format_timestamp(at: chrono::DateTime<chrono::Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}
