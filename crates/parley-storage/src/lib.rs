// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for Parley.
//!
//! One WAL-mode database file holds users, chatrooms, messages, the job
//! queue, and the expiring key-value table. Every process reaches it through
//! a single `tokio-rusqlite` connection; schema migrations are embedded and
//! applied on open.

pub mod adapter;
pub mod database;
pub mod kv;
pub mod migrations;
pub mod models;
pub mod queries;
pub mod queue;

pub use adapter::SqliteStorage;
pub use database::Database;
pub use kv::{MemoryKv, SqliteKv};
pub use models::QueueEntry;
pub use queue::SqliteJobQueue;
