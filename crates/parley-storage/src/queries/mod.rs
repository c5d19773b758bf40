// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query functions, one module per table.

pub mod chatrooms;
pub mod kv;
pub mod messages;
pub mod queue;
pub mod users;
