// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Parley integration tests.
//!
//! Provides mock adapters and a harness that wires the whole pipeline over a
//! temporary SQLite database, so tests run without network services.
//!
//! # Components
//!
//! - [`MockGenerator`] - Generation service with scripted replies
//! - [`FailingKv`], [`FailingQueue`] - Adapters whose every call fails
//! - [`TestHarness`] - Storage, queue, producer, worker, and reconciler in one place

pub mod failing;
pub mod harness;
pub mod mock_generator;

pub use failing::{FailingKv, FailingQueue};
pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_generator::MockGenerator;
