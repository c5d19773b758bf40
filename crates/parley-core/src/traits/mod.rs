// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions.
//!
//! Every external dependency of the pipeline sits behind one of these traits
//! and is injected as `Arc<dyn Trait>`, so tests can substitute in-memory
//! implementations.

pub mod adapter;
pub mod generation;
pub mod kv;
pub mod queue;
pub mod storage;

pub use adapter::PluginAdapter;
pub use generation::GenerationService;
pub use kv::KvStore;
pub use queue::JobQueue;
pub use storage::StorageAdapter;
