// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The Parley message pipeline.
//!
//! A message enters through [`JobProducer::submit`], which applies the daily
//! quota, stores the message, and enqueues a reply job. [`Worker`]s drain the
//! queue, call the generation service, and store the assistant reply. The
//! [`Reconciler`] re-enqueues anything that fell through. Chatroom listings
//! are served through the [`ChatroomCache`].

pub mod cache;
pub mod chatrooms;
pub mod producer;
pub mod rate_limit;
pub mod reconcile;
pub mod shutdown;
pub mod worker;

pub use cache::ChatroomCache;
pub use chatrooms::{ChatroomDetail, ChatroomService, ListingSource};
pub use producer::{JobProducer, Submission};
pub use rate_limit::{QuotaPolicy, RateLimiter};
pub use reconcile::Reconciler;
pub use shutdown::install_signal_handler;
pub use worker::{FALLBACK_REPLY, JobOutcome, Worker};
