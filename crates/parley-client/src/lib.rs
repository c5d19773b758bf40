// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Client side of the Parley API: a typed HTTP client and the reply poller
//! used by `parley chat`.

pub mod api;
pub mod error;
pub mod poller;

pub use api::{ApiClient, ChatroomDetail, ChatroomInfo, Listing, MessageInfo, Queued};
pub use error::ClientError;
pub use poller::{ChatroomSource, PollConfig, PollOutcome, Poller};
