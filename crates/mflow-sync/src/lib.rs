// SPDX-FileCopyrightText: 2026 MessengerFlow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reconciliation engine for the MessengerFlow inbox.
//!
//! The [`Inbox`] is the single owner of canonical state. It:
//! - merges fetched, webhook-delivered and optimistic messages
//! - enforces the outbound content policy before any send
//! - mirrors every mutation to the local store in mutation order
//! - drives delta and full-history syncs against the remote gateway
//!
//! [`ConversationPoller`] runs the periodic delta sync for one conversation.

pub mod engine;
pub mod policy;
pub mod poller;
pub mod reconcile;
pub mod shutdown;

pub use engine::{Inbox, InboxSettings, SyncReport};
pub use policy::{ContentPolicy, extract_urls};
pub use poller::{ConversationPoller, PollHandle, Pollers};
pub use reconcile::{InboxState, IngestReport, WriteOp, WritePlan};
