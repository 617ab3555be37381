// SPDX-FileCopyrightText: 2026 MessengerFlow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the MessengerFlow sync core.
//!
//! Holds the domain records, the error type, the adapter traits for the
//! local store and the remote messaging API, and the visibility rules used
//! by both the dashboard and the session gate.

pub mod access;
pub mod error;
pub mod record;
pub mod snapshot;
pub mod traits;
pub mod types;

pub use error::FlowError;
pub use record::{Record, StoredRecord, Table};
pub use snapshot::InboxSnapshot;
pub use traits::{PluginAdapter, RemoteGateway, StoreAdapter};
pub use types::{
    AdapterType, Agent, ApprovedLink, ApprovedMedia, Conversation, ConversationStatus,
    HealthStatus, MediaType, Message, MessageId, MessageOrigin, Page, Presence, Role,
    SessionPointer, SyncMarker,
};
