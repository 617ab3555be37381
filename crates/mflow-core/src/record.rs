// SPDX-FileCopyrightText: 2026 MessengerFlow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Logical tables and the typed view over [`StoreAdapter`].
//!
//! Store adapters only see JSON documents keyed by id. Each domain record
//! binds itself to one [`Table`] through the [`Record`] trait, and the free
//! functions here do the encoding so callers stay strongly typed.

use serde::Serialize;
use serde::de::DeserializeOwned;
use strum::{Display, EnumIter, EnumString};
use tracing::warn;

use crate::error::FlowError;
use crate::traits::StoreAdapter;
use crate::types::{
    Agent, ApprovedLink, ApprovedMedia, Conversation, Message, Page, SessionPointer, SyncMarker,
};

/// Named logical tables of the local store.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, EnumIter,
)]
#[strum(serialize_all = "snake_case")]
pub enum Table {
    Agents,
    Pages,
    Conversations,
    Messages,
    Links,
    Media,
    SyncState,
    Session,
}

/// A raw document as stored by an adapter.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub id: String,
    pub body: serde_json::Value,
}

/// A domain record that lives in exactly one logical table.
pub trait Record: Serialize + DeserializeOwned + Send + Sync {
    const TABLE: Table;

    fn key(&self) -> &str;
}

macro_rules! impl_record {
    ($ty:ty, $table:expr) => {
        impl Record for $ty {
            const TABLE: Table = $table;

            fn key(&self) -> &str {
                &self.id
            }
        }
    };
}

impl_record!(Agent, Table::Agents);
impl_record!(Page, Table::Pages);
impl_record!(Conversation, Table::Conversations);
impl_record!(Message, Table::Messages);
impl_record!(ApprovedLink, Table::Links);
impl_record!(ApprovedMedia, Table::Media);
impl_record!(SyncMarker, Table::SyncState);
impl_record!(SessionPointer, Table::Session);

/// Encode a record into the adapter's document form.
pub fn encode<T: Record>(record: &T) -> Result<StoredRecord, FlowError> {
    Ok(StoredRecord {
        id: record.key().to_string(),
        body: serde_json::to_value(record)?,
    })
}

/// Read every record of `T`'s table.
///
/// Documents that no longer decode (schema drift, manual edits) are skipped
/// with a warning instead of failing the whole load.
pub async fn load_all<T: Record>(store: &dyn StoreAdapter) -> Result<Vec<T>, FlowError> {
    let rows = store.get_all(T::TABLE).await?;
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        match serde_json::from_value::<T>(row.body) {
            Ok(record) => out.push(record),
            Err(e) => warn!(table = %T::TABLE, id = %row.id, error = %e, "skipping undecodable record"),
        }
    }
    Ok(out)
}

/// Upsert one record into its table.
pub async fn save<T: Record>(store: &dyn StoreAdapter, record: &T) -> Result<(), FlowError> {
    store.put(T::TABLE, encode(record)?).await
}

/// Delete one record of `T`'s table by id.
pub async fn remove<T: Record>(store: &dyn StoreAdapter, id: &str) -> Result<(), FlowError> {
    store.delete(T::TABLE, id).await
}
