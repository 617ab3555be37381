// SPDX-FileCopyrightText: 2026 MessengerFlow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Local store adapter trait: durable key-value tables.

use async_trait::async_trait;

use crate::error::FlowError;
use crate::record::{StoredRecord, Table};
use crate::traits::adapter::PluginAdapter;

/// Durable key-value storage over named logical tables.
///
/// Implementations hold no business logic. Writes are last-write-wins per
/// `(table, id)`; no transaction spans more than one call.
#[async_trait]
pub trait StoreAdapter: PluginAdapter {
    /// Opens the backend (migrations, connections). Must be called once before use.
    async fn init(&self) -> Result<(), FlowError>;

    /// Returns every record of `table`.
    async fn get_all(&self, table: Table) -> Result<Vec<StoredRecord>, FlowError>;

    /// Inserts or replaces the record with the same id.
    async fn put(&self, table: Table, record: StoredRecord) -> Result<(), FlowError>;

    /// Removes a record. Deleting a missing id is not an error.
    async fn delete(&self, table: Table, id: &str) -> Result<(), FlowError>;

    /// Removes every record of `table`.
    async fn clear_store(&self, table: Table) -> Result<(), FlowError>;
}
