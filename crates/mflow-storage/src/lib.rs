// SPDX-FileCopyrightText: 2026 MessengerFlow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Local store adapters for MessengerFlow.
//!
//! [`SqliteStore`] keeps every logical table in one WAL-mode SQLite document
//! table with embedded migrations and a single `tokio-rusqlite` writer.
//! [`MemoryStore`] is the non-durable variant used by tests.

pub mod adapter;
pub mod database;
pub mod memory;
pub mod migrations;
pub mod queries;

use std::sync::Arc;

use mflow_config::model::StorageConfig;
use mflow_core::StoreAdapter;

pub use adapter::SqliteStore;
pub use database::{Database, IN_MEMORY_PATH};
pub use memory::MemoryStore;

/// Build the store selected by `config`.
///
/// `:memory:` gives a [`MemoryStore`]; any other path a [`SqliteStore`].
pub fn store_from_config(config: &StorageConfig) -> Arc<dyn StoreAdapter> {
    if config.database_path == IN_MEMORY_PATH {
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(SqliteStore::new(config.clone()))
    }
}
