// SPDX-FileCopyrightText: 2026 MessengerFlow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of [`StoreAdapter`].

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use mflow_config::model::StorageConfig;
use mflow_core::{
    AdapterType, FlowError, HealthStatus, PluginAdapter, StoreAdapter, StoredRecord, Table,
};

use crate::database::Database;
use crate::queries;

/// SQLite-backed store adapter.
///
/// The database is opened on [`StoreAdapter::init`], not on construction.
pub struct SqliteStore {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStore {
    /// The connection is not opened until [`StoreAdapter::init`] is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    fn db(&self) -> Result<&Database, FlowError> {
        self.db.get().ok_or_else(|| FlowError::Storage {
            source: "store not initialized; call init() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Store
    }

    async fn health_check(&self) -> Result<HealthStatus, FlowError> {
        self.db()?.ping().await?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), FlowError> {
        if let Some(db) = self.db.get() {
            db.checkpoint().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl StoreAdapter for SqliteStore {
    async fn init(&self) -> Result<(), FlowError> {
        let db = Database::open(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| FlowError::Storage {
            source: "store already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "sqlite store initialized");
        Ok(())
    }

    async fn get_all(&self, table: Table) -> Result<Vec<StoredRecord>, FlowError> {
        queries::records::get_all(self.db()?, table).await
    }

    async fn put(&self, table: Table, record: StoredRecord) -> Result<(), FlowError> {
        queries::records::upsert(self.db()?, table, record).await
    }

    async fn delete(&self, table: Table, id: &str) -> Result<(), FlowError> {
        queries::records::delete(self.db()?, table, id).await
    }

    async fn clear_store(&self, table: Table) -> Result<(), FlowError> {
        let removed = queries::records::clear(self.db()?, table).await?;
        debug!(%table, removed, "table cleared");
        Ok(())
    }
}
