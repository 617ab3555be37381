// SPDX-FileCopyrightText: 2026 MessengerFlow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles an [`Inbox`] over a temp SQLite database and a
//! [`MockGateway`], and can reopen the same database to simulate a restart.

use std::sync::Arc;

use mflow_config::model::{MflowConfig, StorageConfig};
use mflow_core::{FlowError, StoreAdapter};
use mflow_storage::SqliteStore;
use mflow_sync::{Inbox, InboxSettings};

use crate::mock_gateway::MockGateway;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    settings: InboxSettings,
    store: Option<Arc<dyn StoreAdapter>>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            settings: InboxSettings::default(),
            store: None,
        }
    }

    pub fn with_settings(mut self, settings: InboxSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Use `store` instead of the temp SQLite database.
    pub fn with_store(mut self, store: Arc<dyn StoreAdapter>) -> Self {
        self.store = Some(store);
        self
    }

    /// Build the harness and load the (empty) inbox.
    pub async fn build(self) -> Result<TestHarness, FlowError> {
        let temp_dir = tempfile::TempDir::new().map_err(FlowError::storage)?;
        let db_path = temp_dir.path().join("mflow-test.db");

        let storage = StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            wal_mode: true,
        };
        let store = match self.store {
            Some(store) => store,
            None => Arc::new(SqliteStore::new(storage.clone())) as Arc<dyn StoreAdapter>,
        };
        let gateway = Arc::new(MockGateway::new());
        let inbox = Arc::new(Inbox::new(store.clone(), gateway.clone(), self.settings.clone()));
        inbox.load().await?;

        let config = MflowConfig {
            storage,
            ..MflowConfig::default()
        };

        Ok(TestHarness {
            inbox,
            gateway,
            store,
            settings: self.settings,
            config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with a mock provider and temp storage.
pub struct TestHarness {
    pub inbox: Arc<Inbox>,
    pub gateway: Arc<MockGateway>,
    pub store: Arc<dyn StoreAdapter>,
    pub settings: InboxSettings,
    /// Configuration pointing at the temp database.
    pub config: MflowConfig,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Shorthand for `builder().build()`.
    pub async fn new() -> Result<Self, FlowError> {
        Self::builder().build().await
    }

    /// A second inbox over a freshly opened connection to the same database,
    /// as after a process restart.
    pub async fn reopen(&self) -> Result<Inbox, FlowError> {
        let store: Arc<dyn StoreAdapter> = Arc::new(SqliteStore::new(self.config.storage.clone()));
        let inbox = Inbox::new(store, self.gateway.clone(), self.settings.clone());
        inbox.load().await?;
        Ok(inbox)
    }
}
