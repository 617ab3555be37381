// SPDX-FileCopyrightText: 2026 MessengerFlow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory [`StoreAdapter`] for tests and throwaway runs.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use mflow_core::{
    AdapterType, FlowError, HealthStatus, PluginAdapter, StoreAdapter, StoredRecord, Table,
};

/// Non-durable store. State is lost when the value is dropped.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<BTreeMap<Table, BTreeMap<String, serde_json::Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently held in `table`.
    pub async fn len(&self, table: Table) -> usize {
        self.tables.lock().await.get(&table).map_or(0, BTreeMap::len)
    }
}

#[async_trait]
impl PluginAdapter for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Store
    }

    async fn health_check(&self) -> Result<HealthStatus, FlowError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), FlowError> {
        Ok(())
    }
}

#[async_trait]
impl StoreAdapter for MemoryStore {
    async fn init(&self) -> Result<(), FlowError> {
        Ok(())
    }

    async fn get_all(&self, table: Table) -> Result<Vec<StoredRecord>, FlowError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .get(&table)
            .map(|rows| {
                rows.iter()
                    .map(|(id, body)| StoredRecord {
                        id: id.clone(),
                        body: body.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn put(&self, table: Table, record: StoredRecord) -> Result<(), FlowError> {
        self.tables
            .lock()
            .await
            .entry(table)
            .or_default()
            .insert(record.id, record.body);
        Ok(())
    }

    async fn delete(&self, table: Table, id: &str) -> Result<(), FlowError> {
        if let Some(rows) = self.tables.lock().await.get_mut(&table) {
            rows.remove(id);
        }
        Ok(())
    }

    async fn clear_store(&self, table: Table) -> Result<(), FlowError> {
        self.tables.lock().await.remove(&table);
        Ok(())
    }
}
