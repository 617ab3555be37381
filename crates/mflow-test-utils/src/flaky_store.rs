// SPDX-FileCopyrightText: 2026 MessengerFlow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A [`StoreAdapter`] whose writes can be switched to fail.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use mflow_core::{
    AdapterType, FlowError, HealthStatus, PluginAdapter, StoreAdapter, StoredRecord, Table,
};
use mflow_storage::MemoryStore;

/// Wraps a [`MemoryStore`]; while failing, every write returns a storage error.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    failing: AtomicBool,
    fail_init: AtomicBool,
    writes: AtomicUsize,
    write_delay_ms: AtomicU64,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_fail_init(&self, failing: bool) {
        self.fail_init.store(failing, Ordering::SeqCst);
    }

    /// Hold every write for `delay` before applying it.
    pub fn set_write_delay(&self, delay: Duration) {
        let ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.write_delay_ms.store(ms, Ordering::SeqCst);
    }

    /// Successful writes so far.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub async fn len(&self, table: Table) -> usize {
        self.inner.len(table).await
    }

    async fn stall(&self) {
        let ms = self.write_delay_ms.load(Ordering::SeqCst);
        if ms > 0 {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
    }

    fn check(&self) -> Result<(), FlowError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(FlowError::storage(std::io::Error::other("disk I/O error")));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl PluginAdapter for FlakyStore {
    fn name(&self) -> &str {
        "flaky"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Store
    }

    async fn health_check(&self) -> Result<HealthStatus, FlowError> {
        if self.failing.load(Ordering::SeqCst) {
            Ok(HealthStatus::Unhealthy("writes failing".into()))
        } else {
            Ok(HealthStatus::Healthy)
        }
    }

    async fn shutdown(&self) -> Result<(), FlowError> {
        Ok(())
    }
}

#[async_trait]
impl StoreAdapter for FlakyStore {
    async fn init(&self) -> Result<(), FlowError> {
        if self.fail_init.load(Ordering::SeqCst) {
            return Err(FlowError::storage(std::io::Error::other(
                "unable to open database file",
            )));
        }
        self.inner.init().await
    }

    async fn get_all(&self, table: Table) -> Result<Vec<StoredRecord>, FlowError> {
        self.inner.get_all(table).await
    }

    async fn put(&self, table: Table, record: StoredRecord) -> Result<(), FlowError> {
        self.stall().await;
        self.check()?;
        self.inner.put(table, record).await
    }

    async fn delete(&self, table: Table, id: &str) -> Result<(), FlowError> {
        self.stall().await;
        self.check()?;
        self.inner.delete(table, id).await
    }

    async fn clear_store(&self, table: Table) -> Result<(), FlowError> {
        self.stall().await;
        self.check()?;
        self.inner.clear_store(table).await
    }
}
