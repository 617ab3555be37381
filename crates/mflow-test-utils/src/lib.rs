// SPDX-FileCopyrightText: 2026 MessengerFlow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for MessengerFlow integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic, CI-runnable tests without the real messaging provider.
//!
//! # Components
//!
//! - [`MockGateway`] - scripted provider with send echoes and failure switches
//! - [`FlakyStore`] - in-memory store whose writes can be made to fail
//! - [`TestHarness`] - inbox over a temp SQLite database and a mock gateway
//! - [`fixtures`] - record builders

pub mod fixtures;
pub mod flaky_store;
pub mod harness;
pub mod mock_gateway;

pub use flaky_store::FlakyStore;
pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_gateway::{MockGateway, SentMessage};
