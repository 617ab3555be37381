// SPDX-FileCopyrightText: 2026 MessengerFlow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP endpoint for MessengerFlow.
//!
//! Serves the health probe, the Messenger webhook (subscription handshake and
//! signed event deliveries) and, optionally, a built console UI.

pub mod auth;
pub mod events;
pub mod handlers;
pub mod server;

pub use auth::{WebhookAuth, sign, verify_signature};
pub use server::{GatewayState, ServerConfig, router, start_server};
