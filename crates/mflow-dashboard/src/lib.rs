// SPDX-FileCopyrightText: 2026 MessengerFlow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dashboard aggregates derived from an inbox snapshot.
//!
//! Everything here is a pure function of the snapshot, the viewer and the
//! current instant. Visibility follows [`mflow_core::access`].

pub mod projector;

pub use projector::{ChartPoint, DashboardStats, format_response_time, project};
