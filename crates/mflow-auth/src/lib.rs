// SPDX-FileCopyrightText: 2026 MessengerFlow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Password login and authorization for MessengerFlow agents.
//!
//! Secrets are stored as Argon2id PHC strings. [`SessionGate`] owns the
//! agent roster and the durable pointer to the logged-in agent; visibility
//! questions are answered with the shared rules in [`mflow_core::access`].

pub mod gate;
pub mod password;

pub use gate::{NewAgent, SessionGate};
pub use password::{hash_secret, verify_secret};
