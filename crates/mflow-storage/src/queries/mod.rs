// SPDX-FileCopyrightText: 2026 MessengerFlow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules over [`Database`](crate::database::Database).

pub mod records;
