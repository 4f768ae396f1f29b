// SPDX-FileCopyrightText: 2026 Workwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain model types for storage entities.
//!
//! The canonical types are defined in `workwire-core::types` for use across
//! service boundaries. This module re-exports them for convenience within
//! the storage crate.

pub use workwire_core::types::{ChatMessage, Conversation};
