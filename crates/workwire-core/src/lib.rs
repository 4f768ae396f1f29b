// SPDX-FileCopyrightText: 2026 Workwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Workwire realtime communication core.
//!
//! This crate provides the foundational trait definitions, error types,
//! domain types, and wire event envelopes used throughout the Workwire
//! workspace. The service crates (chat, calls, signaling) and the gateway
//! all build on what is defined here.

pub mod error;
pub mod events;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::WireError;
pub use types::{
    AdapterType, CallSession, CallStatus, CallType, ChatMessage, Conversation, HealthStatus,
    Identity, MessageKind, Role,
};

// Re-export adapter traits at crate root.
pub use traits::{AuthAdapter, PluginAdapter, StorageAdapter};
