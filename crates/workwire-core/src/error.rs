// SPDX-FileCopyrightText: 2026 Workwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Workwire realtime core.

use thiserror::Error;

/// The primary error type used across all Workwire services and adapters.
///
/// Every collaborator failure is converted into one of these kinds at the
/// boundary where it occurs; no operation lets a foreign error type escape.
#[derive(Debug, Error)]
pub enum WireError {
    /// Authentication failures: missing/invalid/expired credential or
    /// identity mismatch. The connection or request is refused before any
    /// state is touched.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The addressed conversation, call session, room, or participant does
    /// not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// The caller is not a participant of the addressed conversation/call.
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// Malformed input rejected before any lookup (missing fields, unknown
    /// event kind, invalid status value).
    #[error("validation error: {0}")]
    Validation(String),

    /// Durable store errors (connection, query, migration failure).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Transport/channel errors (bind failure, socket closed mid-send).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration errors (invalid TOML, missing required fields).
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl WireError {
    /// Shorthand for a NotFound over a conversation id.
    pub fn conversation_not_found(id: &str) -> Self {
        WireError::NotFound {
            kind: "conversation",
            id: id.to_string(),
        }
    }

    /// Shorthand for a NotFound over a call session.
    pub fn call_not_found(conversation_id: &str) -> Self {
        WireError::NotFound {
            kind: "call",
            id: conversation_id.to_string(),
        }
    }
}
