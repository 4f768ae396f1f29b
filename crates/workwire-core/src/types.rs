// SPDX-FileCopyrightText: 2026 Workwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the Workwire workspace.
//!
//! Timestamps are RFC 3339 UTC strings throughout, matching what the
//! storage layer persists.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// The two sides of the marketplace.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A party that posts jobs.
    Client,
    /// A party that fulfils jobs.
    Worker,
}

impl Role {
    /// The opposite side of the marketplace.
    pub fn counterpart(self) -> Role {
        match self {
            Role::Client => Role::Worker,
            Role::Worker => Role::Client,
        }
    }
}

/// A verified identity bound to a connection or request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: String,
    pub role: Role,
}

impl Identity {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }
}

/// Content kind of a chat message.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    #[default]
    Text,
    Image,
    File,
}

/// A durable pairing of one client and one worker around a specific job.
///
/// Created on first contact for a given job; mutated on every send
/// (last-message pointer, counterpart's unread counter) and every
/// read-receipt (own counter reset). Never deleted by this core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub job_id: String,
    pub client_id: String,
    pub worker_id: String,
    pub last_message_id: Option<String>,
    pub unread_client: i64,
    pub unread_worker: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl Conversation {
    /// Whether the given user is one of the two participants.
    pub fn is_participant(&self, user_id: &str) -> bool {
        self.client_id == user_id || self.worker_id == user_id
    }

    /// The role the given user plays in this conversation, if any.
    pub fn role_of(&self, user_id: &str) -> Option<Role> {
        if self.client_id == user_id {
            Some(Role::Client)
        } else if self.worker_id == user_id {
            Some(Role::Worker)
        } else {
            None
        }
    }

    /// The other participant's id and role, if the given user is a member.
    pub fn counterpart_of(&self, user_id: &str) -> Option<(&str, Role)> {
        match self.role_of(user_id)? {
            Role::Client => Some((self.worker_id.as_str(), Role::Worker)),
            Role::Worker => Some((self.client_id.as_str(), Role::Client)),
        }
    }

    /// Unread counter for the given participant.
    pub fn unread_for(&self, user_id: &str) -> i64 {
        match self.role_of(user_id) {
            Some(Role::Client) => self.unread_client,
            Some(Role::Worker) => self.unread_worker,
            None => 0,
        }
    }
}

/// A single chat message. Immutable once created except for `is_read`,
/// which transitions false -> true exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub conversation_id: String,
    pub job_id: String,
    pub sender_id: String,
    pub sender_role: Role,
    pub receiver_id: String,
    pub receiver_role: Role,
    pub content: String,
    pub kind: MessageKind,
    pub is_read: bool,
    pub created_at: String,
}

/// Call lifecycle states. Ended sessions are removed from the registry,
/// not retained.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CallStatus {
    Ringing,
    Connected,
    Ended,
}

/// Audio-only or audio+video call.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CallType {
    Audio,
    Video,
}

/// Ephemeral record of a call's lifecycle for one conversation.
///
/// Lives only in the in-memory registry; lost on process restart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallSession {
    pub id: String,
    pub conversation_id: String,
    pub call_type: CallType,
    pub initiator_id: String,
    pub initiator_role: Role,
    /// Participant ids in join order. The initiator is always first.
    pub participants: Vec<String>,
    pub status: CallStatus,
    pub started_at: String,
    pub ended_at: Option<String>,
}

impl CallSession {
    pub fn has_participant(&self, user_id: &str) -> bool {
        self.participants.iter().any(|p| p == user_id)
    }
}

/// Identifies the type of adapter behind a trait seam.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Auth,
    Storage,
    Channel,
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}
