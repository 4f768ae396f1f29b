// SPDX-FileCopyrightText: 2026 Workwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles the complete realtime stack -- temp SQLite
//! storage, broadcaster, chat/call/room services, and the token verifier
//! -- without a network. [`TestConnection`] stands in for a connected
//! WebSocket client: it is a registered bus connection whose received
//! frames can be decoded back into typed events for assertions.

use std::sync::Arc;

use tokio::sync::mpsc;

use workwire_auth::{JwtAuthenticator, TokenClaims};
use workwire_bus::Broadcaster;
use workwire_calls::CallService;
use workwire_chat::ChatService;
use workwire_config::model::StorageConfig;
use workwire_core::events::{RoomServerEvent, ServerEvent};
use workwire_core::types::{Conversation, Identity, Role};
use workwire_core::{StorageAdapter, WireError};
use workwire_signaling::RoomManager;
use workwire_storage::SqliteStore;

/// Shared HMAC secret used by harness-issued tokens.
pub const TEST_SECRET: &str = "workwire-test-secret";

/// Builder for creating test environments.
pub struct TestHarnessBuilder {
    wal_mode: bool,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self { wal_mode: true }
    }

    /// Disable WAL mode (plain rollback journal).
    pub fn without_wal(mut self) -> Self {
        self.wal_mode = false;
        self
    }

    /// Build the harness, creating all required subsystems on a temp
    /// database.
    pub async fn build(self) -> Result<TestHarness, WireError> {
        let temp_dir = tempfile::TempDir::new().map_err(|e| WireError::Storage {
            source: Box::new(e),
        })?;
        let db_path = temp_dir.path().join("test.db");

        let store = SqliteStore::new(StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            wal_mode: self.wal_mode,
        });
        store.initialize().await?;
        let storage: Arc<dyn StorageAdapter> = Arc::new(store);

        let bus = Arc::new(Broadcaster::new());
        let chat = Arc::new(ChatService::new(Arc::clone(&storage), Arc::clone(&bus)));
        let calls = Arc::new(CallService::new(Arc::clone(&storage), Arc::clone(&bus)));
        let rooms = Arc::new(RoomManager::new(Arc::clone(&bus)));
        let auth = Arc::new(JwtAuthenticator::new(TEST_SECRET));

        Ok(TestHarness {
            storage,
            bus,
            chat,
            calls,
            rooms,
            auth,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment over a temp SQLite database.
pub struct TestHarness {
    pub storage: Arc<dyn StorageAdapter>,
    pub bus: Arc<Broadcaster>,
    pub chat: Arc<ChatService>,
    pub calls: Arc<CallService>,
    pub rooms: Arc<RoomManager>,
    pub auth: Arc<JwtAuthenticator>,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Open (or reuse) a conversation between a client and a worker,
    /// acting as the client.
    pub async fn seed_conversation(
        &self,
        job_id: &str,
        client_id: &str,
        worker_id: &str,
    ) -> Result<Conversation, WireError> {
        let client = Identity::new(client_id, Role::Client);
        Ok(self
            .chat
            .open_conversation(&client, job_id, client_id, worker_id)
            .await?
            .into_conversation())
    }

    /// Register a simulated connection for the user.
    pub fn connect(&self, conn_id: &str, user_id: &str) -> TestConnection {
        let rx = self.bus.register(conn_id, user_id);
        TestConnection {
            conn_id: conn_id.to_string(),
            rx,
        }
    }

    /// Issue a valid token for the user, for handshake/middleware tests.
    pub fn issue_token(&self, user_id: &str, role: Role) -> String {
        issue_token(TEST_SECRET, user_id, Some(role), 3600)
    }
}

/// Issue an HS256 token against the given secret.
///
/// `exp_offset_secs` may be negative to produce an already-expired token.
pub fn issue_token(
    secret: &str,
    user_id: &str,
    role: Option<Role>,
    exp_offset_secs: i64,
) -> String {
    let claims = TokenClaims {
        user_id: user_id.to_string(),
        user_type: role,
        exp: (chrono::Utc::now().timestamp() + exp_offset_secs).max(0) as u64,
    };
    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap_or_default()
}

/// A registered bus connection standing in for a WebSocket client.
pub struct TestConnection {
    pub conn_id: String,
    rx: mpsc::Receiver<String>,
}

impl TestConnection {
    /// Next pending chat-channel event, if any.
    pub fn next_event(&mut self) -> Option<ServerEvent> {
        self.rx
            .try_recv()
            .ok()
            .and_then(|frame| serde_json::from_str(&frame).ok())
    }

    /// Next pending room-channel event, if any.
    pub fn next_room_event(&mut self) -> Option<RoomServerEvent> {
        self.rx
            .try_recv()
            .ok()
            .and_then(|frame| serde_json::from_str(&frame).ok())
    }

    /// Discard everything currently queued.
    pub fn drain(&mut self) {
        while self.rx.try_recv().is_ok() {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn harness_builds_full_stack() {
        let harness = TestHarness::builder().build().await.unwrap();
        let conversation = harness
            .seed_conversation("job-1", "c1", "w1")
            .await
            .unwrap();
        assert_eq!(conversation.job_id, "job-1");
        assert_eq!(harness.bus.connection_count(), 0);
    }

    #[tokio::test]
    async fn issued_tokens_verify() {
        let harness = TestHarness::builder().build().await.unwrap();
        let token = harness.issue_token("u1", Role::Client);
        let identity = harness.auth.verify_token(&token, "u1").unwrap();
        assert_eq!(identity.role, Role::Client);
    }

    #[tokio::test]
    async fn connections_receive_personal_frames() {
        let harness = TestHarness::builder().build().await.unwrap();
        let mut conn = harness.connect("conn-1", "u1");
        harness.bus.send_to_user("u1", r#"{"type":"error","message":"x"}"#);
        assert!(matches!(
            conn.next_event(),
            Some(ServerEvent::Error { .. })
        ));
    }
}
