// SPDX-FileCopyrightText: 2026 Workwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Call session registry.
//!
//! In-memory store mapping a conversation id to at most one live call
//! session. State machine per conversation: absent -> ringing -> connected
//! -> absent; ended sessions are removed, never retained. Nothing here is
//! persisted -- the registry is rebuilt from a clean slate on restart.
//!
//! Both transports (REST handlers and the push channel) call this one
//! service. Advisory events (`call_incoming`, `call_accepted`,
//! `call_ended`) are emitted strictly after the registry write commits, so
//! a notification can never announce a session the registry does not hold.
//!
//! A `ringing` session has no timeout: it persists until explicitly joined
//! or ended.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::{debug, info};

use workwire_bus::Broadcaster;
use workwire_core::events::ServerEvent;
use workwire_core::types::{CallSession, CallStatus, CallType, Identity};
use workwire_core::{StorageAdapter, WireError};

/// Result of a create, so transports can answer 201 vs 200.
#[derive(Debug, Clone)]
pub enum CreateOutcome {
    New(CallSession),
    Existing(CallSession),
}

impl CreateOutcome {
    pub fn session(&self) -> &CallSession {
        match self {
            CreateOutcome::New(s) | CreateOutcome::Existing(s) => s,
        }
    }
}

/// The call session service: registry plus membership checks and advisory
/// notifications.
pub struct CallService {
    /// conversation id -> live session. The entry API gives per-key
    /// atomicity: concurrent creates converge on whichever session the
    /// winning request inserted.
    calls: DashMap<String, CallSession>,
    storage: Arc<dyn StorageAdapter>,
    bus: Arc<Broadcaster>,
}

impl CallService {
    pub fn new(storage: Arc<dyn StorageAdapter>, bus: Arc<Broadcaster>) -> Self {
        Self {
            calls: DashMap::new(),
            storage,
            bus,
        }
    }

    /// Create the call for a conversation, or return the live one as-is.
    ///
    /// Idempotent by design: a retried create, or the callee racing the
    /// caller with their own create, yields the existing session rather
    /// than an error. On a fresh session, `call_incoming` is pushed to the
    /// other participant's personal channel and the conversation channel
    /// after the registry write.
    pub async fn create(
        &self,
        caller: &Identity,
        conversation_id: &str,
        call_type: CallType,
    ) -> Result<CreateOutcome, WireError> {
        let conversation = self
            .storage
            .get_conversation(conversation_id)
            .await?
            .ok_or_else(|| WireError::conversation_not_found(conversation_id))?;
        let Some((callee_id, _)) = conversation.counterpart_of(&caller.user_id) else {
            return Err(WireError::AccessDenied(
                "not a participant of this conversation".to_string(),
            ));
        };
        let callee_id = callee_id.to_string();

        let outcome = match self.calls.entry(conversation_id.to_string()) {
            Entry::Occupied(existing) => CreateOutcome::Existing(existing.get().clone()),
            Entry::Vacant(vacant) => {
                let session = CallSession {
                    id: format!("call_{}", uuid::Uuid::new_v4()),
                    conversation_id: conversation_id.to_string(),
                    call_type,
                    initiator_id: caller.user_id.clone(),
                    initiator_role: caller.role,
                    participants: vec![caller.user_id.clone()],
                    status: CallStatus::Ringing,
                    started_at: chrono::Utc::now().to_rfc3339(),
                    ended_at: None,
                };
                vacant.insert(session.clone());
                CreateOutcome::New(session)
            }
        };

        if let CreateOutcome::New(session) = &outcome {
            info!(
                conversation_id,
                call_id = %session.id,
                call_type = %call_type,
                "call created"
            );
            let frame = ServerEvent::CallIncoming {
                conversation_id: conversation_id.to_string(),
                call_id: session.id.clone(),
                call_type,
                caller_id: caller.user_id.clone(),
            }
            .to_frame();
            self.bus.send_to_user(&callee_id, &frame);
            self.bus.send_to_channel(conversation_id, &frame);
        }

        Ok(outcome)
    }

    /// Join the live call: add the caller to the participant set if absent
    /// (idempotent) and transition to `connected` unconditionally.
    pub async fn join(
        &self,
        caller: &Identity,
        conversation_id: &str,
    ) -> Result<CallSession, WireError> {
        if !self.calls.contains_key(conversation_id) {
            return Err(WireError::call_not_found(conversation_id));
        }

        let conversation = self
            .storage
            .get_conversation(conversation_id)
            .await?
            .ok_or_else(|| WireError::conversation_not_found(conversation_id))?;
        if !conversation.is_participant(&caller.user_id) {
            return Err(WireError::AccessDenied(
                "not a participant of this conversation".to_string(),
            ));
        }

        let session = {
            let mut entry = self
                .calls
                .get_mut(conversation_id)
                .ok_or_else(|| WireError::call_not_found(conversation_id))?;
            if !entry.has_participant(&caller.user_id) {
                entry.participants.push(caller.user_id.clone());
            }
            entry.status = CallStatus::Connected;
            entry.clone()
        };

        debug!(conversation_id, call_id = %session.id, "call joined");

        self.bus.send_to_channel(
            conversation_id,
            &ServerEvent::CallAccepted {
                conversation_id: conversation_id.to_string(),
                call_id: session.id.clone(),
            }
            .to_frame(),
        );

        Ok(session)
    }

    /// End the live call: mark it ended, stamp the end time, and remove it
    /// so a subsequent create starts fresh. The caller must be in the
    /// call's participant set.
    pub async fn end(
        &self,
        caller: &Identity,
        conversation_id: &str,
    ) -> Result<CallSession, WireError> {
        {
            let entry = self
                .calls
                .get(conversation_id)
                .ok_or_else(|| WireError::call_not_found(conversation_id))?;
            if !entry.has_participant(&caller.user_id) {
                return Err(WireError::AccessDenied(
                    "not a participant of this call".to_string(),
                ));
            }
        }

        // Re-check under removal in case another end raced us.
        let user_id = caller.user_id.clone();
        let Some((_, mut session)) = self
            .calls
            .remove_if(conversation_id, |_, call| call.has_participant(&user_id))
        else {
            return Err(WireError::call_not_found(conversation_id));
        };

        session.status = CallStatus::Ended;
        session.ended_at = Some(chrono::Utc::now().to_rfc3339());

        info!(conversation_id, call_id = %session.id, "call ended");

        self.bus.send_to_channel(
            conversation_id,
            &ServerEvent::CallEnded {
                conversation_id: conversation_id.to_string(),
                call_id: session.id.clone(),
            }
            .to_frame(),
        );

        Ok(session)
    }

    /// The live session for a conversation, if any. Absence is a normal
    /// state, not an error; the caller must be a conversation participant.
    pub async fn status(
        &self,
        caller: &Identity,
        conversation_id: &str,
    ) -> Result<Option<CallSession>, WireError> {
        let conversation = self
            .storage
            .get_conversation(conversation_id)
            .await?
            .ok_or_else(|| WireError::conversation_not_found(conversation_id))?;
        if !conversation.is_participant(&caller.user_id) {
            return Err(WireError::AccessDenied(
                "not a participant of this conversation".to_string(),
            ));
        }
        Ok(self.calls.get(conversation_id).map(|call| call.clone()))
    }

    /// Every live session whose participant set contains the user.
    pub fn active_for_user(&self, user_id: &str) -> Vec<CallSession> {
        self.calls
            .iter()
            .filter(|entry| entry.has_participant(user_id))
            .map(|entry| entry.clone())
            .collect()
    }

    /// Number of live sessions, across all conversations.
    pub fn live_count(&self) -> usize {
        self.calls.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use workwire_config::model::StorageConfig;
    use workwire_core::types::{Conversation, Role};
    use workwire_storage::SqliteStore;

    async fn service() -> (Arc<CallService>, Arc<Broadcaster>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("calls.db");
        let store = SqliteStore::new(StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            wal_mode: true,
        });
        store.initialize().await.unwrap();

        let now = "2026-01-01T00:00:00.000Z".to_string();
        store
            .create_conversation(&Conversation {
                id: "conv-1".to_string(),
                job_id: "job-1".to_string(),
                client_id: "c1".to_string(),
                worker_id: "w1".to_string(),
                last_message_id: None,
                unread_client: 0,
                unread_worker: 0,
                created_at: now.clone(),
                updated_at: now,
            })
            .await
            .unwrap();

        let storage: Arc<dyn StorageAdapter> = Arc::new(store);
        let bus = Arc::new(Broadcaster::new());
        (
            Arc::new(CallService::new(storage, Arc::clone(&bus))),
            bus,
            dir,
        )
    }

    fn client() -> Identity {
        Identity::new("c1", Role::Client)
    }

    fn worker() -> Identity {
        Identity::new("w1", Role::Worker)
    }

    #[tokio::test]
    async fn create_starts_ringing_with_initiator_only() {
        let (calls, _bus, _dir) = service().await;
        let outcome = calls
            .create(&client(), "conv-1", CallType::Video)
            .await
            .unwrap();
        let session = outcome.session();
        assert_eq!(session.status, CallStatus::Ringing);
        assert_eq!(session.participants, vec!["c1".to_string()]);
        assert_eq!(session.initiator_id, "c1");
        assert!(session.ended_at.is_none());
        assert_eq!(calls.live_count(), 1);
    }

    #[tokio::test]
    async fn create_twice_returns_same_session() {
        let (calls, _bus, _dir) = service().await;
        let first = calls
            .create(&client(), "conv-1", CallType::Video)
            .await
            .unwrap();
        let second = calls
            .create(&client(), "conv-1", CallType::Video)
            .await
            .unwrap();

        assert!(matches!(first, CreateOutcome::New(_)));
        assert!(matches!(second, CreateOutcome::Existing(_)));
        assert_eq!(first.session().id, second.session().id);
        assert_eq!(calls.live_count(), 1);
    }

    #[tokio::test]
    async fn concurrent_creates_converge_on_one_session() {
        let (calls, _bus, _dir) = service().await;

        let mut handles = Vec::new();
        for i in 0..8 {
            let calls = Arc::clone(&calls);
            let caller = if i % 2 == 0 { client() } else { worker() };
            handles.push(tokio::spawn(async move {
                calls
                    .create(&caller, "conv-1", CallType::Audio)
                    .await
                    .unwrap()
                    .session()
                    .id
                    .clone()
            }));
        }

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap());
        }
        ids.dedup();
        assert_eq!(ids.len(), 1, "all creates must see the same session");
        assert_eq!(calls.live_count(), 1);
    }

    #[tokio::test]
    async fn create_for_unknown_conversation_is_not_found() {
        let (calls, _bus, _dir) = service().await;
        let err = calls
            .create(&client(), "no-such", CallType::Video)
            .await
            .unwrap_err();
        assert!(matches!(err, WireError::NotFound { .. }));
    }

    #[tokio::test]
    async fn create_by_stranger_is_denied() {
        let (calls, _bus, _dir) = service().await;
        let stranger = Identity::new("x1", Role::Client);
        let err = calls
            .create(&stranger, "conv-1", CallType::Video)
            .await
            .unwrap_err();
        assert!(matches!(err, WireError::AccessDenied(_)));
        assert_eq!(calls.live_count(), 0);
    }

    #[tokio::test]
    async fn create_notifies_callee_after_registry_write() {
        let (calls, bus, _dir) = service().await;
        let mut worker_rx = bus.register("conn-w", "w1");

        calls
            .create(&client(), "conv-1", CallType::Video)
            .await
            .unwrap();

        let frame = worker_rx.try_recv().unwrap();
        let event: ServerEvent = serde_json::from_str(&frame).unwrap();
        match event {
            ServerEvent::CallIncoming {
                caller_id,
                call_type,
                call_id,
                ..
            } => {
                assert_eq!(caller_id, "c1");
                assert_eq!(call_type, CallType::Video);
                // The announced session is the one the registry holds.
                let status = calls.status(&worker(), "conv-1").await.unwrap().unwrap();
                assert_eq!(status.id, call_id);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn existing_call_does_not_renotify() {
        let (calls, bus, _dir) = service().await;
        calls
            .create(&client(), "conv-1", CallType::Video)
            .await
            .unwrap();

        let mut worker_rx = bus.register("conn-w", "w1");
        calls
            .create(&client(), "conv-1", CallType::Video)
            .await
            .unwrap();
        assert!(worker_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn join_connects_and_adds_participant_idempotently() {
        let (calls, _bus, _dir) = service().await;
        calls
            .create(&client(), "conv-1", CallType::Video)
            .await
            .unwrap();

        let session = calls.join(&worker(), "conv-1").await.unwrap();
        assert_eq!(session.status, CallStatus::Connected);
        assert_eq!(session.participants, vec!["c1".to_string(), "w1".to_string()]);

        // Joining again changes nothing.
        let session = calls.join(&worker(), "conv-1").await.unwrap();
        assert_eq!(session.participants.len(), 2);
    }

    #[tokio::test]
    async fn join_without_call_is_not_found() {
        let (calls, _bus, _dir) = service().await;
        let err = calls.join(&worker(), "conv-1").await.unwrap_err();
        assert!(matches!(err, WireError::NotFound { .. }));
    }

    #[tokio::test]
    async fn end_removes_session_and_fresh_create_gets_new_id() {
        let (calls, _bus, _dir) = service().await;
        let first_id = calls
            .create(&client(), "conv-1", CallType::Video)
            .await
            .unwrap()
            .session()
            .id
            .clone();
        calls.join(&worker(), "conv-1").await.unwrap();

        let ended = calls.end(&client(), "conv-1").await.unwrap();
        assert_eq!(ended.status, CallStatus::Ended);
        assert!(ended.ended_at.is_some());

        // Status is empty, not an error.
        let status = calls.status(&client(), "conv-1").await.unwrap();
        assert!(status.is_none());

        // A new create allocates a fresh identity.
        let second_id = calls
            .create(&worker(), "conv-1", CallType::Audio)
            .await
            .unwrap()
            .session()
            .id
            .clone();
        assert_ne!(first_id, second_id);
    }

    #[tokio::test]
    async fn end_requires_call_participation() {
        let (calls, _bus, _dir) = service().await;
        calls
            .create(&client(), "conv-1", CallType::Video)
            .await
            .unwrap();

        // The worker never joined: conversation member, but not a call
        // participant.
        let err = calls.end(&worker(), "conv-1").await.unwrap_err();
        assert!(matches!(err, WireError::AccessDenied(_)));
        assert_eq!(calls.live_count(), 1);
    }

    #[tokio::test]
    async fn status_requires_conversation_membership_only() {
        let (calls, _bus, _dir) = service().await;
        calls
            .create(&client(), "conv-1", CallType::Video)
            .await
            .unwrap();

        // Worker has not joined the call but may query it.
        let status = calls.status(&worker(), "conv-1").await.unwrap();
        assert!(status.is_some());

        let stranger = Identity::new("x1", Role::Worker);
        let err = calls.status(&stranger, "conv-1").await.unwrap_err();
        assert!(matches!(err, WireError::AccessDenied(_)));
    }

    #[tokio::test]
    async fn active_for_user_scans_participant_sets() {
        let (calls, _bus, _dir) = service().await;
        calls
            .create(&client(), "conv-1", CallType::Video)
            .await
            .unwrap();

        assert_eq!(calls.active_for_user("c1").len(), 1);
        assert!(calls.active_for_user("w1").is_empty());

        calls.join(&worker(), "conv-1").await.unwrap();
        assert_eq!(calls.active_for_user("w1").len(), 1);
    }
}
