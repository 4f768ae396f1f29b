// SPDX-FileCopyrightText: 2026 Workwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation messaging service.
//!
//! Owns conversation and message records: open-or-reuse, send with unread
//! accounting, fetch with the implicit read-receipt side effect, and
//! explicit mark-as-read. Both transports (REST handlers and the push
//! channel) call this one service; neither holds its own copy of truth.
//!
//! Concurrency: every mutating operation on a conversation takes that
//! conversation's async mutex for the span of the storage transaction and
//! the event fan-out. Sends to one conversation are therefore strictly
//! ordered -- a reader can never observe a read receipt before the message
//! that triggered it -- while sends to different conversations proceed
//! fully in parallel.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, info};

use workwire_bus::Broadcaster;
use workwire_core::events::ServerEvent;
use workwire_core::types::{ChatMessage, Conversation, Identity, MessageKind, Role};
use workwire_core::{StorageAdapter, WireError};

/// Result of an open-or-reuse, so transports can answer 201 vs 200.
#[derive(Debug, Clone)]
pub enum Opened {
    Created(Conversation),
    Existing(Conversation),
}

impl Opened {
    pub fn conversation(&self) -> &Conversation {
        match self {
            Opened::Created(c) | Opened::Existing(c) => c,
        }
    }

    pub fn into_conversation(self) -> Conversation {
        match self {
            Opened::Created(c) | Opened::Existing(c) => c,
        }
    }
}

/// The conversation messaging service.
pub struct ChatService {
    storage: Arc<dyn StorageAdapter>,
    bus: Arc<Broadcaster>,
    /// Per-conversation write locks. Entries accumulate per conversation
    /// touched over the process lifetime; each is a few words.
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl ChatService {
    pub fn new(storage: Arc<dyn StorageAdapter>, bus: Arc<Broadcaster>) -> Self {
        Self {
            storage,
            bus,
            locks: DashMap::new(),
        }
    }

    fn lock_for(&self, conversation_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(conversation_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Fetch a conversation and require the caller to be a participant.
    /// Returns the conversation and the caller's role in it.
    async fn member_conversation(
        &self,
        conversation_id: &str,
        caller: &Identity,
    ) -> Result<(Conversation, Role), WireError> {
        let conversation = self
            .storage
            .get_conversation(conversation_id)
            .await?
            .ok_or_else(|| WireError::conversation_not_found(conversation_id))?;
        let role = conversation.role_of(&caller.user_id).ok_or_else(|| {
            WireError::AccessDenied("not a participant of this conversation".to_string())
        })?;
        Ok((conversation, role))
    }

    /// Open the conversation for an exact (job, client, worker) triple,
    /// reusing the existing one if present.
    ///
    /// A client may only open conversations naming themself as the job's
    /// client side; a worker only as the worker side; the two sides must
    /// differ.
    pub async fn open_conversation(
        &self,
        caller: &Identity,
        job_id: &str,
        client_id: &str,
        worker_id: &str,
    ) -> Result<Opened, WireError> {
        if job_id.is_empty() || client_id.is_empty() || worker_id.is_empty() {
            return Err(WireError::Validation(
                "jobId, clientId and workerId are required".to_string(),
            ));
        }
        if client_id == worker_id {
            return Err(WireError::AccessDenied(
                "you cannot message yourself".to_string(),
            ));
        }
        match caller.role {
            Role::Client if caller.user_id != client_id => {
                return Err(WireError::AccessDenied(
                    "you don't own this job".to_string(),
                ));
            }
            Role::Worker if caller.user_id != worker_id => {
                return Err(WireError::AccessDenied(
                    "not a participant of this conversation".to_string(),
                ));
            }
            _ => {}
        }

        if let Some(existing) = self
            .storage
            .find_conversation(job_id, client_id, worker_id)
            .await?
        {
            return Ok(Opened::Existing(existing));
        }

        let now = chrono::Utc::now().to_rfc3339();
        let conversation = Conversation {
            id: uuid::Uuid::new_v4().to_string(),
            job_id: job_id.to_string(),
            client_id: client_id.to_string(),
            worker_id: worker_id.to_string(),
            last_message_id: None,
            unread_client: 0,
            unread_worker: 0,
            created_at: now.clone(),
            updated_at: now,
        };

        match self.storage.create_conversation(&conversation).await {
            Ok(()) => {
                info!(
                    conversation_id = %conversation.id,
                    job_id,
                    "conversation created"
                );
                Ok(Opened::Created(conversation))
            }
            // Lost a race on the unique (job, client, worker) index:
            // converge on the winner's row.
            Err(create_err) => match self
                .storage
                .find_conversation(job_id, client_id, worker_id)
                .await?
            {
                Some(existing) => Ok(Opened::Existing(existing)),
                None => Err(create_err),
            },
        }
    }

    /// Append a message; the receiver is the other participant.
    ///
    /// The message insert and the receiver's unread-counter increment commit
    /// as one storage transaction, then `new_message` fans out to the
    /// conversation channel and `message_notification` to the receiver's
    /// personal channel -- all under the conversation lock.
    pub async fn send_message(
        &self,
        caller: &Identity,
        conversation_id: &str,
        content: &str,
        kind: MessageKind,
    ) -> Result<ChatMessage, WireError> {
        if content.is_empty() {
            return Err(WireError::Validation("content is required".to_string()));
        }

        let lock = self.lock_for(conversation_id);
        let _guard = lock.lock().await;

        let (conversation, sender_role) =
            self.member_conversation(conversation_id, caller).await?;
        let (receiver_id, receiver_role) = match sender_role {
            Role::Client => (conversation.worker_id.clone(), Role::Worker),
            Role::Worker => (conversation.client_id.clone(), Role::Client),
        };

        let message = ChatMessage {
            id: uuid::Uuid::new_v4().to_string(),
            conversation_id: conversation.id.clone(),
            job_id: conversation.job_id.clone(),
            sender_id: caller.user_id.clone(),
            sender_role,
            receiver_id: receiver_id.clone(),
            receiver_role,
            content: content.to_string(),
            kind,
            is_read: false,
            created_at: chrono::Utc::now().to_rfc3339(),
        };

        self.storage.append_message(&message).await?;

        debug!(
            conversation_id = %conversation.id,
            message_id = %message.id,
            "message appended"
        );

        self.bus.send_to_channel(
            &conversation.id,
            &ServerEvent::NewMessage {
                conversation_id: conversation.id.clone(),
                message: message.clone(),
            }
            .to_frame(),
        );
        self.bus.send_to_user(
            &receiver_id,
            &ServerEvent::MessageNotification {
                conversation_id: conversation.id.clone(),
                message: message.clone(),
                sender: caller.user_id.clone(),
            }
            .to_frame(),
        );

        Ok(message)
    }

    /// Ordered messages of the conversation, oldest first.
    ///
    /// Side effect: everything addressed to the caller is marked read, the
    /// caller's unread counter resets, and the other participant receives a
    /// `messages_read` receipt. The returned snapshot shows read flags as
    /// they were when fetched.
    pub async fn fetch_messages(
        &self,
        caller: &Identity,
        conversation_id: &str,
    ) -> Result<Vec<ChatMessage>, WireError> {
        let lock = self.lock_for(conversation_id);
        let _guard = lock.lock().await;

        let (conversation, _) = self.member_conversation(conversation_id, caller).await?;
        let messages = self.storage.get_messages(&conversation.id).await?;

        let flipped = self
            .storage
            .mark_messages_read(&conversation.id, &caller.user_id)
            .await?;
        if flipped > 0 {
            self.emit_read_receipt(&conversation, caller);
        }

        Ok(messages)
    }

    /// Explicit read receipt: reset only the caller's own unread counter
    /// and notify the other participant. Idempotent.
    pub async fn mark_read(
        &self,
        caller: &Identity,
        conversation_id: &str,
    ) -> Result<(), WireError> {
        let lock = self.lock_for(conversation_id);
        let _guard = lock.lock().await;

        let (conversation, _) = self.member_conversation(conversation_id, caller).await?;
        self.storage
            .mark_messages_read(&conversation.id, &caller.user_id)
            .await?;
        self.emit_read_receipt(&conversation, caller);
        Ok(())
    }

    /// Require the caller to be a participant before a channel join.
    ///
    /// The push transport calls this when a connection asks to join a
    /// conversation channel, so a connection can never listen in on a
    /// conversation it does not belong to.
    pub async fn authorize_member(
        &self,
        caller: &Identity,
        conversation_id: &str,
    ) -> Result<(), WireError> {
        self.member_conversation(conversation_id, caller).await?;
        Ok(())
    }

    /// All conversations the caller participates in, most recently updated
    /// first.
    pub async fn list_conversations(
        &self,
        caller: &Identity,
    ) -> Result<Vec<Conversation>, WireError> {
        self.storage
            .list_conversations_for_user(&caller.user_id)
            .await
    }

    fn emit_read_receipt(&self, conversation: &Conversation, reader: &Identity) {
        let Some((counterpart_id, _)) = conversation.counterpart_of(&reader.user_id) else {
            return;
        };
        self.bus.send_to_user(
            counterpart_id,
            &ServerEvent::MessagesRead {
                conversation_id: conversation.id.clone(),
                user_id: reader.user_id.clone(),
            }
            .to_frame(),
        );
    }
}
