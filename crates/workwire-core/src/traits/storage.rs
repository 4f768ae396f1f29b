// SPDX-FileCopyrightText: 2026 Workwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for the durable conversation/message store.

use async_trait::async_trait;

use crate::error::WireError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ChatMessage, Conversation};

/// Adapter for the durable side of the messaging service.
///
/// Call sessions and signaling rooms are deliberately absent here: they are
/// process-lifetime state owned by their registries and never persisted.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Initializes the storage backend (migrations, connection).
    async fn initialize(&self) -> Result<(), WireError>;

    /// Closes the storage backend, flushing pending writes.
    async fn close(&self) -> Result<(), WireError>;

    /// Inserts a new conversation row.
    async fn create_conversation(&self, conversation: &Conversation) -> Result<(), WireError>;

    /// Fetches a conversation by id.
    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, WireError>;

    /// Fetches the conversation for an exact (job, client, worker) triple.
    async fn find_conversation(
        &self,
        job_id: &str,
        client_id: &str,
        worker_id: &str,
    ) -> Result<Option<Conversation>, WireError>;

    /// All conversations in which the user participates, most recently
    /// updated first.
    async fn list_conversations_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<Conversation>, WireError>;

    /// Appends a message and applies the conversation-side mutations
    /// (receiver's unread counter increment, last-message pointer) as one
    /// atomic unit. No reader may observe the message without the counter
    /// update or vice versa.
    async fn append_message(&self, message: &ChatMessage) -> Result<(), WireError>;

    /// Messages of a conversation, oldest first, ties broken by insertion
    /// order.
    async fn get_messages(&self, conversation_id: &str) -> Result<Vec<ChatMessage>, WireError>;

    /// Marks every unread message addressed to `reader_id` in the
    /// conversation as read and resets the reader's unread counter to zero,
    /// atomically. Idempotent. Returns the number of messages flipped.
    async fn mark_messages_read(
        &self,
        conversation_id: &str,
        reader_id: &str,
    ) -> Result<usize, WireError>;
}
