// SPDX-FileCopyrightText: 2026 Workwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation CRUD operations.

use rusqlite::{Row, params};
use workwire_core::WireError;
use workwire_core::types::Conversation;

use crate::database::Database;

const CONVERSATION_COLUMNS: &str = "id, job_id, client_id, worker_id, last_message_id,
     unread_client, unread_worker, created_at, updated_at";

fn row_to_conversation(row: &Row<'_>) -> rusqlite::Result<Conversation> {
    Ok(Conversation {
        id: row.get(0)?,
        job_id: row.get(1)?,
        client_id: row.get(2)?,
        worker_id: row.get(3)?,
        last_message_id: row.get(4)?,
        unread_client: row.get(5)?,
        unread_worker: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

/// Insert a new conversation row.
pub async fn create_conversation(
    db: &Database,
    conversation: &Conversation,
) -> Result<(), WireError> {
    let conversation = conversation.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO conversations (id, job_id, client_id, worker_id, last_message_id,
                     unread_client, unread_worker, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    conversation.id,
                    conversation.job_id,
                    conversation.client_id,
                    conversation.worker_id,
                    conversation.last_message_id,
                    conversation.unread_client,
                    conversation.unread_worker,
                    conversation.created_at,
                    conversation.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a conversation by id.
pub async fn get_conversation(db: &Database, id: &str) -> Result<Option<Conversation>, WireError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = ?1"
            ))?;
            let result = stmt.query_row(params![id], row_to_conversation);
            match result {
                Ok(conversation) => Ok(Some(conversation)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get the conversation for an exact (job, client, worker) triple.
pub async fn find_conversation(
    db: &Database,
    job_id: &str,
    client_id: &str,
    worker_id: &str,
) -> Result<Option<Conversation>, WireError> {
    let job_id = job_id.to_string();
    let client_id = client_id.to_string();
    let worker_id = worker_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CONVERSATION_COLUMNS} FROM conversations
                 WHERE job_id = ?1 AND client_id = ?2 AND worker_id = ?3"
            ))?;
            let result = stmt.query_row(params![job_id, client_id, worker_id], row_to_conversation);
            match result {
                Ok(conversation) => Ok(Some(conversation)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// All conversations the user participates in, most recently updated first.
pub async fn list_conversations_for_user(
    db: &Database,
    user_id: &str,
) -> Result<Vec<Conversation>, WireError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CONVERSATION_COLUMNS} FROM conversations
                 WHERE client_id = ?1 OR worker_id = ?1
                 ORDER BY updated_at DESC"
            ))?;
            let rows = stmt.query_map(params![user_id], row_to_conversation)?;
            let mut conversations = Vec::new();
            for row in rows {
                conversations.push(row?);
            }
            Ok(conversations)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
