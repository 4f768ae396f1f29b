// SPDX-FileCopyrightText: 2026 Workwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message operations.
//!
//! `append_message` and `mark_messages_read` each run inside a single SQL
//! transaction on the writer thread: the message row and the conversation's
//! unread counter/last-message pointer change together or not at all.

use rusqlite::{Row, params};
use workwire_core::WireError;
use workwire_core::types::{ChatMessage, Role};

use crate::database::Database;
use crate::queries::{parse_kind, parse_role};

const MESSAGE_COLUMNS: &str = "id, conversation_id, job_id, sender_id, sender_role,
     receiver_id, receiver_role, content, kind, is_read, created_at";

fn row_to_message(row: &Row<'_>) -> rusqlite::Result<ChatMessage> {
    Ok(ChatMessage {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        job_id: row.get(2)?,
        sender_id: row.get(3)?,
        sender_role: parse_role(4, row.get(4)?)?,
        receiver_id: row.get(5)?,
        receiver_role: parse_role(6, row.get(6)?)?,
        content: row.get(7)?,
        kind: parse_kind(8, row.get(8)?)?,
        is_read: row.get(9)?,
        created_at: row.get(10)?,
    })
}

/// Append a message and mutate its conversation in one transaction:
/// insert the row, bump the receiver's unread counter, move the
/// last-message pointer, touch `updated_at`.
pub async fn append_message(db: &Database, message: &ChatMessage) -> Result<(), WireError> {
    let msg = message.clone();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO messages (id, conversation_id, job_id, sender_id, sender_role,
                     receiver_id, receiver_role, content, kind, is_read, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    msg.id,
                    msg.conversation_id,
                    msg.job_id,
                    msg.sender_id,
                    msg.sender_role.to_string(),
                    msg.receiver_id,
                    msg.receiver_role.to_string(),
                    msg.content,
                    msg.kind.to_string(),
                    msg.is_read,
                    msg.created_at,
                ],
            )?;
            let counter_sql = match msg.receiver_role {
                Role::Client => {
                    "UPDATE conversations
                     SET unread_client = unread_client + 1, last_message_id = ?1, updated_at = ?2
                     WHERE id = ?3"
                }
                Role::Worker => {
                    "UPDATE conversations
                     SET unread_worker = unread_worker + 1, last_message_id = ?1, updated_at = ?2
                     WHERE id = ?3"
                }
            };
            tx.execute(
                counter_sql,
                params![msg.id, msg.created_at, msg.conversation_id],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Messages of a conversation, oldest first. Ties on `created_at` are
/// broken by insertion order (rowid).
pub async fn get_messages(
    db: &Database,
    conversation_id: &str,
) -> Result<Vec<ChatMessage>, WireError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages
                 WHERE conversation_id = ?1
                 ORDER BY created_at ASC, rowid ASC"
            ))?;
            let rows = stmt.query_map(params![conversation_id], row_to_message)?;
            let mut messages = Vec::new();
            for row in rows {
                messages.push(row?);
            }
            Ok(messages)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Mark every unread message addressed to `reader_id` as read and reset the
/// reader's unread counter, in one transaction. Idempotent: already-read
/// messages are untouched and a second call flips zero rows.
///
/// Returns the number of messages flipped.
pub async fn mark_messages_read(
    db: &Database,
    conversation_id: &str,
    reader_id: &str,
) -> Result<usize, WireError> {
    let conversation_id = conversation_id.to_string();
    let reader_id = reader_id.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let flipped = tx.execute(
                "UPDATE messages SET is_read = 1
                 WHERE conversation_id = ?1 AND receiver_id = ?2 AND is_read = 0",
                params![conversation_id, reader_id],
            )?;
            tx.execute(
                "UPDATE conversations
                 SET unread_client = CASE WHEN client_id = ?2 THEN 0 ELSE unread_client END,
                     unread_worker = CASE WHEN worker_id = ?2 THEN 0 ELSE unread_worker END
                 WHERE id = ?1",
                params![conversation_id, reader_id],
            )?;
            tx.commit()?;
            Ok(flipped)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::conversations::{create_conversation, get_conversation};
    use tempfile::tempdir;
    use workwire_core::types::{Conversation, MessageKind};

    async fn setup_db_with_conversation() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();

        let conversation = Conversation {
            id: "conv-1".to_string(),
            job_id: "job-1".to_string(),
            client_id: "c1".to_string(),
            worker_id: "w1".to_string(),
            last_message_id: None,
            unread_client: 0,
            unread_worker: 0,
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
            updated_at: "2026-01-01T00:00:00.000Z".to_string(),
        };
        create_conversation(&db, &conversation).await.unwrap();
        (db, dir)
    }

    fn client_to_worker(id: &str, content: &str, timestamp: &str) -> ChatMessage {
        ChatMessage {
            id: id.to_string(),
            conversation_id: "conv-1".to_string(),
            job_id: "job-1".to_string(),
            sender_id: "c1".to_string(),
            sender_role: Role::Client,
            receiver_id: "w1".to_string(),
            receiver_role: Role::Worker,
            content: content.to_string(),
            kind: MessageKind::Text,
            is_read: false,
            created_at: timestamp.to_string(),
        }
    }

    #[tokio::test]
    async fn append_updates_counter_and_pointer_together() {
        let (db, _dir) = setup_db_with_conversation().await;

        let msg = client_to_worker("m1", "Hi", "2026-01-01T00:00:01.000Z");
        append_message(&db, &msg).await.unwrap();

        let conversation = get_conversation(&db, "conv-1").await.unwrap().unwrap();
        assert_eq!(conversation.unread_worker, 1);
        assert_eq!(conversation.unread_client, 0);
        assert_eq!(conversation.last_message_id.as_deref(), Some("m1"));
        assert_eq!(conversation.updated_at, "2026-01-01T00:00:01.000Z");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn get_messages_in_creation_order_with_rowid_tiebreak() {
        let (db, _dir) = setup_db_with_conversation().await;

        // m2 and m3 share a timestamp; insertion order must win.
        append_message(&db, &client_to_worker("m1", "a", "2026-01-01T00:00:01.000Z"))
            .await
            .unwrap();
        append_message(&db, &client_to_worker("m2", "b", "2026-01-01T00:00:02.000Z"))
            .await
            .unwrap();
        append_message(&db, &client_to_worker("m3", "c", "2026-01-01T00:00:02.000Z"))
            .await
            .unwrap();

        let messages = get_messages(&db, "conv-1").await.unwrap();
        let ids: Vec<&str> = messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["m1", "m2", "m3"]);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn mark_read_flips_only_reader_messages_and_is_idempotent() {
        let (db, _dir) = setup_db_with_conversation().await;

        append_message(&db, &client_to_worker("m1", "a", "2026-01-01T00:00:01.000Z"))
            .await
            .unwrap();
        append_message(&db, &client_to_worker("m2", "b", "2026-01-01T00:00:02.000Z"))
            .await
            .unwrap();

        let flipped = mark_messages_read(&db, "conv-1", "w1").await.unwrap();
        assert_eq!(flipped, 2);

        let conversation = get_conversation(&db, "conv-1").await.unwrap().unwrap();
        assert_eq!(conversation.unread_worker, 0);

        let messages = get_messages(&db, "conv-1").await.unwrap();
        assert!(messages.iter().all(|m| m.is_read));

        // Second call touches nothing.
        let flipped = mark_messages_read(&db, "conv-1", "w1").await.unwrap();
        assert_eq!(flipped, 0);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn mark_read_by_sender_does_not_reset_counterpart_counter() {
        let (db, _dir) = setup_db_with_conversation().await;

        append_message(&db, &client_to_worker("m1", "a", "2026-01-01T00:00:01.000Z"))
            .await
            .unwrap();

        // c1 sent the message; marking as read for c1 flips nothing and
        // leaves w1's counter alone.
        let flipped = mark_messages_read(&db, "conv-1", "c1").await.unwrap();
        assert_eq!(flipped, 0);

        let conversation = get_conversation(&db, "conv-1").await.unwrap().unwrap();
        assert_eq!(conversation.unread_worker, 1);
        assert_eq!(conversation.unread_client, 0);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn append_to_missing_conversation_fails() {
        let (db, _dir) = setup_db_with_conversation().await;
        let mut msg = client_to_worker("m1", "a", "2026-01-01T00:00:01.000Z");
        msg.conversation_id = "no-such".to_string();
        assert!(append_message(&db, &msg).await.is_err());
        db.close().await.unwrap();
    }
}
