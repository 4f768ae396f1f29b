// SPDX-FileCopyrightText: 2026 Workwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread. Do NOT create additional Connection instances for writes; the
//! per-conversation atomicity of the messaging service depends on every
//! mutation going through this one writer.

use workwire_core::WireError;

use crate::migrations;

/// Convert a tokio-rusqlite error into the workspace error type.
pub fn map_tr_err(e: tokio_rusqlite::Error) -> WireError {
    WireError::Storage {
        source: Box::new(e),
    }
}

/// Handle to the single SQLite connection.
///
/// Cheap to clone; all clones share the one background writer thread.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (or create) the database at `path` with WAL mode enabled and
    /// run pending migrations.
    pub async fn open(path: &str) -> Result<Self, WireError> {
        Self::open_with(path, true).await
    }

    /// Open with an explicit WAL-mode choice.
    pub async fn open_with(path: &str, wal_mode: bool) -> Result<Self, WireError> {
        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| map_tr_err(e.into()))?;

        conn.call(move |conn| -> Result<(), WireError> {
            let to_storage = |e: rusqlite::Error| WireError::Storage {
                source: Box::new(e),
            };
            if wal_mode {
                conn.pragma_update(None, "journal_mode", "WAL")
                    .map_err(to_storage)?;
                conn.pragma_update(None, "synchronous", "NORMAL")
                    .map_err(to_storage)?;
            }
            conn.pragma_update(None, "foreign_keys", "ON")
                .map_err(to_storage)?;
            migrations::run_migrations(conn)?;
            Ok(())
        })
        .await
        .map_err(|e| match e {
            tokio_rusqlite::Error::Error(w) => w,
            other => WireError::Storage {
                source: Box::new(other),
            },
        })?;

        Ok(Self { conn })
    }

    /// The underlying tokio-rusqlite connection, for query modules.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Close the connection, flushing pending work.
    pub async fn close(self) -> Result<(), WireError> {
        self.conn.close().await.map_err(map_tr_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_creates_file_and_runs_migrations() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("open.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();

        // Migrated schema exists.
        let count: i64 = db
            .connection()
            .call(|conn| -> rusqlite::Result<i64> {
                let n = conn.query_row(
                    "SELECT count(*) FROM sqlite_master
                     WHERE type = 'table' AND name IN ('conversations', 'messages')",
                    [],
                    |row| row.get(0),
                )?;
                Ok(n)
            })
            .await
            .unwrap();
        assert_eq!(count, 2);
        assert!(db_path.exists());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn reopen_is_idempotent() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("reopen.db");

        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        db.close().await.unwrap();

        // Second open must not re-apply migrations.
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        db.close().await.unwrap();
    }
}
