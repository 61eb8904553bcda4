use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use tracing::debug;

use crate::channel::PersistenceChannel;
use crate::error::{Result, SyncError};

/// Create the document table. Idempotent.
///
/// One row per channel name; the payload is the serialized document.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS channel_documents (
            channel     TEXT NOT NULL PRIMARY KEY,
            payload     TEXT NOT NULL,      -- JSON document
            updated_at  TEXT NOT NULL       -- ISO-8601
        ) STRICT;
        ",
    )?;
    Ok(())
}

/// Channel backed by a local SQLite file.
pub struct SqliteChannel {
    name: String,
    conn: Arc<Mutex<Connection>>,
}

impl SqliteChannel {
    pub fn new(name: impl Into<String>, conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self {
            name: name.into(),
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open (or create) the database at `path`, creating parent directories.
    pub fn open(name: impl Into<String>, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                SyncError::Config(format!("cannot create {}: {e}", parent.display()))
            })?;
        }
        Self::new(name, Connection::open(path)?)
    }

    pub fn in_memory(name: impl Into<String>) -> Result<Self> {
        Self::new(name, Connection::open_in_memory()?)
    }
}

#[async_trait]
impl PersistenceChannel for SqliteChannel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn load(&self) -> Result<Option<serde_json::Value>> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let raw: Option<String> = conn
            .query_row(
                "SELECT payload FROM channel_documents WHERE channel = ?1",
                [&self.name],
                |row| row.get(0),
            )
            .optional()?;

        raw.map(|text| {
            serde_json::from_str(&text)
                .map_err(|e| SyncError::Decode(format!("stored payload is not JSON: {e}")))
        })
        .transpose()
    }

    async fn save(&self, document: &serde_json::Value) -> Result<()> {
        let payload = serde_json::to_string(document)?;
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        conn.execute(
            "INSERT INTO channel_documents (channel, payload, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(channel) DO UPDATE SET
                payload = excluded.payload,
                updated_at = excluded.updated_at",
            rusqlite::params![self.name, payload, Utc::now().to_rfc3339()],
        )?;
        debug!(channel = %self.name, bytes = payload.len(), "document saved");
        Ok(())
    }
}
