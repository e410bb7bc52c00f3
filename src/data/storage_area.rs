//! SQLite-backed storage area (persists across coordinator restarts)

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use serde_json::Value;
use tokio::sync::broadcast;

use super::Database;
use crate::store::{RawChange, StorageArea, StoreError, CHANGE_CHANNEL_CAPACITY};

/// Key/value storage area in the `storage` table.
///
/// Values are JSON text. Change notifications are delivered to subscribers
/// of this handle and its clones; separate processes opening the same file
/// do not see each other's changes.
#[derive(Clone)]
pub struct SqliteStorageArea {
    db: Database,
    changes: broadcast::Sender<RawChange>,
}

impl SqliteStorageArea {
    pub fn new(db: Database) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self { db, changes }
    }

    fn read(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let text: Option<String> = self.db.with_connection(|conn| {
            conn.query_row(
                "SELECT value FROM storage WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
        })?;

        match text {
            Some(text) => match serde_json::from_str(&text) {
                Ok(value) => Ok(Some(value)),
                Err(e) => {
                    // Treated as absent; the typed layer substitutes defaults
                    tracing::warn!(key, error = %e, "Unparseable stored JSON");
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    fn notify(&self, key: &str, old_value: Option<Value>, new_value: Option<Value>) {
        if old_value == new_value {
            return;
        }
        let _ = self.changes.send(RawChange {
            key: key.to_string(),
            old_value,
            new_value,
        });
    }
}

#[async_trait]
impl StorageArea for SqliteStorageArea {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        self.read(key)
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let old_value = self.read(key)?;
        let text = serde_json::to_string(&value)?;
        self.db.with_connection(|conn| {
            conn.execute(
                "INSERT INTO storage (key, value, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = ?3",
                params![key, text, Utc::now().to_rfc3339()],
            )
        })?;
        self.notify(key, old_value, Some(value));
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let old_value = self.read(key)?;
        self.db.with_connection(|conn| {
            conn.execute("DELETE FROM storage WHERE key = ?1", params![key])
        })?;
        self.notify(key, old_value, None);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<RawChange> {
        self.changes.subscribe()
    }
}
