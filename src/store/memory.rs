//! In-process storage area
//!
//! Clones share the same map and change channel, so one area handed to the
//! coordinator and several page contexts behaves like the browser's single
//! local storage area.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::broadcast;

use super::{RawChange, StorageArea, StoreError, CHANGE_CHANNEL_CAPACITY};

#[derive(Clone)]
pub struct MemoryStorageArea {
    values: Arc<Mutex<HashMap<String, Value>>>,
    changes: broadcast::Sender<RawChange>,
}

impl MemoryStorageArea {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            values: Arc::new(Mutex::new(HashMap::new())),
            changes,
        }
    }

    /// Raw contents, for inspection
    pub fn dump(&self) -> HashMap<String, Value> {
        self.values.lock().clone()
    }

    fn commit(&self, key: &str, new_value: Option<Value>) {
        let old_value = {
            let mut values = self.values.lock();
            match &new_value {
                Some(v) => values.insert(key.to_string(), v.clone()),
                None => values.remove(key),
            }
        };

        if old_value == new_value {
            return;
        }

        // No subscribers is fine
        let _ = self.changes.send(RawChange {
            key: key.to_string(),
            old_value,
            new_value,
        });
    }
}

impl Default for MemoryStorageArea {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageArea for MemoryStorageArea {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.values.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.commit(key, Some(value));
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.commit(key, None);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<RawChange> {
        self.changes.subscribe()
    }
}
