use std::collections::HashMap;

use parking_lot::RwLock;
use serde::{Serialize, de::DeserializeOwned};

use crate::{StoreError, StoreResult};

/// Key-value store for client session snapshots.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String);
    fn clear(&self, key: &str);
}

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: String) {
        self.entries.write().insert(key.to_string(), value);
    }

    fn clear(&self, key: &str) {
        self.entries.write().remove(key);
    }
}

/// Read a JSON snapshot. A corrupt entry is cleared and reported.
pub fn load_json<T: DeserializeOwned>(
    store: &dyn SessionStore,
    key: &str,
) -> StoreResult<Option<T>> {
    let Some(raw) = store.get(key) else {
        return Ok(None);
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(err) => {
            store.clear(key);
            Err(StoreError::Codec {
                key: key.to_string(),
                reason: err.to_string(),
            })
        }
    }
}

pub fn save_json<T: Serialize>(store: &dyn SessionStore, key: &str, value: &T) -> StoreResult<()> {
    let raw = serde_json::to_string(value).map_err(|err| StoreError::Codec {
        key: key.to_string(),
        reason: err.to_string(),
    })?;
    store.set(key, raw);
    Ok(())
}
