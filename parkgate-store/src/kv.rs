//! Key-value persistence port.
//!
//! Shift state is a handful of JSON values under fixed keys. Writes that
//! must land together go through [`KeyValueStore::set_many`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::persistence::{load_json, save_json};

/// Durable key-value storage.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Reads one value.
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// Writes all entries, or none of them.
    async fn set_many(&self, entries: Vec<(String, Value)>) -> Result<(), StoreError>;

    /// Writes one value.
    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.set_many(vec![(key.to_string(), value)]).await
    }
}

// ============================================================================
// JSON File Backend
// ============================================================================

/// Stores every key in one JSON object on disk.
///
/// Each write rewrites the whole file atomically, so a batch either lands
/// completely or not at all.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    cache: Mutex<Option<BTreeMap<String, Value>>>,
}

impl JsonFileStore {
    /// Creates a store backed by `path`. Nothing is read until first use.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: Mutex::new(None),
        }
    }

    /// File backing this store.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_file(&self) -> BTreeMap<String, Value> {
        match load_json::<BTreeMap<String, Value>>(&self.path).await {
            Ok(map) => map,
            Err(StoreError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "State file not found, starting empty");
                BTreeMap::new()
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "State file unreadable, starting empty");
                BTreeMap::new()
            }
        }
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let mut cache = self.cache.lock().await;
        if cache.is_none() {
            *cache = Some(self.read_file().await);
        }
        Ok(cache.as_ref().and_then(|map| map.get(key).cloned()))
    }

    async fn set_many(&self, entries: Vec<(String, Value)>) -> Result<(), StoreError> {
        let mut cache = self.cache.lock().await;
        let mut next = match cache.as_ref() {
            Some(map) => map.clone(),
            None => self.read_file().await,
        };
        for (key, value) in entries {
            next.insert(key, value);
        }

        save_json(&self.path, &next).await?;
        *cache = Some(next);
        Ok(())
    }
}

// ============================================================================
// In-Memory Backend
// ============================================================================

/// Volatile store, lost on exit.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<BTreeMap<String, Value>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-filled with `entries`.
    pub fn with_entries(entries: impl IntoIterator<Item = (String, Value)>) -> Self {
        Self {
            values: Mutex::new(entries.into_iter().collect()),
        }
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.values.lock().await.get(key).cloned())
    }

    async fn set_many(&self, entries: Vec<(String, Value)>) -> Result<(), StoreError> {
        let mut values = self.values.lock().await;
        for (key, value) in entries {
            values.insert(key, value);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_file_store_roundtrip_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let store = JsonFileStore::new(&path);
        store
            .set_many(vec![
                ("shiftProfit".to_string(), json!(45.0)),
                ("processedCars".to_string(), json!(["AB1234AG"])),
            ])
            .await
            .unwrap();

        let reopened = JsonFileStore::new(&path);
        assert_eq!(reopened.get("shiftProfit").await.unwrap(), Some(json!(45.0)));
        assert_eq!(
            reopened.get("processedCars").await.unwrap(),
            Some(json!(["AB1234AG"]))
        );
        assert_eq!(reopened.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_file_store_corrupt_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        tokio::fs::write(&path, "{ not json").await.unwrap();

        let store = JsonFileStore::new(&path);
        assert_eq!(store.get("shiftProfit").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_memory_store_set_overwrites() {
        let store = MemoryStore::new();
        store.set("k", json!(1)).await.unwrap();
        store.set("k", json!(2)).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(json!(2)));
    }
}
