//! Plates whose exit payment was recorded during the current shift.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::kv::KeyValueStore;

/// Storage key of the processed plates.
pub const PROCESSED_KEY: &str = "processedCars";

/// Durable, idempotent set of processed plates.
pub struct ProcessedSet {
    store: Arc<dyn KeyValueStore>,
    pub(crate) plates: RwLock<BTreeSet<String>>,
}

impl std::fmt::Debug for ProcessedSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessedSet").finish_non_exhaustive()
    }
}

impl ProcessedSet {
    /// Loads the set from `store`.
    ///
    /// A corrupt value is logged and treated as empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn load(store: Arc<dyn KeyValueStore>) -> Result<Self, StoreError> {
        let plates = match store.get(PROCESSED_KEY).await? {
            None => BTreeSet::new(),
            Some(value) => serde_json::from_value::<Vec<String>>(value)
                .map(|plates| plates.into_iter().collect())
                .unwrap_or_else(|e| {
                    warn!(error = %e, "Processed plates unreadable, starting empty");
                    BTreeSet::new()
                }),
        };
        debug!(count = plates.len(), "Processed plates loaded");

        Ok(Self {
            store,
            plates: RwLock::new(plates),
        })
    }

    /// Returns true if `plate` was already settled this shift.
    pub async fn has_processed(&self, plate: &str) -> bool {
        self.plates.read().await.contains(plate.trim())
    }

    /// Adds `plate`, persisting before returning.
    ///
    /// Returns `true` when the plate was newly inserted. Marking a plate
    /// twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the new set cannot be persisted; the in-memory
    /// set is then unchanged.
    pub async fn mark_processed(&self, plate: &str) -> Result<bool, StoreError> {
        let plate = plate.trim().to_string();
        let mut plates = self.plates.write().await;
        if plates.contains(&plate) {
            return Ok(false);
        }

        let mut next = plates.clone();
        next.insert(plate.clone());
        self.store.set(PROCESSED_KEY, to_value(&next)).await?;
        *plates = next;

        info!(plate = %plate, "Plate marked processed");
        Ok(true)
    }

    /// All processed plates, sorted.
    pub async fn plates(&self) -> Vec<String> {
        self.plates.read().await.iter().cloned().collect()
    }

    /// Number of processed plates.
    pub async fn len(&self) -> usize {
        self.plates.read().await.len()
    }

    /// Returns true if nothing was processed yet.
    pub async fn is_empty(&self) -> bool {
        self.plates.read().await.is_empty()
    }
}

/// Serialized form of the set.
pub(crate) fn to_value(plates: &BTreeSet<String>) -> Value {
    Value::Array(plates.iter().cloned().map(Value::String).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryStore;
    use serde_json::json;

    #[tokio::test]
    async fn test_mark_is_idempotent() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let set = ProcessedSet::load(store.clone()).await.unwrap();

        assert!(set.mark_processed("AB1234AG").await.unwrap());
        assert!(!set.mark_processed("AB1234AG").await.unwrap());
        assert_eq!(set.len().await, 1);
        assert_eq!(
            store.get(PROCESSED_KEY).await.unwrap(),
            Some(json!(["AB1234AG"]))
        );
    }

    #[tokio::test]
    async fn test_load_existing_and_corrupt() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::with_entries([(
            PROCESSED_KEY.to_string(),
            json!(["XY98765", "AB1234AG"]),
        )]));
        let set = ProcessedSet::load(store).await.unwrap();
        assert!(set.has_processed("AB1234AG").await);
        assert_eq!(set.plates().await, vec!["AB1234AG", "XY98765"]);

        let corrupt: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::with_entries([(
            PROCESSED_KEY.to_string(),
            json!({"oops": true}),
        )]));
        let set = ProcessedSet::load(corrupt).await.unwrap();
        assert!(set.is_empty().await);
    }
}
