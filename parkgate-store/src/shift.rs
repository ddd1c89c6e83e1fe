//! Shift accounting: profit and processed plates settled together.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::error::StoreError;
use crate::kv::KeyValueStore;
use crate::ledger::{PROFIT_KEY, ShiftLedger, validate_amount};
use crate::processed::{PROCESSED_KEY, ProcessedSet, to_value};

/// Result of a settlement.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Settlement {
    /// Fee credited and plate marked.
    Settled {
        /// Plate settled.
        plate: String,
        /// Amount credited.
        amount: f64,
        /// Shift total after the credit.
        total: f64,
    },
    /// Plate was already settled; nothing credited.
    AlreadyProcessed {
        /// Plate.
        plate: String,
    },
}

/// Point-in-time view of the shift.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftSummary {
    /// Profit so far.
    pub total: f64,
    /// Plates settled so far.
    pub plates: Vec<String>,
}

/// The operator's accounting period.
///
/// Both services share one store so a settlement can write them in a
/// single batch.
pub struct Shift {
    store: Arc<dyn KeyValueStore>,
    processed: ProcessedSet,
    ledger: ShiftLedger,
}

impl std::fmt::Debug for Shift {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shift")
            .field("processed", &self.processed)
            .field("ledger", &self.ledger)
            .finish_non_exhaustive()
    }
}

impl Shift {
    /// Loads both services from `store`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn load(store: Arc<dyn KeyValueStore>) -> Result<Self, StoreError> {
        let processed = ProcessedSet::load(store.clone()).await?;
        let ledger = ShiftLedger::load(store.clone()).await?;
        Ok(Self {
            store,
            processed,
            ledger,
        })
    }

    /// Processed plates.
    pub fn processed(&self) -> &ProcessedSet {
        &self.processed
    }

    /// Profit ledger.
    pub fn ledger(&self) -> &ShiftLedger {
        &self.ledger
    }

    /// Credits `amount` and marks `plate` in one write.
    ///
    /// If the write fails neither the total nor the set changes. A plate
    /// that is already processed is not credited again.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidAmount`] for negative or non-finite
    /// amounts, or a storage error if the batch cannot be written.
    pub async fn settle(&self, plate: &str, amount: f64) -> Result<Settlement, StoreError> {
        let plate = plate.trim().to_string();
        let mut plates = self.processed.plates.write().await;
        if plates.contains(&plate) {
            return Ok(Settlement::AlreadyProcessed { plate });
        }
        validate_amount(amount)?;

        let mut total = self.ledger.total.write().await;
        let next_total = *total + amount;
        let mut next_plates = plates.clone();
        next_plates.insert(plate.clone());

        self.store
            .set_many(vec![
                (PROFIT_KEY.to_string(), Value::from(next_total)),
                (PROCESSED_KEY.to_string(), to_value(&next_plates)),
            ])
            .await?;
        *total = next_total;
        *plates = next_plates;

        info!(plate = %plate, amount, total = next_total, "Exit settled");
        Ok(Settlement::Settled {
            plate,
            amount,
            total: next_total,
        })
    }

    /// Starts a new shift: zero profit, no processed plates.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the reset cannot be written; nothing
    /// changes in that case.
    pub async fn reset(&self) -> Result<(), StoreError> {
        let mut plates = self.processed.plates.write().await;
        let mut total = self.ledger.total.write().await;

        self.store
            .set_many(vec![
                (PROFIT_KEY.to_string(), Value::from(0.0)),
                (PROCESSED_KEY.to_string(), to_value(&BTreeSet::new())),
            ])
            .await?;
        let previous = *total;
        *total = 0.0;
        plates.clear();

        info!(previous_total = previous, "Shift reset");
        Ok(())
    }

    /// Current total and processed plates.
    pub async fn summary(&self) -> ShiftSummary {
        ShiftSummary {
            total: self.ledger.total().await,
            plates: self.processed.plates().await,
        }
    }
}
