//! Running profit of the current shift.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::kv::KeyValueStore;

/// Storage key of the shift profit.
pub const PROFIT_KEY: &str = "shiftProfit";

/// Durable, increment-only profit total.
pub struct ShiftLedger {
    store: Arc<dyn KeyValueStore>,
    pub(crate) total: RwLock<f64>,
}

impl std::fmt::Debug for ShiftLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShiftLedger").finish_non_exhaustive()
    }
}

impl ShiftLedger {
    /// Loads the total from `store`.
    ///
    /// A corrupt value is logged and treated as zero.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn load(store: Arc<dyn KeyValueStore>) -> Result<Self, StoreError> {
        let total = match store.get(PROFIT_KEY).await? {
            None => 0.0,
            Some(value) => parse_total(&value).unwrap_or_else(|| {
                warn!(%value, "Shift profit unreadable, starting at zero");
                0.0
            }),
        };
        debug!(total, "Shift profit loaded");

        Ok(Self {
            store,
            total: RwLock::new(total),
        })
    }

    /// Current total.
    pub async fn total(&self) -> f64 {
        *self.total.read().await
    }

    /// Adds `amount` and returns the new total.
    ///
    /// The new total is persisted before the in-memory value changes.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidAmount`] for negative or non-finite
    /// amounts, or a storage error if the write fails.
    pub async fn credit(&self, amount: f64) -> Result<f64, StoreError> {
        validate_amount(amount)?;
        let mut total = self.total.write().await;
        let next = *total + amount;

        self.store.set(PROFIT_KEY, Value::from(next)).await?;
        *total = next;

        info!(amount, total = next, "Shift profit credited");
        Ok(next)
    }
}

/// Rejects negative and non-finite amounts.
pub(crate) fn validate_amount(amount: f64) -> Result<(), StoreError> {
    if amount.is_finite() && amount >= 0.0 {
        Ok(())
    } else {
        Err(StoreError::InvalidAmount(amount))
    }
}

fn parse_total(value: &Value) -> Option<f64> {
    let total = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }?;
    (total.is_finite() && total >= 0.0).then_some(total)
}
