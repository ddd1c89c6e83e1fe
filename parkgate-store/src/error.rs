//! Store error types.

use parkgate_fetch::FetchError;
use thiserror::Error;

/// Errors that can occur in the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Amount is negative or not a number.
    #[error("Invalid amount: {0}")]
    InvalidAmount(f64),

    /// Remote call failed.
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl StoreError {
    /// Returns true if the backend rejected the session.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, StoreError::Fetch(e) if e.is_auth_expired())
    }
}
