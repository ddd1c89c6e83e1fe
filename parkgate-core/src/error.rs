//! Core error types for `ParkGate`.

use thiserror::Error;

/// Local validation failures. Never retried.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Plate number does not match `[A-Z0-9]{5,8}`.
    #[error("Invalid car number format: {0:?}. Expected format: AB1234AG")]
    InvalidPlate(String),

    /// Channel identifier missing or blank.
    #[error("No channel ID provided")]
    MissingChannel,

    /// Operator has no parking zone assigned.
    #[error("No parking zone selected")]
    MissingZone,

    /// Barrier opening requested without a reason.
    #[error("Please enter a reason for opening the barrier")]
    EmptyReason,

    /// Invalid data from API response or push feed.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
