//! Desk error types.

use parkgate_core::{CoreError, VehicleStatus};
use parkgate_fetch::FetchError;
use parkgate_store::StoreError;
use thiserror::Error;

// ============================================================================
// Exit Error
// ============================================================================

/// Why an exit attempt stopped.
#[derive(Debug, Error)]
pub enum ExitError {
    /// Plate not on the current directory page.
    #[error("Car {plate} not found")]
    NotFound {
        /// Plate requested.
        plate: String,
    },

    /// Vehicle is not in a state that allows exit.
    #[error("Car {plate} is {status}; only cars inside or pending can exit")]
    InvalidState {
        /// Plate requested.
        plate: String,
        /// Current status.
        status: VehicleStatus,
    },

    /// Request rejected before any side effect.
    #[error("Validation failed: {0}")]
    Validation(#[from] CoreError),

    /// Another attempt for the same plate is running.
    #[error("Exit already in progress for {0}")]
    InProgress(String),

    /// The backend never produced a final fee.
    #[error("Final fee for {plate} unavailable after {attempts} attempts")]
    FeeUnavailable {
        /// Plate requested.
        plate: String,
        /// Lookups made.
        attempts: u32,
    },

    /// A remote call failed.
    #[error("Remote call failed: {0}")]
    Remote(FetchError),

    /// Local shift state could not be written.
    #[error("Shift storage failed: {0}")]
    Store(#[from] StoreError),
}

impl From<FetchError> for ExitError {
    fn from(error: FetchError) -> Self {
        match error {
            FetchError::Validation(e) => Self::Validation(e),
            FetchError::FeeUnavailable { plate, attempts } => {
                Self::FeeUnavailable { plate, attempts }
            }
            other => Self::Remote(other),
        }
    }
}

impl ExitError {
    /// Returns true if the vehicle's record may now disagree with the
    /// shift books and needs a manual look.
    pub fn is_reconciliation_needed(&self) -> bool {
        matches!(self, Self::FeeUnavailable { .. } | Self::Store(_))
    }

    /// Returns true if the operator has to log in again.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::Remote(e) if e.is_auth_expired())
    }

    /// Text to show the operator.
    pub fn user_message(&self) -> String {
        match self {
            Self::NotFound { plate } => format!("Car {plate} not found"),
            Self::InvalidState { plate, status } => {
                format!("Car {plate} is already {status}")
            }
            Self::Validation(e) => e.to_string(),
            Self::InProgress(plate) => format!("Exit for {plate} is already being processed"),
            Self::FeeUnavailable { plate, .. } => format!(
                "Could not get the final payment for {plate}. The car is marked as exited; \
                 check the payment manually"
            ),
            Self::Remote(e) if e.is_auth_expired() => {
                "Session expired. Please log in again.".to_string()
            }
            Self::Remote(e) => format!("Server error: {e}"),
            Self::Store(e) => format!("Could not save shift data: {e}"),
        }
    }
}

// ============================================================================
// Desk Error
// ============================================================================

/// Errors raised while wiring the desk.
#[derive(Debug, Error)]
pub enum DeskError {
    /// Settings are unusable.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Client construction failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Shift state could not be loaded.
    #[error(transparent)]
    Store(#[from] StoreError),
}
