//! Fetch error types.

use thiserror::Error;

// ============================================================================
// Main Fetch Error
// ============================================================================

/// Error type for remote operations.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Host-level HTTP failure.
    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    /// Request or body decoding failed.
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    /// Backend answered with a non-success status.
    #[error("Remote error (HTTP {status}): {message}")]
    Remote {
        /// HTTP status code.
        status: u16,
        /// Backend message, or a status-derived one.
        message: String,
    },

    /// Backend answered 401; the operator must log in again.
    #[error("Session expired. Please log in again.")]
    AuthExpired,

    /// Response did not have the expected shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Local input rejected before any request was made.
    #[error("Validation failed: {0}")]
    Validation(#[from] parkgate_core::CoreError),

    /// The backend never produced a fee within the retry budget.
    #[error("Failed to fetch total_payment for {plate} after {attempts} attempts")]
    FeeUnavailable {
        /// Plate that was looked up.
        plate: String,
        /// Attempts made.
        attempts: u32,
    },

    /// Push-feed connectivity error.
    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),
}

impl FetchError {
    /// Builds a remote error, deriving a message from the status when the
    /// backend sent none.
    pub fn remote(status: u16, message: Option<String>) -> Self {
        let message = message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| format!("API error: {status}"));
        Self::Remote { status, message }
    }

    /// Returns true if the operator has to authenticate again.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::AuthExpired)
    }
}

// ============================================================================
// HTTP Error
// ============================================================================

/// HTTP-specific error type.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Request error.
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

// ============================================================================
// Feed Error
// ============================================================================

/// Error type for the push-feed connection.
#[derive(Debug, Error)]
pub enum FeedError {
    /// Could not establish the connection.
    #[error("Connection failed: {0}")]
    Connect(String),

    /// The connection broke mid-stream.
    #[error("Protocol error: {0}")]
    Protocol(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_message_fallback() {
        let err = FetchError::remote(502, None);
        assert_eq!(err.to_string(), "Remote error (HTTP 502): API error: 502");

        let err = FetchError::remote(400, Some("bad plate".to_string()));
        assert_eq!(err.to_string(), "Remote error (HTTP 400): bad plate");
        assert!(!err.is_auth_expired());
    }

    #[test]
    fn test_validation_keeps_core_error() {
        let err = FetchError::from(parkgate_core::CoreError::MissingChannel);
        assert!(matches!(err, FetchError::Validation(parkgate_core::CoreError::MissingChannel)));
        assert!(!err.is_auth_expired());
    }
}
