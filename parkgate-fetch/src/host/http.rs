//! HTTP client with tracing and endpoint helpers.
//!
//! Wraps `reqwest` so every request is traced the same way and URL
//! building goes through one place.

use reqwest::{Client, Response};
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use crate::error::HttpError;

/// Default request timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// User agent string for ParkGate.
const USER_AGENT: &str = concat!("ParkGate/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// HTTP Client
// ============================================================================

/// HTTP client wrapper with request tracing.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client,
}

impl HttpClient {
    /// Creates a new HTTP client with default settings.
    pub fn new() -> Result<Self, HttpError> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Creates a new HTTP client with a custom timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, HttpError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self { inner: client })
    }

    /// Performs a GET request with query parameters.
    #[instrument(skip(self, query), fields(url = %url))]
    pub async fn get_query(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<Response, HttpError> {
        debug!(params = query.len(), "GET request");

        let response = self.inner.get(url).query(query).send().await?;
        debug!(status = %response.status(), "Response received");
        Ok(response)
    }

    /// Performs a PUT request with JSON body.
    #[instrument(skip(self, body), fields(url = %url))]
    pub async fn put_json<T: serde::Serialize + ?Sized>(
        &self,
        url: &str,
        body: &T,
    ) -> Result<Response, HttpError> {
        debug!("PUT request with JSON");

        let response = self.inner.put(url).json(body).send().await?;
        debug!(status = %response.status(), "Response received");
        Ok(response)
    }

    /// Performs an empty POST request with basic auth.
    #[instrument(skip(self, username, password), fields(url = %url))]
    pub async fn post_with_basic_auth(
        &self,
        url: &str,
        username: &str,
        password: &str,
    ) -> Result<Response, HttpError> {
        debug!("POST request with basic auth");

        let response = self
            .inner
            .post(url)
            .basic_auth(username, Some(password))
            .send()
            .await?;
        debug!(status = %response.status(), "Response received");
        Ok(response)
    }
}

// ============================================================================
// URL Helpers
// ============================================================================

/// Joins `base` and `path` with exactly one slash and validates the result.
pub fn join_url(base: &str, path: &str) -> Result<String, HttpError> {
    let joined = format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    let parsed = Url::parse(&joined).map_err(|e| HttpError::InvalidUrl(e.to_string()))?;
    if parsed.host_str().is_none() {
        return Err(HttpError::InvalidUrl(format!("No host in URL: {joined}")));
    }
    Ok(joined)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_url_slashes() {
        assert_eq!(
            join_url("http://10.0.0.5:3000/", "/api/v1/searchcar").unwrap(),
            "http://10.0.0.5:3000/api/v1/searchcar"
        );
        assert_eq!(
            join_url("http://10.0.0.5:3000", "api/v1/searchcar").unwrap(),
            "http://10.0.0.5:3000/api/v1/searchcar"
        );
    }

    #[test]
    fn test_join_url_invalid() {
        assert!(join_url("not-a-valid-url", "x").is_err());
        assert!(join_url("", "api").is_err());
    }

    #[test]
    fn test_client_builds() {
        assert!(HttpClient::with_timeout(Duration::from_secs(5)).is_ok());
    }
}
