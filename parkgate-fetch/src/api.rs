//! Parking backend API client.
//!
//! Exposes the three calls the desk makes against `{api_url}/api/v1`:
//! the paginated search, the fee lookup and the status update.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Response, StatusCode};
use tracing::{debug, instrument, warn};

use parkgate_core::{FeeSnapshot, VehicleFilter, VehicleSession};

use crate::error::FetchError;
use crate::host::http::{HttpClient, join_url};
use crate::wire::{ErrorBody, LookupRequest, LookupResponse, SearchResponse, VehicleUpdate};

/// Path prefix of every backend endpoint.
pub const API_PREFIX: &str = "api/v1";

// ============================================================================
// Types
// ============================================================================

/// One page of search results.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchPage {
    /// Sessions on this page.
    pub sessions: Vec<VehicleSession>,
    /// Matches across all pages.
    pub total: u64,
    /// Number of pages, at least 1.
    pub total_pages: u32,
}

/// Inputs of a fee lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeQuery {
    /// Validated plate.
    pub plate: String,
    /// Operator zone.
    pub zone: String,
    /// Barrier channel.
    pub channel_id: String,
}

// ============================================================================
// Gateway Trait
// ============================================================================

/// Remote operations on vehicle records.
#[async_trait]
pub trait VehicleGateway: Send + Sync {
    /// Fetches one filtered page.
    async fn search(&self, filter: &VehicleFilter) -> Result<SearchPage, FetchError>;

    /// Asks the backend for the current fee. `alternate` selects the
    /// `/nows` variant of the endpoint.
    async fn lookup(&self, query: &FeeQuery, alternate: bool) -> Result<FeeSnapshot, FetchError>;

    /// Writes status, fee and exit time for a plate.
    async fn update(&self, plate: &str, update: &VehicleUpdate) -> Result<(), FetchError>;
}

// ============================================================================
// HTTP Implementation
// ============================================================================

/// HTTP client for the parking backend.
#[derive(Debug, Clone)]
pub struct ParkingApi {
    http: HttpClient,
    base_url: String,
}

impl ParkingApi {
    /// Creates a client for `base_url` (without the `/api/v1` suffix).
    pub fn new(http: HttpClient, base_url: impl Into<String>) -> Result<Self, FetchError> {
        let base_url = base_url.into();
        join_url(&base_url, API_PREFIX)?;
        Ok(Self { http, base_url })
    }

    /// Backend base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<String, FetchError> {
        Ok(join_url(&self.base_url, &format!("{API_PREFIX}/{path}"))?)
    }
}

/// Maps non-success statuses to errors.
pub(crate) async fn check_status(response: Response) -> Result<Response, FetchError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::UNAUTHORIZED {
        warn!("Backend rejected the session");
        return Err(FetchError::AuthExpired);
    }

    let message = response
        .json::<ErrorBody>()
        .await
        .ok()
        .and_then(|body| body.message);
    Err(FetchError::remote(status.as_u16(), message))
}

#[async_trait]
impl VehicleGateway for ParkingApi {
    #[instrument(skip(self, filter), fields(page = filter.page))]
    async fn search(&self, filter: &VehicleFilter) -> Result<SearchPage, FetchError> {
        let url = self.endpoint("searchcar")?;
        let response = self.http.get_query(&url, &filter.query_pairs()).await?;
        let body: SearchResponse = check_status(response).await?.json().await?;

        let cars = body.cars.unwrap_or_default();
        if cars.is_empty() {
            debug!("Search returned no vehicles");
            return Ok(SearchPage {
                sessions: Vec::new(),
                total: 0,
                total_pages: 1,
            });
        }

        let total = body
            .total
            .filter(|t| *t > 0)
            .unwrap_or(cars.len() as u64);
        let total_pages = body
            .total_pages
            .filter(|p| *p > 0)
            .unwrap_or_else(|| pages_for(total, filter.limit));
        let sessions: Vec<VehicleSession> = cars.into_iter().map(|c| c.into_session()).collect();

        debug!(count = sessions.len(), total, total_pages, "Search page received");
        Ok(SearchPage {
            sessions,
            total,
            total_pages,
        })
    }

    #[instrument(skip(self, query), fields(plate = %query.plate))]
    async fn lookup(&self, query: &FeeQuery, alternate: bool) -> Result<FeeSnapshot, FetchError> {
        let path = if alternate {
            "camera/getdata/nows"
        } else {
            "camera/getdata"
        };
        let url = self.endpoint(path)?;
        let body = LookupRequest::new(&query.plate, &query.zone, &query.channel_id, Utc::now());

        let response = self.http.put_json(&url, &body).await?;
        let body: LookupResponse = check_status(response).await?.json().await?;
        let record = body
            .into_record()
            .ok_or_else(|| FetchError::InvalidResponse("No car data returned".to_string()))?;

        let snapshot = FeeSnapshot::from(record);
        if snapshot.has_fee() {
            debug!(fee = ?snapshot.fee, "Fee lookup resolved");
        } else {
            debug!("Fee not computed yet");
        }
        Ok(snapshot)
    }

    #[instrument(skip(self, update), fields(status = %update.status))]
    async fn update(&self, plate: &str, update: &VehicleUpdate) -> Result<(), FetchError> {
        let url = self.endpoint(&format!("camera/updatecar/{plate}"))?;
        let response = self.http.put_json(&url, update).await?;
        check_status(response).await?;
        debug!("Vehicle updated");
        Ok(())
    }
}

/// `ceil(total / limit)`, at least 1.
fn pages_for(total: u64, limit: u32) -> u32 {
    let limit = u64::from(limit.max(1));
    u32::try_from(total.div_ceil(limit)).unwrap_or(u32::MAX).max(1)
}
