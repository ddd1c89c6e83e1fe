//! Fee quotes with bounded retry.
//!
//! The backend computes a fee only once the exit has been recorded, so the
//! first lookups after an exit often come back without one. The client keeps
//! asking, a fixed number of times, until the fee shows up.

use std::sync::Arc;

use tracing::{debug, info, warn};

use parkgate_core::{CoreError, FeeSnapshot, validate_plate};

use crate::api::{FeeQuery, VehicleGateway};
use crate::error::FetchError;
use crate::retry::RetryStrategy;

/// A lookup that came back with a computed fee.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedFee {
    /// The fee; zero is a valid amount.
    pub fee: f64,
    /// Everything else the lookup returned.
    pub snapshot: FeeSnapshot,
}

/// Looks up the current fee of a vehicle.
#[derive(Clone)]
pub struct FeeQuoteClient {
    gateway: Arc<dyn VehicleGateway>,
    zone: Option<String>,
    retry: RetryStrategy,
}

impl std::fmt::Debug for FeeQuoteClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeeQuoteClient")
            .field("zone", &self.zone)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl FeeQuoteClient {
    /// Creates a client that sends `zone` as the lookup's channel name.
    pub fn new(gateway: Arc<dyn VehicleGateway>, zone: Option<String>) -> Self {
        Self {
            gateway,
            zone: zone.filter(|z| !z.trim().is_empty()),
            retry: RetryStrategy::fee_quote(),
        }
    }

    /// Sets the retry policy used by [`Self::retry_quote`].
    pub fn with_retry_strategy(mut self, retry: RetryStrategy) -> Self {
        self.retry = retry;
        self
    }

    /// Zone sent with every lookup.
    pub fn zone(&self) -> Option<&str> {
        self.zone.as_deref()
    }

    /// Returns a client that falls back to `zone` when none is configured.
    ///
    /// Zone-scoped operators keep their own zone; unscoped ones quote in the
    /// vehicle's zone.
    pub fn in_zone(&self, zone: &str) -> Self {
        let mut client = self.clone();
        if client.zone.is_none() && !zone.trim().is_empty() {
            client.zone = Some(zone.to_string());
        }
        client
    }

    fn query(&self, plate: &str, channel_id: &str) -> Result<FeeQuery, CoreError> {
        let plate = validate_plate(plate)?;
        let channel_id = channel_id.trim();
        if channel_id.is_empty() {
            return Err(CoreError::MissingChannel);
        }
        let zone = self.zone.as_deref().ok_or(CoreError::MissingZone)?;

        Ok(FeeQuery {
            plate: plate.to_string(),
            zone: zone.to_string(),
            channel_id: channel_id.to_string(),
        })
    }

    /// Performs one lookup.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Validation`] before any request for a malformed
    /// plate, an empty channel or a missing zone. Remote failures are passed
    /// through.
    pub async fn quote(
        &self,
        plate: &str,
        channel_id: &str,
        use_alternate_endpoint: bool,
    ) -> Result<FeeSnapshot, FetchError> {
        let query = self.query(plate, channel_id)?;
        self.gateway.lookup(&query, use_alternate_endpoint).await
    }

    /// Looks up the fee until the backend has computed it.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::FeeUnavailable`] once the budget is spent.
    pub async fn retry_quote(&self, plate: &str, channel_id: &str) -> Result<ResolvedFee, FetchError> {
        self.retry_quote_with(plate, channel_id, &self.retry).await
    }

    /// Same as [`Self::retry_quote`] with an explicit policy.
    ///
    /// Validation errors and an expired session abort at once; every other
    /// failure uses up one attempt.
    pub async fn retry_quote_with(
        &self,
        plate: &str,
        channel_id: &str,
        strategy: &RetryStrategy,
    ) -> Result<ResolvedFee, FetchError> {
        let query = self.query(plate, channel_id)?;
        let max_attempts = strategy.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            match self.gateway.lookup(&query, false).await {
                Ok(snapshot) => match snapshot.fee {
                    Some(fee) => {
                        info!(plate = %query.plate, attempt, fee, "Fee resolved");
                        return Ok(ResolvedFee { fee, snapshot });
                    }
                    None => {
                        warn!(plate = %query.plate, attempt, "Fee not computed yet, car may still be inside");
                    }
                },
                Err(FetchError::AuthExpired) => return Err(FetchError::AuthExpired),
                Err(e) => {
                    warn!(plate = %query.plate, attempt, error = %e, "Fee lookup failed");
                }
            }

            if attempt < max_attempts {
                let delay = strategy.delay;
                debug!(?delay, "Waiting before next fee lookup");
                tokio::time::sleep(delay).await;
            }
        }

        Err(FetchError::FeeUnavailable {
            plate: query.plate,
            attempts: max_attempts,
        })
    }

    /// Tries the primary endpoint, then the alternate one.
    ///
    /// # Errors
    ///
    /// Validation errors are returned without touching the network. When
    /// both endpoints fail the alternate's error is returned.
    pub async fn quote_with_fallback(
        &self,
        plate: &str,
        channel_id: &str,
    ) -> Result<FeeSnapshot, FetchError> {
        let query = self.query(plate, channel_id)?;
        match self.gateway.lookup(&query, false).await {
            Ok(snapshot) => Ok(snapshot),
            Err(FetchError::AuthExpired) => Err(FetchError::AuthExpired),
            Err(e) => {
                warn!(plate = %query.plate, error = %e, "Primary lookup failed, trying alternate endpoint");
                self.gateway.lookup(&query, true).await
            }
        }
    }
}
