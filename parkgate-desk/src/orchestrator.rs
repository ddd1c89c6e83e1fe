//! Exit flow: provisional exit, final fee, payment, barrier.
//!
//! One [`ExitOrchestrator::open_barrier_and_settle`] call runs its steps
//! strictly in order. The shift books are only touched after the backend
//! has accepted the payment record, and never rolled back because of a
//! barrier problem.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use parkgate_core::{
    CoreError, FeeSnapshot, VehiclePatch, VehicleSession, VehicleStatus, validate_plate,
};
use parkgate_fetch::{
    BarrierActuator, BarrierReport, DEFAULT_SETTLE_DELAY, FeeQuoteClient, ResolvedFee,
    VehicleGateway, VehicleUpdate, cycle_barrier,
};
use parkgate_store::{Settlement, Shift, VehicleDirectory};

use crate::error::ExitError;

/// Backend timestamps may be truncated; exits closer than this to our own
/// provisional exit are treated as ours.
const EXIT_TIME_TOLERANCE: TimeDelta = TimeDelta::seconds(1);

// ============================================================================
// Attempt Tracking
// ============================================================================

/// Step of one exit attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitPhase {
    /// Nothing sent yet.
    Idle,
    /// Provisional exit recorded remotely.
    ExitRequested,
    /// Waiting for the final fee.
    FeePending,
    /// Final fee known.
    FeeResolved,
    /// Payment recorded remotely and in the shift books.
    PaymentRecorded,
    /// Barrier cycle running.
    BarrierOpening,
    /// Done.
    Completed,
    /// Stopped on an error.
    Failed,
}

impl ExitPhase {
    /// Returns true for `Completed` and `Failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for ExitPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::ExitRequested => "exit_requested",
            Self::FeePending => "fee_pending",
            Self::FeeResolved => "fee_resolved",
            Self::PaymentRecorded => "payment_recorded",
            Self::BarrierOpening => "barrier_opening",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Record of one exit attempt.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExitAttempt {
    /// Plate.
    pub plate: String,
    /// When the attempt started.
    pub started_at: DateTime<Utc>,
    /// Current phase.
    pub phase: ExitPhase,
    /// Phases entered, in order.
    pub history: Vec<(ExitPhase, DateTime<Utc>)>,
    /// Failure text, once failed.
    pub error: Option<String>,
}

impl ExitAttempt {
    fn new(plate: &str) -> Self {
        let now = Utc::now();
        Self {
            plate: plate.to_string(),
            started_at: now,
            phase: ExitPhase::Idle,
            history: vec![(ExitPhase::Idle, now)],
            error: None,
        }
    }

    fn advance(&mut self, next: ExitPhase) {
        if self.phase.is_terminal() {
            return;
        }
        info!(plate = %self.plate, from = %self.phase, to = %next, "Exit phase");
        self.phase = next;
        self.history.push((next, Utc::now()));
    }

    fn fail(&mut self, error: &ExitError) {
        self.advance(ExitPhase::Failed);
        self.error = Some(error.to_string());
    }

    /// Phases entered, without timestamps.
    pub fn phases(&self) -> Vec<ExitPhase> {
        self.history.iter().map(|(phase, _)| *phase).collect()
    }
}

// ============================================================================
// Request / Outcome
// ============================================================================

/// Operator's request to let a vehicle out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitRequest {
    /// Plate.
    pub plate: String,
    /// Barrier name shown to the operator; the vehicle's zone when unset.
    pub barrier_label: Option<String>,
    /// Barrier channel; resolved from the vehicle or its zone when unset.
    pub channel_id: Option<String>,
    /// Why the barrier is opened.
    pub reason: String,
}

impl ExitRequest {
    /// Creates a request with the channel and label resolved later.
    pub fn new(plate: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            plate: plate.into(),
            barrier_label: None,
            channel_id: None,
            reason: reason.into(),
        }
    }

    /// Sets the barrier label.
    pub fn with_barrier_label(mut self, label: impl Into<String>) -> Self {
        self.barrier_label = Some(label.into());
        self
    }

    /// Sets the channel.
    pub fn with_channel(mut self, channel_id: impl Into<String>) -> Self {
        self.channel_id = Some(channel_id.into());
        self
    }
}

/// How a successful exit ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ExitOutcome {
    /// Fee collected and barrier cycled.
    Settled {
        /// Plate.
        plate: String,
        /// Fee credited.
        fee: f64,
        /// Barrier name.
        barrier_label: String,
        /// What the barrier did.
        barrier: BarrierReport,
        /// Shift total after the credit.
        shift_total: f64,
    },
    /// The plate was settled earlier in this shift; nothing done.
    AlreadySettled {
        /// Plate.
        plate: String,
    },
    /// Someone else settled the vehicle first; nothing credited.
    SettledElsewhere {
        /// Plate.
        plate: String,
        /// Fee the backend holds.
        fee: Option<f64>,
    },
}

impl ExitOutcome {
    /// Returns true if nothing was credited because the backend reported an
    /// earlier exit; the operator should confirm the car really left.
    pub fn needs_reconciliation(&self) -> bool {
        matches!(self, Self::SettledElsewhere { .. })
    }

    /// Plate the outcome is about.
    pub fn plate(&self) -> &str {
        match self {
            Self::Settled { plate, .. }
            | Self::AlreadySettled { plate }
            | Self::SettledElsewhere { plate, .. } => plate,
        }
    }
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Runs the exit flow against the backend, the barrier and the shift books.
pub struct ExitOrchestrator {
    gateway: Arc<dyn VehicleGateway>,
    quotes: FeeQuoteClient,
    barrier: Arc<dyn BarrierActuator>,
    directory: Arc<VehicleDirectory>,
    shift: Arc<Shift>,
    settle_delay: Duration,
    in_flight: RwLock<HashSet<String>>,
    attempts: RwLock<HashMap<String, ExitAttempt>>,
}

impl fmt::Debug for ExitOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExitOrchestrator")
            .field("quotes", &self.quotes)
            .field("settle_delay", &self.settle_delay)
            .finish_non_exhaustive()
    }
}

impl ExitOrchestrator {
    /// Creates an orchestrator with the default barrier settle delay.
    pub fn new(
        gateway: Arc<dyn VehicleGateway>,
        quotes: FeeQuoteClient,
        barrier: Arc<dyn BarrierActuator>,
        directory: Arc<VehicleDirectory>,
        shift: Arc<Shift>,
    ) -> Self {
        Self {
            gateway,
            quotes,
            barrier,
            directory,
            shift,
            settle_delay: DEFAULT_SETTLE_DELAY,
            in_flight: RwLock::new(HashSet::new()),
            attempts: RwLock::new(HashMap::new()),
        }
    }

    /// Sets the pause between barrier open and close.
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Shift the orchestrator credits.
    pub fn shift(&self) -> &Arc<Shift> {
        &self.shift
    }

    /// Most recent attempt for `plate`.
    pub async fn last_attempt(&self, plate: &str) -> Option<ExitAttempt> {
        self.attempts.read().await.get(plate.trim()).cloned()
    }

    // ========================================================================
    // In-flight tracking
    // ========================================================================

    async fn start_exit(&self, plate: &str) -> Result<(), ExitError> {
        let mut in_flight = self.in_flight.write().await;
        if !in_flight.insert(plate.to_string()) {
            return Err(ExitError::InProgress(plate.to_string()));
        }
        Ok(())
    }

    async fn end_exit(&self, plate: &str) {
        self.in_flight.write().await.remove(plate);
    }

    // ========================================================================
    // Exit flow
    // ========================================================================

    /// Records the exit, collects the final fee and cycles the barrier.
    ///
    /// # Errors
    ///
    /// Precondition failures ([`ExitError::NotFound`],
    /// [`ExitError::InvalidState`], [`ExitError::Validation`],
    /// [`ExitError::InProgress`]) happen before any side effect. After the
    /// provisional exit has been sent, a failure leaves the shift books as
    /// they were; [`ExitError::is_reconciliation_needed`] tells whether the
    /// remote record now needs a manual check.
    pub async fn open_barrier_and_settle(
        &self,
        request: ExitRequest,
    ) -> Result<ExitOutcome, ExitError> {
        let plate = request.plate.trim().to_string();
        self.start_exit(&plate).await?;

        let mut attempt = ExitAttempt::new(&plate);
        let result = self.run_exit(&request, &plate, &mut attempt).await;
        match &result {
            Ok(outcome) => {
                attempt.advance(ExitPhase::Completed);
                info!(plate = %plate, ?outcome, "Exit completed");
            }
            Err(e) => {
                attempt.fail(e);
                warn!(plate = %plate, error = %e, "Exit failed");
            }
        }

        self.attempts.write().await.insert(plate.clone(), attempt);
        self.end_exit(&plate).await;
        result
    }

    async fn run_exit(
        &self,
        request: &ExitRequest,
        plate: &str,
        attempt: &mut ExitAttempt,
    ) -> Result<ExitOutcome, ExitError> {
        let session = match self.directory.find_active_by_plate(plate).await {
            Some(session) => session,
            None => self
                .directory
                .find_by_plate(plate)
                .await
                .ok_or_else(|| ExitError::NotFound {
                    plate: plate.to_string(),
                })?,
        };
        let plate = validate_plate(plate)?;

        if self.shift.processed().has_processed(plate).await {
            info!(plate, "Already settled this shift");
            return Ok(ExitOutcome::AlreadySettled {
                plate: plate.to_string(),
            });
        }
        if !session.status.is_exitable() {
            return Err(ExitError::InvalidState {
                plate: plate.to_string(),
                status: session.status,
            });
        }
        let reason = request.reason.trim();
        if reason.is_empty() {
            return Err(CoreError::EmptyReason.into());
        }
        let channel_id = self.resolve_channel(request, &session)?;
        let barrier_label = request
            .barrier_label
            .clone()
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| session.parking_zone.clone());

        // Provisional exit
        let requested_at = Utc::now();
        self.gateway
            .update(plate, &VehicleUpdate::provisional_exit(reason, requested_at))
            .await?;
        attempt.advance(ExitPhase::ExitRequested);

        // Final fee
        attempt.advance(ExitPhase::FeePending);
        let ResolvedFee { fee, snapshot } = self
            .quotes
            .in_zone(&session.parking_zone)
            .retry_quote(plate, &channel_id)
            .await?;
        attempt.advance(ExitPhase::FeeResolved);

        if settled_elsewhere(&snapshot, requested_at) {
            warn!(plate, exit_time = ?snapshot.exit_time, "Vehicle was settled by someone else");
            self.shift.processed().mark_processed(plate).await?;
            self.directory.apply_patch(&session.id, &snapshot.to_patch()).await;
            return Ok(ExitOutcome::SettledElsewhere {
                plate: plate.to_string(),
                fee: Some(fee),
            });
        }

        // Payment
        self.gateway
            .update(plate, &VehicleUpdate::payment(fee, requested_at))
            .await?;
        let shift_total = match self.shift.settle(plate, fee).await? {
            Settlement::Settled { total, .. } => total,
            Settlement::AlreadyProcessed { .. } => {
                warn!(plate, "Plate settled concurrently; not credited twice");
                return Ok(ExitOutcome::AlreadySettled {
                    plate: plate.to_string(),
                });
            }
        };
        let patch = VehiclePatch::new()
            .with_status(VehicleStatus::Exited)
            .with_fee(Some(fee))
            .with_exit_time(Some(snapshot.exit_time.unwrap_or(requested_at)));
        self.directory.apply_patch(&session.id, &patch).await;
        attempt.advance(ExitPhase::PaymentRecorded);

        // Barrier
        attempt.advance(ExitPhase::BarrierOpening);
        let barrier = cycle_barrier(self.barrier.as_ref(), &channel_id, self.settle_delay).await;
        if !barrier.is_ok() {
            warn!(plate, channel_id = %channel_id, error = ?barrier.error, "Barrier cycle incomplete");
        }

        if let Err(e) = self.directory.refresh().await {
            warn!(error = %e, "Directory refresh after exit failed");
        }

        Ok(ExitOutcome::Settled {
            plate: plate.to_string(),
            fee,
            barrier_label,
            barrier,
            shift_total,
        })
    }

    fn resolve_channel(
        &self,
        request: &ExitRequest,
        session: &VehicleSession,
    ) -> Result<String, ExitError> {
        let requested = request
            .channel_id
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty());
        let channel = match requested {
            Some(channel) => Some(channel.to_string()),
            None => self
                .directory
                .channels()
                .resolve(session.channel_id.as_deref(), &session.parking_zone),
        };
        debug!(?channel, zone = %session.parking_zone, "Resolved barrier channel");
        channel.ok_or(ExitError::Validation(CoreError::MissingChannel))
    }
}

/// Returns true if the backend already holds an exit that predates ours.
fn settled_elsewhere(snapshot: &FeeSnapshot, requested_at: DateTime<Utc>) -> bool {
    snapshot.status == Some(VehicleStatus::Exited)
        && snapshot
            .exit_time
            .is_some_and(|exit| exit + EXIT_TIME_TOLERANCE < requested_at)
}
