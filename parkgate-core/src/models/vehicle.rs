//! Vehicle session types.
//!
//! This module contains the central entity of the desk:
//! - [`VehicleSession`] - One parking visit, from entry to exit
//! - [`VehicleStatus`] - Forward-only lifecycle state
//! - [`VehiclePatch`] - Partial update merged by id
//! - [`FeeSnapshot`] - Server view returned by the fee lookup

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::CoreError;
use crate::models::fee::{PriceDisplay, price_display};

static PLATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z0-9]{5,8}$").expect("plate pattern is valid"));

/// Validates a plate number and returns its trimmed form.
///
/// # Errors
///
/// Returns [`CoreError::InvalidPlate`] if the trimmed plate does not match
/// `[A-Z0-9]{5,8}`.
pub fn validate_plate(plate: &str) -> Result<&str, CoreError> {
    let trimmed = plate.trim();
    if PLATE_PATTERN.is_match(trimmed) {
        Ok(trimmed)
    } else {
        Err(CoreError::InvalidPlate(plate.to_string()))
    }
}

/// Parses a backend timestamp.
///
/// Accepts RFC 3339 as well as naive `YYYY-MM-DD HH:MM:SS[.fff]` and
/// `YYYY-MM-DDTHH:MM:SS[.fff]` forms, which are read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

// ============================================================================
// Vehicle Id
// ============================================================================

/// Opaque session identifier assigned by the remote system.
///
/// The backend sends it either as a JSON number or a string; both forms
/// normalise to the same id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct VehicleId(String);

impl VehicleId {
    /// Creates an id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for VehicleId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(i64),
            Text(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Int(n) => Self(n.to_string()),
            Raw::Text(s) => Self(s),
        })
    }
}

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VehicleId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for VehicleId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<i64> for VehicleId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

// ============================================================================
// Vehicle Status
// ============================================================================

/// Lifecycle state of a session.
///
/// Moves forward only: `Inside → Pending → Exited` or `Inside → Exited`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum VehicleStatus {
    /// Vehicle is on the lot.
    #[default]
    Inside,
    /// Vehicle is at the exit waiting for payment.
    Pending,
    /// Vehicle has left.
    Exited,
}

impl VehicleStatus {
    /// Position in the lifecycle; higher is later.
    pub fn rank(self) -> u8 {
        match self {
            Self::Inside => 0,
            Self::Pending => 1,
            Self::Exited => 2,
        }
    }

    /// Returns true if moving to `next` does not go backwards.
    pub fn can_advance_to(self, next: VehicleStatus) -> bool {
        next.rank() >= self.rank()
    }

    /// Returns true if the barrier may be opened for a vehicle in this state.
    pub fn is_exitable(self) -> bool {
        matches!(self, Self::Inside | Self::Pending)
    }

    /// Wire name used by the backend.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inside => "Inside",
            Self::Pending => "Pending",
            Self::Exited => "Exited",
        }
    }

    /// Parses the backend's status string, returning `None` for unknown values.
    pub fn from_wire(raw: &str) -> Option<Self> {
        raw.parse().ok()
    }

    /// All statuses in lifecycle order.
    pub fn all() -> &'static [VehicleStatus] {
        &[Self::Inside, Self::Pending, Self::Exited]
    }
}

impl fmt::Display for VehicleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VehicleStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inside" => Ok(Self::Inside),
            "pending" => Ok(Self::Pending),
            "exited" => Ok(Self::Exited),
            other => Err(CoreError::InvalidData(format!("unknown vehicle status: {other}"))),
        }
    }
}

// ============================================================================
// Vehicle Session
// ============================================================================

/// One parking visit of a vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleSession {
    /// Remote identifier.
    pub id: VehicleId,
    /// Plate number.
    pub plate_number: String,
    /// Lot/zone identifier.
    pub parking_zone: String,
    /// Barrier channel controlling this zone.
    pub channel_id: Option<String>,
    /// Camera that captured the vehicle.
    pub camera_id: Option<String>,
    /// When the vehicle entered.
    pub entry_time: Option<DateTime<Utc>>,
    /// When the vehicle left. Unset while inside.
    pub exit_time: Option<DateTime<Utc>>,
    /// Lifecycle state.
    pub status: VehicleStatus,
    /// Computed fee. `None` means not yet computed; zero is a valid fee.
    pub fee: Option<f64>,
    /// Captured photo.
    pub image_url: Option<String>,
}

impl VehicleSession {
    /// Creates an `Inside` session with no fee.
    pub fn new(
        id: impl Into<VehicleId>,
        plate_number: impl Into<String>,
        parking_zone: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            plate_number: plate_number.into(),
            parking_zone: parking_zone.into(),
            channel_id: None,
            camera_id: None,
            entry_time: None,
            exit_time: None,
            status: VehicleStatus::Inside,
            fee: None,
            image_url: None,
        }
    }

    /// Sets the status.
    pub fn with_status(mut self, status: VehicleStatus) -> Self {
        self.status = status;
        self
    }

    /// Sets the fee.
    pub fn with_fee(mut self, fee: f64) -> Self {
        self.fee = Some(fee);
        self
    }

    /// Sets the barrier channel.
    pub fn with_channel(mut self, channel_id: impl Into<String>) -> Self {
        self.channel_id = Some(channel_id.into());
        self
    }

    /// Returns the price as the operator should see it.
    pub fn price(&self) -> PriceDisplay {
        price_display(self.fee, self.status)
    }

    /// Merges a patch into this session.
    ///
    /// A patch whose status would move the session backwards is rejected as
    /// a whole and leaves the session untouched.
    pub fn apply(&mut self, patch: &VehiclePatch) -> PatchOutcome {
        if let Some(next) = patch.status {
            if !self.status.can_advance_to(next) {
                return PatchOutcome::Regressed {
                    from: self.status,
                    to: next,
                };
            }
            self.status = next;
        }
        if let Some(fee) = patch.fee {
            self.fee = Some(fee);
        }
        if let Some(entry) = patch.entry_time {
            self.entry_time = Some(entry);
        }
        if let Some(exit) = patch.exit_time {
            self.exit_time = Some(exit);
        }
        if let Some(url) = &patch.image_url {
            self.image_url = Some(url.clone());
        }
        if let Some(zone) = &patch.parking_zone {
            self.parking_zone.clone_from(zone);
        }
        if let Some(channel) = &patch.channel_id {
            self.channel_id = Some(channel.clone());
        }
        if let Some(camera) = &patch.camera_id {
            self.camera_id = Some(camera.clone());
        }
        PatchOutcome::Applied
    }
}

// ============================================================================
// Patches
// ============================================================================

/// Partial update of a session. Only `Some` fields are written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VehiclePatch {
    /// New status.
    pub status: Option<VehicleStatus>,
    /// New fee.
    pub fee: Option<f64>,
    /// New entry time.
    pub entry_time: Option<DateTime<Utc>>,
    /// New exit time.
    pub exit_time: Option<DateTime<Utc>>,
    /// New photo reference.
    pub image_url: Option<String>,
    /// New zone.
    pub parking_zone: Option<String>,
    /// New barrier channel.
    pub channel_id: Option<String>,
    /// New camera id.
    pub camera_id: Option<String>,
}

impl VehiclePatch {
    /// Creates an empty patch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the status.
    pub fn with_status(mut self, status: VehicleStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Sets the fee, leaving it untouched when `fee` is `None`.
    pub fn with_fee(mut self, fee: Option<f64>) -> Self {
        self.fee = fee;
        self
    }

    /// Sets the exit time, leaving it untouched when `exit` is `None`.
    pub fn with_exit_time(mut self, exit: Option<DateTime<Utc>>) -> Self {
        self.exit_time = exit;
        self
    }

    /// Returns true if the patch writes nothing.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Result of merging a patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    /// Patch merged.
    Applied,
    /// Patch would have moved the status backwards and was ignored.
    Regressed {
        /// Current status.
        from: VehicleStatus,
        /// Status the patch asked for.
        to: VehicleStatus,
    },
    /// No entry with that id on the current page.
    Missing,
}

impl PatchOutcome {
    /// Returns true if the patch was merged.
    pub fn is_applied(self) -> bool {
        self == Self::Applied
    }
}

// ============================================================================
// Fee Snapshot
// ============================================================================

/// The server's view of one vehicle, as returned by the fee lookup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeeSnapshot {
    /// Computed fee, `None` while the backend cannot compute it yet.
    pub fee: Option<f64>,
    /// Status as reported by the backend.
    pub status: Option<VehicleStatus>,
    /// Entry time.
    pub entry_time: Option<DateTime<Utc>>,
    /// Exit time.
    pub exit_time: Option<DateTime<Utc>>,
    /// Photo reference.
    pub image_url: Option<String>,
    /// Zone.
    pub parking_zone: Option<String>,
    /// Barrier channel.
    pub channel_id: Option<String>,
    /// Camera id.
    pub camera_id: Option<String>,
}

impl FeeSnapshot {
    /// Returns true once the backend has computed a fee.
    pub fn has_fee(&self) -> bool {
        self.fee.is_some()
    }

    /// Converts the snapshot into a patch for the matching session.
    pub fn to_patch(&self) -> VehiclePatch {
        VehiclePatch {
            status: self.status,
            fee: self.fee,
            entry_time: self.entry_time,
            exit_time: self.exit_time,
            image_url: self.image_url.clone(),
            parking_zone: self.parking_zone.clone(),
            channel_id: self.channel_id.clone(),
            camera_id: self.camera_id.clone(),
        }
    }
}
