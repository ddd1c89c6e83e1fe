//! Request and response bodies of the parking backend.
//!
//! These types mirror the JSON the backend speaks and convert into the
//! core models at the edge.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use parkgate_core::models::serde_helpers;
use parkgate_core::{FeeSnapshot, VehicleId, VehicleSession, VehicleStatus};

/// Description sent with every fee lookup.
pub const LOOKUP_DESCRIPTION: &str = "Fetch car details";

// ============================================================================
// Search
// ============================================================================

/// Body of `GET /searchcar`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResponse {
    /// Page of records; absent when nothing matched.
    #[serde(default)]
    pub cars: Option<Vec<CarRecord>>,
    /// Total matches across all pages.
    #[serde(default)]
    pub total: Option<u64>,
    /// Page count, when the backend computes it.
    #[serde(rename = "totalPages", default)]
    pub total_pages: Option<u32>,
}

/// One vehicle record as the backend stores it.
#[derive(Debug, Clone, Deserialize)]
pub struct CarRecord {
    /// Record id.
    pub id: VehicleId,
    /// Plate number.
    #[serde(default)]
    pub car_number: String,
    /// Zone.
    #[serde(default, deserialize_with = "serde_helpers::non_empty")]
    pub park_no: Option<String>,
    /// Entry time.
    #[serde(default, deserialize_with = "serde_helpers::timestamp")]
    pub start_time: Option<DateTime<Utc>>,
    /// Exit time.
    #[serde(default, deserialize_with = "serde_helpers::timestamp")]
    pub end_time: Option<DateTime<Utc>>,
    /// Fee.
    #[serde(default, deserialize_with = "serde_helpers::fee")]
    pub total_payment: Option<f64>,
    /// Status.
    #[serde(default, deserialize_with = "serde_helpers::status")]
    pub status: Option<VehicleStatus>,
    /// Photo reference.
    #[serde(default, deserialize_with = "serde_helpers::non_empty")]
    pub image_url: Option<String>,
    /// Barrier channel.
    #[serde(rename = "ChannelId", default, deserialize_with = "serde_helpers::non_empty")]
    pub channel_id: Option<String>,
    /// Camera id.
    #[serde(rename = "cameraid", default, deserialize_with = "serde_helpers::non_empty")]
    pub camera_id: Option<String>,
}

impl CarRecord {
    /// Converts the record into a session.
    ///
    /// Records without a recognisable status are treated as `Inside`.
    pub fn into_session(self) -> VehicleSession {
        VehicleSession {
            id: self.id,
            plate_number: self.car_number.trim().to_string(),
            parking_zone: self.park_no.unwrap_or_default(),
            channel_id: self.channel_id,
            camera_id: self.camera_id,
            entry_time: self.start_time,
            exit_time: self.end_time,
            status: self.status.unwrap_or_default(),
            fee: self.total_payment,
            image_url: self.image_url,
        }
    }
}

// ============================================================================
// Fee Lookup
// ============================================================================

/// Body of `PUT /camera/getdata`.
#[derive(Debug, Clone, Serialize)]
pub struct LookupRequest {
    /// Plate number.
    #[serde(rename = "EventComment")]
    pub event_comment: String,
    /// Operator zone.
    #[serde(rename = "ChannelName")]
    pub channel_name: String,
    /// Barrier channel.
    #[serde(rename = "ChannelId")]
    pub channel_id: String,
    /// Fixed description.
    #[serde(rename = "EventDescription")]
    pub event_description: &'static str,
    /// Client-generated event id.
    #[serde(rename = "EventId")]
    pub event_id: String,
    /// When the lookup was made.
    pub captured_time: DateTime<Utc>,
}

impl LookupRequest {
    /// Builds a lookup captured at `now`.
    pub fn new(plate: &str, zone: &str, channel_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            event_comment: plate.to_string(),
            channel_name: zone.to_string(),
            channel_id: channel_id.to_string(),
            event_description: LOOKUP_DESCRIPTION,
            event_id: format!("EVT-{}", now.timestamp_millis()),
            captured_time: now,
        }
    }
}

/// Record returned by the fee lookup.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SnapshotRecord {
    /// Fee.
    #[serde(default, deserialize_with = "serde_helpers::fee")]
    pub total_payment: Option<f64>,
    /// Status.
    #[serde(default, deserialize_with = "serde_helpers::status")]
    pub status: Option<VehicleStatus>,
    /// Entry time.
    #[serde(default, deserialize_with = "serde_helpers::timestamp")]
    pub start_time: Option<DateTime<Utc>>,
    /// Exit time.
    #[serde(default, deserialize_with = "serde_helpers::timestamp")]
    pub end_time: Option<DateTime<Utc>>,
    /// Photo reference.
    #[serde(default, deserialize_with = "serde_helpers::non_empty")]
    pub image_url: Option<String>,
    /// Zone.
    #[serde(default, deserialize_with = "serde_helpers::non_empty")]
    pub park_no: Option<String>,
    /// Barrier channel.
    #[serde(rename = "ChannelId", default, deserialize_with = "serde_helpers::non_empty")]
    pub channel_id: Option<String>,
    /// Camera id.
    #[serde(rename = "cameraid", default, deserialize_with = "serde_helpers::non_empty")]
    pub camera_id: Option<String>,
}

impl From<SnapshotRecord> for FeeSnapshot {
    fn from(record: SnapshotRecord) -> Self {
        Self {
            fee: record.total_payment,
            status: record.status,
            entry_time: record.start_time,
            exit_time: record.end_time,
            image_url: record.image_url,
            parking_zone: record.park_no,
            channel_id: record.channel_id,
            camera_id: record.camera_id,
        }
    }
}

/// Body returned by the fee lookup: the record sits under `car` or `data`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LookupResponse {
    /// Primary location.
    #[serde(default)]
    pub car: Option<SnapshotRecord>,
    /// Legacy location.
    #[serde(default)]
    pub data: Option<SnapshotRecord>,
}

impl LookupResponse {
    /// Returns the record, preferring `car`.
    pub fn into_record(self) -> Option<SnapshotRecord> {
        self.car.or(self.data)
    }
}

// ============================================================================
// Update
// ============================================================================

/// Body of `PUT /camera/updatecar/{plate}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleUpdate {
    /// Free-text reason.
    pub reason: String,
    /// Fee being recorded.
    pub total_payment: f64,
    /// Exit time.
    pub end_time: DateTime<Utc>,
    /// New status.
    pub status: VehicleStatus,
    /// Marks the payment as collected; omitted when absent.
    #[serde(rename = "paystatus", skip_serializing_if = "Option::is_none")]
    pub paid: Option<bool>,
}

impl VehicleUpdate {
    /// Provisional exit: zero fee, no payment flag.
    pub fn provisional_exit(reason: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            reason: reason.into(),
            total_payment: 0.0,
            end_time: at,
            status: VehicleStatus::Exited,
            paid: None,
        }
    }

    /// Final payment record for a resolved fee.
    pub fn payment(fee: f64, at: DateTime<Utc>) -> Self {
        Self {
            reason: "paid".to_string(),
            total_payment: fee,
            end_time: at,
            status: VehicleStatus::Exited,
            paid: Some(true),
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Error body some endpoints return.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    /// Human-readable message.
    #[serde(default)]
    pub message: Option<String>,
}
