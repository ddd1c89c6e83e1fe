//! Push-feed messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::serde_helpers;
use crate::models::vehicle::{VehicleId, VehiclePatch, VehicleStatus};

/// Literal payload asking clients to reload their list.
pub const REFRESH_SIGNAL: &str = "refresh";

/// A vehicle state change pushed by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleEvent {
    /// Event id; equal to the session id.
    pub id: VehicleId,
    /// Plate number.
    #[serde(rename = "car_number")]
    pub plate_number: String,
    /// Zone.
    #[serde(rename = "park_no", default, deserialize_with = "serde_helpers::non_empty")]
    pub parking_zone: Option<String>,
    /// Status.
    #[serde(default, deserialize_with = "serde_helpers::status")]
    pub status: Option<VehicleStatus>,
    /// Fee carried by the event.
    #[serde(rename = "total_payment", default, deserialize_with = "serde_helpers::fee")]
    pub fee: Option<f64>,
    /// Entry time.
    #[serde(rename = "start_time", default, deserialize_with = "serde_helpers::timestamp")]
    pub entry_time: Option<DateTime<Utc>>,
    /// Exit time.
    #[serde(rename = "end_time", default, deserialize_with = "serde_helpers::timestamp")]
    pub exit_time: Option<DateTime<Utc>>,
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

impl VehicleEvent {
    /// Patch applied to the directory when the event reports an exit.
    pub fn exit_patch(&self) -> VehiclePatch {
        VehiclePatch::new()
            .with_status(VehicleStatus::Exited)
            .with_fee(self.fee)
            .with_exit_time(self.exit_time)
    }
}

/// A parsed push-feed payload.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedMessage {
    /// Reload the directory.
    Refresh,
    /// Vehicle state change.
    Vehicle(VehicleEvent),
    /// Payload that could not be understood.
    Invalid(String),
}

impl FeedMessage {
    /// Parses one text frame.
    pub fn parse(text: &str) -> Self {
        let value: serde_json::Value = match serde_json::from_str(text) {
            Ok(value) => value,
            Err(_) if text.trim() == REFRESH_SIGNAL => return Self::Refresh,
            Err(e) => return Self::Invalid(format!("not JSON: {e}")),
        };

        if value.as_str() == Some(REFRESH_SIGNAL) {
            return Self::Refresh;
        }
        let Some(map) = value.as_object() else {
            return Self::Invalid(format!("unexpected payload: {value}"));
        };

        let has_id = map.get("id").is_some_and(|v| !v.is_null());
        let has_plate = map
            .get("car_number")
            .and_then(serde_json::Value::as_str)
            .is_some_and(|s| !s.trim().is_empty());
        if !has_id || !has_plate {
            return Self::Invalid("missing id or car_number".to_string());
        }

        match serde_json::from_value::<VehicleEvent>(value) {
            Ok(event) => Self::Vehicle(event),
            Err(e) => Self::Invalid(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_refresh_forms() {
        assert_eq!(FeedMessage::parse("\"refresh\""), FeedMessage::Refresh);
        assert_eq!(FeedMessage::parse("refresh"), FeedMessage::Refresh);
    }

    #[test]
    fn test_parse_vehicle_event() {
        let text = r#"{"id":1,"car_number":"AB1234AG","status":"Exited","total_payment":45,
            "park_no":"P3","end_time":"2025-03-01T10:15:00Z","ChannelId":null}"#;
        let FeedMessage::Vehicle(event) = FeedMessage::parse(text) else {
            panic!("expected vehicle event");
        };
        assert_eq!(event.id.as_str(), "1");
        assert_eq!(event.plate_number, "AB1234AG");
        assert_eq!(event.status, Some(VehicleStatus::Exited));
        assert_eq!(event.fee, Some(45.0));
        assert!(event.exit_time.is_some());
        assert!(event.channel_id.is_none());
    }

    #[test]
    fn test_parse_rejects_incomplete_events() {
        assert!(matches!(
            FeedMessage::parse(r#"{"id":1}"#),
            FeedMessage::Invalid(_)
        ));
        assert!(matches!(
            FeedMessage::parse(r#"{"id":null,"car_number":"AB1234AG"}"#),
            FeedMessage::Invalid(_)
        ));
        assert!(matches!(FeedMessage::parse("42"), FeedMessage::Invalid(_)));
        assert!(matches!(FeedMessage::parse("\"hello\""), FeedMessage::Invalid(_)));
    }

    #[test]
    fn test_exit_patch_keeps_unknown_fee_unset() {
        let text = r#"{"id":"7","car_number":"XY98765","status":"Exited","total_payment":null}"#;
        let FeedMessage::Vehicle(event) = FeedMessage::parse(text) else {
            panic!("expected vehicle event");
        };
        let patch = event.exit_patch();
        assert_eq!(patch.status, Some(VehicleStatus::Exited));
        assert_eq!(patch.fee, None);
    }
}
