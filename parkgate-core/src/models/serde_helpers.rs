//! Lenient deserializers for backend payloads.
//!
//! The backend is loose about types: fees arrive as numbers, numeric
//! strings or null, and timestamps as RFC 3339 or naive strings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

use crate::models::vehicle::{VehicleStatus, parse_timestamp};

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(f64),
    Text(String),
}

/// Reads a fee that may be a number, a numeric string or null.
pub fn fee<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    Ok(match Option::<NumberOrText>::deserialize(deserializer)? {
        Some(NumberOrText::Number(n)) => Some(n),
        Some(NumberOrText::Text(s)) => s.trim().parse().ok(),
        None => None,
    })
}

/// Reads an optional timestamp, treating unparseable values as absent.
pub fn timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?
        .as_deref()
        .and_then(parse_timestamp))
}

/// Reads an optional status, treating unknown values as absent.
pub fn status<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<VehicleStatus>, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?
        .as_deref()
        .and_then(VehicleStatus::from_wire))
}

/// Reads an optional string, treating blank values as absent.
pub fn non_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<NumberOrText>::deserialize(deserializer)?
        .map(|v| match v {
            NumberOrText::Number(n) => n.to_string(),
            NumberOrText::Text(s) => s.trim().to_string(),
        })
        .filter(|s| !s.is_empty()))
}
