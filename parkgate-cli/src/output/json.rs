//! JSON output formatting.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use parkgate_desk::{Notice, NoticeLevel};

// ============================================================================
// Output Types
// ============================================================================

/// One line of `watch --format json` output.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoticeOutput<'a> {
    #[serde(serialize_with = "serialize_datetime")]
    pub received_at: DateTime<Utc>,
    pub level: NoticeLevel,
    pub notice: &'a Notice,
}

fn serialize_datetime<S>(dt: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    s.serialize_str(&dt.to_rfc3339())
}

// ============================================================================
// JSON Formatter
// ============================================================================

/// JSON output formatter.
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    /// Creates a new JSON formatter.
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    /// Formats any serializable value.
    pub fn format<T: Serialize>(&self, data: &T) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(data)?
        } else {
            serde_json::to_string(data)?
        };
        Ok(json)
    }

    /// Formats a notice stamped with the time it was received.
    pub fn format_notice(&self, notice: &Notice, received_at: DateTime<Utc>) -> Result<String> {
        self.format(&NoticeOutput {
            received_at,
            level: notice.level(),
            notice,
        })
    }
}
