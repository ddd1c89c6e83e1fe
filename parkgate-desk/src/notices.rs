//! Operator-facing notices.
//!
//! The listener and the desk surface everything the operator should see
//! (payment prompts, connectivity, failures) as [`Notice`] values on an
//! unbounded channel. Presentation decides how to render them.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use parkgate_core::{FeeSnapshot, PriceDisplay, VehicleEvent, VehicleId, VehicleStatus, price_display};

/// Severity used for logging and rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    /// Informational.
    Info,
    /// Needs attention.
    Warning,
    /// Something failed.
    Error,
}

/// Where the amount on a payment prompt came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptSource {
    /// Fresh fee lookup.
    Lookup,
    /// The push event itself; the lookup failed.
    Event,
}

/// Ask the operator to collect a payment.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPrompt {
    /// Session id.
    pub id: VehicleId,
    /// Plate.
    pub plate_number: String,
    /// Zone.
    pub parking_zone: Option<String>,
    /// Status shown on the prompt.
    pub status: VehicleStatus,
    /// Fee, `None` when not computed.
    pub fee: Option<f64>,
    /// How to render the fee.
    pub price: PriceDisplay,
    /// Entry time.
    pub entry_time: Option<DateTime<Utc>>,
    /// Exit time.
    pub exit_time: Option<DateTime<Utc>>,
    /// Photo reference.
    pub image_url: Option<String>,
    /// Barrier channel to open once paid.
    pub channel_id: String,
    /// Camera id.
    pub camera_id: Option<String>,
    /// Origin of the fee.
    pub source: PromptSource,
}

impl PaymentPrompt {
    /// Builds a prompt, preferring snapshot fields over the event's.
    pub fn from_lookup(event: &VehicleEvent, snapshot: &FeeSnapshot, channel_id: String) -> Self {
        let status = snapshot
            .status
            .or(event.status)
            .unwrap_or(VehicleStatus::Pending);
        let fee = snapshot.fee.or(event.fee);
        Self {
            id: event.id.clone(),
            plate_number: event.plate_number.clone(),
            parking_zone: snapshot.parking_zone.clone().or_else(|| event.parking_zone.clone()),
            status,
            fee,
            price: price_display(fee, status),
            entry_time: snapshot.entry_time.or(event.entry_time),
            exit_time: snapshot.exit_time.or(event.exit_time),
            image_url: snapshot.image_url.clone().or_else(|| event.image_url.clone()),
            channel_id,
            camera_id: snapshot.camera_id.clone().or_else(|| event.camera_id.clone()),
            source: PromptSource::Lookup,
        }
    }

    /// Builds a prompt from the event alone.
    pub fn from_event(event: &VehicleEvent, channel_id: String) -> Self {
        let status = event.status.unwrap_or(VehicleStatus::Pending);
        Self {
            id: event.id.clone(),
            plate_number: event.plate_number.clone(),
            parking_zone: event.parking_zone.clone(),
            status,
            fee: event.fee,
            price: price_display(event.fee, status),
            entry_time: event.entry_time,
            exit_time: event.exit_time,
            image_url: event.image_url.clone(),
            channel_id,
            camera_id: event.camera_id.clone(),
            source: PromptSource::Event,
        }
    }
}

/// Something the operator should see.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    /// Collect a payment.
    PaymentPrompt(PaymentPrompt),
    /// A vehicle event was accepted.
    VehicleActivity {
        /// Plate.
        plate: String,
        /// Zone.
        zone: Option<String>,
        /// Reported status.
        status: Option<VehicleStatus>,
        /// How to render the reported fee.
        price: PriceDisplay,
    },
    /// Plain information.
    Info {
        /// Text.
        message: String,
    },
    /// Needs attention.
    Warning {
        /// Text.
        message: String,
    },
    /// Something failed.
    Error {
        /// Text.
        message: String,
    },
    /// Push feed connected.
    Connected,
    /// Push feed dropped; reconnect scheduled.
    Reconnecting {
        /// Reconnect number.
        attempt: u32,
        /// Reconnect budget.
        max: u32,
    },
    /// Push feed gave up.
    ConnectionLost {
        /// Reconnects made.
        attempts: u32,
    },
    /// The session expired; log in again.
    AuthExpired,
}

impl Notice {
    /// Information notice.
    pub fn info(message: impl Into<String>) -> Self {
        Self::Info {
            message: message.into(),
        }
    }

    /// Warning notice.
    pub fn warning(message: impl Into<String>) -> Self {
        Self::Warning {
            message: message.into(),
        }
    }

    /// Error notice.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Activity notice for an accepted event.
    pub fn activity(event: &VehicleEvent) -> Self {
        let status = event.status.unwrap_or(VehicleStatus::Inside);
        Self::VehicleActivity {
            plate: event.plate_number.clone(),
            zone: event.parking_zone.clone(),
            status: event.status,
            price: price_display(event.fee, status),
        }
    }

    /// Severity of this notice.
    pub fn level(&self) -> NoticeLevel {
        match self {
            Self::Warning { .. } | Self::Reconnecting { .. } => NoticeLevel::Warning,
            Self::Error { .. } | Self::ConnectionLost { .. } | Self::AuthExpired => NoticeLevel::Error,
            _ => NoticeLevel::Info,
        }
    }

    /// One-line text rendering.
    pub fn summary(&self) -> String {
        match self {
            Self::PaymentPrompt(p) => format!(
                "Payment required: {} ({}) channel {}",
                p.plate_number, p.price, p.channel_id
            ),
            Self::VehicleActivity {
                plate,
                zone,
                status,
                price,
            } => {
                let status = status.map_or_else(|| "unknown".to_string(), |s| s.to_string());
                let zone = zone.as_deref().unwrap_or("-");
                format!("{plate} [{zone}] {status}: {price}")
            }
            Self::Info { message } | Self::Warning { message } | Self::Error { message } => {
                message.clone()
            }
            Self::Connected => "Live updates connected".to_string(),
            Self::Reconnecting { attempt, max } => {
                format!("Connection lost, reconnecting ({attempt}/{max})")
            }
            Self::ConnectionLost { attempts } => format!(
                "Live updates stopped after {attempts} reconnect attempts. Restart to try again"
            ),
            Self::AuthExpired => "Session expired. Please log in again.".to_string(),
        }
    }
}

// ============================================================================
// Channel
// ============================================================================

/// Sending half of the notice channel.
#[derive(Debug, Clone)]
pub struct NoticeSender {
    tx: mpsc::UnboundedSender<Notice>,
}

/// Receiving half of the notice channel.
pub type NoticeReceiver = mpsc::UnboundedReceiver<Notice>;

/// Creates a notice channel.
pub fn notice_channel() -> (NoticeSender, NoticeReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (NoticeSender { tx }, rx)
}

impl NoticeSender {
    /// Logs and delivers a notice. A closed receiver is not an error.
    pub fn send(&self, notice: Notice) {
        match notice.level() {
            NoticeLevel::Info => info!(notice = %notice.summary(), "Notice"),
            NoticeLevel::Warning => warn!(notice = %notice.summary(), "Notice"),
            NoticeLevel::Error => error!(notice = %notice.summary(), "Notice"),
        }
        if self.tx.send(notice).is_err() {
            debug!("Notice receiver dropped");
        }
    }
}
