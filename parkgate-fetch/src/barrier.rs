//! Barrier controller client.
//!
//! The controller exposes one command endpoint; opening and closing are
//! external events fired at a channel.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use url::Url;

use parkgate_core::CoreError;

use crate::api::check_status;
use crate::error::{FetchError, HttpError};
use crate::host::http::{HttpClient, join_url};

/// Pause between opening and closing the barrier.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Barrier command sent to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarrierCommand {
    /// Raise the barrier.
    Open,
    /// Lower the barrier.
    Close,
}

impl BarrierCommand {
    /// Controller system name for the command.
    pub fn system_name(self) -> &'static str {
        match self {
            Self::Open => "openBarrier",
            Self::Close => "closeBarrier",
        }
    }
}

// ============================================================================
// Actuator Trait
// ============================================================================

/// Something that can raise and lower a barrier.
#[async_trait]
pub trait BarrierActuator: Send + Sync {
    /// Raises the barrier on `channel_id`.
    async fn open(&self, channel_id: &str) -> Result<(), FetchError>;

    /// Lowers the barrier on `channel_id`.
    async fn close(&self, channel_id: &str) -> Result<(), FetchError>;
}

// ============================================================================
// HTTP Implementation
// ============================================================================

/// HTTP client for the barrier controller.
#[derive(Clone)]
pub struct BarrierClient {
    http: HttpClient,
    host: String,
    username: String,
    password: String,
}

impl std::fmt::Debug for BarrierClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BarrierClient")
            .field("host", &self.host)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl BarrierClient {
    /// Creates a client for the controller at `host`.
    pub fn new(
        http: HttpClient,
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, FetchError> {
        let host = host.into();
        join_url(&host, "command")?;
        Ok(Self {
            http,
            host,
            username: username.into(),
            password: password.into(),
        })
    }

    /// Builds the command URL for `channel_id`.
    pub fn command_url(&self, channel_id: &str, command: BarrierCommand) -> Result<Url, FetchError> {
        let channel_id = channel_id.trim();
        if channel_id.is_empty() {
            return Err(CoreError::MissingChannel.into());
        }
        let base = join_url(&self.host, "command")?;
        Url::parse_with_params(
            &base,
            &[
                ("type", "generateexternalevent"),
                ("channelid", channel_id),
                ("systemname", command.system_name()),
                ("responsetype", "json"),
            ],
        )
        .map_err(|e| FetchError::from(HttpError::InvalidUrl(e.to_string())))
    }

    #[instrument(skip(self))]
    async fn send(&self, channel_id: &str, command: BarrierCommand) -> Result<(), FetchError> {
        let url = self.command_url(channel_id, command)?;
        let response = self
            .http
            .post_with_basic_auth(url.as_str(), &self.username, &self.password)
            .await?;
        let response = check_status(response).await?;

        match response.json::<serde_json::Value>().await {
            Ok(body) => debug!(%body, "Barrier command accepted"),
            Err(_) => debug!("Barrier command accepted without JSON body"),
        }
        Ok(())
    }
}

#[async_trait]
impl BarrierActuator for BarrierClient {
    async fn open(&self, channel_id: &str) -> Result<(), FetchError> {
        self.send(channel_id, BarrierCommand::Open).await
    }

    async fn close(&self, channel_id: &str) -> Result<(), FetchError> {
        self.send(channel_id, BarrierCommand::Close).await
    }
}

// ============================================================================
// Open / Close Cycle
// ============================================================================

/// What happened to the barrier during one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BarrierReport {
    /// The open command succeeded.
    pub opened: bool,
    /// The close command succeeded.
    pub closed: bool,
    /// First failure, if any.
    pub error: Option<String>,
}

impl BarrierReport {
    /// Returns true if both commands went through.
    pub fn is_ok(&self) -> bool {
        self.opened && self.closed
    }
}

/// Opens the barrier, waits `settle`, then closes it.
///
/// Failures are reported, never returned. Close is skipped when open fails.
pub async fn cycle_barrier(
    actuator: &dyn BarrierActuator,
    channel_id: &str,
    settle: Duration,
) -> BarrierReport {
    let mut report = BarrierReport::default();

    if let Err(e) = actuator.open(channel_id).await {
        warn!(channel_id, error = %e, "Failed to open barrier");
        report.error = Some(e.to_string());
        return report;
    }
    report.opened = true;
    info!(channel_id, "Barrier opened");

    tokio::time::sleep(settle).await;

    match actuator.close(channel_id).await {
        Ok(()) => {
            report.closed = true;
            info!(channel_id, "Barrier closed");
        }
        Err(e) => {
            warn!(channel_id, error = %e, "Failed to close barrier");
            report.error = Some(e.to_string());
        }
    }
    report
}
