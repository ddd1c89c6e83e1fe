//! Wires settings into a ready-to-use desk.

use std::sync::Arc;

use tracing::info;

use parkgate_core::VehicleFilter;
use parkgate_fetch::{
    BarrierActuator, BarrierClient, FeeQuoteClient, FeedConnection, FeedTransport, FetchError, HttpClient,
    ParkingApi, VehicleGateway, WsTransport,
};
use parkgate_store::{JsonFileStore, KeyValueStore, Settings, Shift, VehicleDirectory};

use crate::error::DeskError;
use crate::listener::NotificationListener;
use crate::notices::NoticeSender;
use crate::orchestrator::ExitOrchestrator;

/// Outside-world ports the desk talks to.
pub struct DeskPorts {
    /// Parking backend.
    pub gateway: Arc<dyn VehicleGateway>,
    /// Barrier controller.
    pub barrier: Arc<dyn BarrierActuator>,
    /// Push feed.
    pub feed: Arc<dyn FeedTransport>,
    /// Shift state storage.
    pub store: Arc<dyn KeyValueStore>,
}

impl DeskPorts {
    /// Real HTTP, websocket and file ports for `settings`.
    ///
    /// # Errors
    ///
    /// Returns [`DeskError::Fetch`] if a base URL is invalid or the HTTP
    /// client cannot be built.
    pub fn from_settings(settings: &Settings) -> Result<Self, DeskError> {
        let http = HttpClient::with_timeout(settings.request_timeout()).map_err(FetchError::from)?;
        let api = ParkingApi::new(http.clone(), settings.api_url.clone())?;
        let barrier = BarrierClient::new(
            http,
            settings.barrier_host.clone(),
            settings.barrier_username.clone(),
            settings.barrier_password.clone(),
        )?;
        Ok(Self {
            gateway: Arc::new(api),
            barrier: Arc::new(barrier),
            feed: Arc::new(WsTransport::new(&settings.feed_url)),
            store: Arc::new(JsonFileStore::new(settings.state_file())),
        })
    }
}

/// Everything the operator works with during a shift.
pub struct Desk {
    settings: Settings,
    feed: Arc<dyn FeedTransport>,
    directory: Arc<VehicleDirectory>,
    quotes: FeeQuoteClient,
    shift: Arc<Shift>,
    orchestrator: Arc<ExitOrchestrator>,
}

impl std::fmt::Debug for Desk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Desk")
            .field("operator", &self.settings.operator)
            .field("api_url", &self.settings.api_url)
            .finish_non_exhaustive()
    }
}

impl Desk {
    /// Builds a desk talking to the configured services.
    ///
    /// # Errors
    ///
    /// Returns [`DeskError::Config`] for unusable settings, or an error
    /// while building clients or loading shift state.
    pub async fn from_settings(settings: Settings) -> Result<Self, DeskError> {
        let ports = DeskPorts::from_settings(&settings)?;
        Self::assemble(settings, ports).await
    }

    /// Builds a desk on explicit ports.
    ///
    /// # Errors
    ///
    /// Returns [`DeskError::Config`] for unusable settings, or
    /// [`DeskError::Store`] if shift state cannot be loaded.
    pub async fn assemble(settings: Settings, ports: DeskPorts) -> Result<Self, DeskError> {
        settings
            .validate()
            .map_err(|e| DeskError::Config(e.to_string()))?;

        let operator = settings.operator.clone();
        let filter = VehicleFilter::new().with_limit(settings.page_limit);
        let directory = Arc::new(VehicleDirectory::with_filter(
            ports.gateway.clone(),
            operator.clone(),
            settings.channel_table(),
            filter,
        ));

        let quotes = FeeQuoteClient::new(
            ports.gateway.clone(),
            operator.assigned_zone().map(ToString::to_string),
        )
        .with_retry_strategy(settings.fee_retry.strategy());

        let shift = Arc::new(Shift::load(ports.store).await?);
        let orchestrator = Arc::new(
            ExitOrchestrator::new(
                ports.gateway,
                quotes.clone(),
                ports.barrier,
                directory.clone(),
                shift.clone(),
            )
            .with_settle_delay(settings.barrier_settle()),
        );

        info!(role = ?operator.role, zone = ?operator.zone, "Desk ready");
        Ok(Self {
            settings,
            feed: ports.feed,
            directory,
            quotes,
            shift,
            orchestrator,
        })
    }

    /// Active settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Vehicle directory.
    pub fn directory(&self) -> &Arc<VehicleDirectory> {
        &self.directory
    }

    /// Fee lookups scoped to the operator.
    pub fn quotes(&self) -> &FeeQuoteClient {
        &self.quotes
    }

    /// Shift books.
    pub fn shift(&self) -> &Arc<Shift> {
        &self.shift
    }

    /// Exit flow.
    pub fn orchestrator(&self) -> &Arc<ExitOrchestrator> {
        &self.orchestrator
    }

    /// A listener delivering notices to `notices`.
    pub fn listener(&self, notices: NoticeSender) -> Arc<NotificationListener> {
        Arc::new(NotificationListener::new(
            self.directory.clone(),
            self.quotes.clone(),
            notices,
        ))
    }

    /// A fresh feed connection with the configured reconnect policy.
    pub fn feed_connection(&self) -> FeedConnection {
        FeedConnection::new(self.feed.clone())
            .with_retry_strategy(self.settings.feed_reconnect.strategy())
    }
}
