//! Push-feed consumer.
//!
//! Turns feed frames into directory patches and payment prompts. The
//! listener never credits the shift; only the exit flow does.

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use parkgate_core::{FeedMessage, PatchOutcome, VehicleEvent, VehicleId, VehicleStatus};
use parkgate_fetch::{ConnectionState, FeeQuoteClient, FeedConnection, FeedEvent};
use parkgate_store::VehicleDirectory;

use crate::notices::{Notice, NoticeSender, PaymentPrompt, PromptSource};

/// Buffered feed events between the connection and the listener.
const FEED_BUFFER: usize = 64;

/// What the listener did with one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOutcome {
    /// Payload could not be parsed; dropped.
    Invalid,
    /// Directory reloaded.
    Refreshed,
    /// Directory reload failed.
    RefreshFailed,
    /// Same event id as the previous one; dropped.
    Duplicate,
    /// Event for a zone this operator does not see; dropped.
    OtherZone,
    /// Exit event merged into the directory.
    Patched(PatchOutcome),
    /// Payment prompt raised.
    Prompted(PromptSource),
    /// Pending event without a barrier channel.
    NoChannel,
    /// Accepted, nothing to do.
    Ignored,
}

// ============================================================================
// Listener
// ============================================================================

/// Applies push-feed messages to the directory and raises prompts.
pub struct NotificationListener {
    directory: Arc<VehicleDirectory>,
    quotes: FeeQuoteClient,
    notices: NoticeSender,
    last_event_id: Mutex<Option<VehicleId>>,
}

impl std::fmt::Debug for NotificationListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationListener")
            .field("operator", self.directory.operator())
            .finish_non_exhaustive()
    }
}

impl NotificationListener {
    /// Creates a listener scoped to the directory's operator.
    pub fn new(directory: Arc<VehicleDirectory>, quotes: FeeQuoteClient, notices: NoticeSender) -> Self {
        Self {
            directory,
            quotes,
            notices,
            last_event_id: Mutex::new(None),
        }
    }

    /// Id of the most recently accepted event.
    pub async fn last_event_id(&self) -> Option<VehicleId> {
        self.last_event_id.lock().await.clone()
    }

    /// Handles one feed event.
    pub async fn handle_feed_event(&self, event: FeedEvent) -> Option<MessageOutcome> {
        match event {
            FeedEvent::Connected => {
                self.notices.send(Notice::Connected);
                None
            }
            FeedEvent::Message(text) => Some(self.handle_message(&text).await),
            FeedEvent::Reconnecting { attempt, max } => {
                self.notices.send(Notice::Reconnecting { attempt, max });
                None
            }
            FeedEvent::Terminal { attempts } => {
                self.notices.send(Notice::ConnectionLost { attempts });
                None
            }
        }
    }

    /// Handles one text frame.
    pub async fn handle_message(&self, text: &str) -> MessageOutcome {
        match FeedMessage::parse(text) {
            FeedMessage::Invalid(reason) => {
                warn!(%reason, "Dropped invalid feed message");
                MessageOutcome::Invalid
            }
            FeedMessage::Refresh => self.refresh().await,
            FeedMessage::Vehicle(event) => self.handle_event(event).await,
        }
    }

    async fn refresh(&self) -> MessageOutcome {
        match self.directory.refresh().await {
            Ok(page) => {
                debug!(count = page.entries.len(), "Directory refreshed on request");
                MessageOutcome::Refreshed
            }
            Err(e) if e.is_auth_expired() => {
                self.notices.send(Notice::AuthExpired);
                MessageOutcome::RefreshFailed
            }
            Err(e) => {
                self.notices.send(Notice::error(format!("Failed to fetch cars: {e}")));
                MessageOutcome::RefreshFailed
            }
        }
    }

    async fn handle_event(&self, event: VehicleEvent) -> MessageOutcome {
        {
            let mut last = self.last_event_id.lock().await;
            if last.as_ref() == Some(&event.id) {
                debug!(id = %event.id, "Dropped duplicate event");
                return MessageOutcome::Duplicate;
            }
            *last = Some(event.id.clone());
        }

        let operator = self.directory.operator();
        if !operator.accepts_zone(event.parking_zone.as_deref()) {
            debug!(id = %event.id, zone = ?event.parking_zone, "Dropped event for another zone");
            return MessageOutcome::OtherZone;
        }

        info!(id = %event.id, plate = %event.plate_number, status = ?event.status, "Vehicle event");
        self.notices.send(Notice::activity(&event));

        match event.status {
            Some(VehicleStatus::Exited) => {
                let outcome = self.directory.apply_patch(&event.id, &event.exit_patch()).await;
                MessageOutcome::Patched(outcome)
            }
            Some(VehicleStatus::Pending) if operator.requires_payment_prompts() => {
                self.prompt_payment(&event).await
            }
            _ => MessageOutcome::Ignored,
        }
    }

    async fn prompt_payment(&self, event: &VehicleEvent) -> MessageOutcome {
        let zone = event
            .parking_zone
            .as_deref()
            .or_else(|| self.directory.operator().assigned_zone())
            .unwrap_or_default();

        let Some(channel_id) = self
            .directory
            .channels()
            .resolve(event.channel_id.as_deref(), zone)
        else {
            self.notices.send(Notice::warning(format!(
                "No channel ID available for parking zone {zone}"
            )));
            return MessageOutcome::NoChannel;
        };

        let prompt = match self
            .quotes
            .in_zone(zone)
            .quote_with_fallback(&event.plate_number, &channel_id)
            .await
        {
            Ok(snapshot) => PaymentPrompt::from_lookup(event, &snapshot, channel_id),
            Err(e) => {
                if e.is_auth_expired() {
                    self.notices.send(Notice::AuthExpired);
                } else {
                    self.notices
                        .send(Notice::error(format!("Failed to fetch car details: {e}")));
                }
                PaymentPrompt::from_event(event, channel_id)
            }
        };

        let source = prompt.source;
        self.notices.send(Notice::PaymentPrompt(prompt));
        MessageOutcome::Prompted(source)
    }

    // ========================================================================
    // Background task
    // ========================================================================

    /// Runs `connection` and feeds its events to this listener.
    pub fn spawn(self: Arc<Self>, connection: FeedConnection) -> ListenerHandle {
        let (events_tx, mut events_rx) = mpsc::channel(FEED_BUFFER);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let feed = tokio::spawn(async move {
            let mut connection = connection;
            connection.run(events_tx, shutdown_rx).await
        });

        let consumer = tokio::spawn(async move {
            while let Some(event) = events_rx.recv().await {
                self.handle_feed_event(event).await;
            }
            debug!("Feed consumer stopped");
        });

        info!("Notification listener started");
        ListenerHandle {
            shutdown: shutdown_tx,
            feed,
            consumer,
        }
    }
}

// ============================================================================
// Handle
// ============================================================================

/// Controls a spawned listener.
#[derive(Debug)]
pub struct ListenerHandle {
    shutdown: watch::Sender<bool>,
    feed: JoinHandle<ConnectionState>,
    consumer: JoinHandle<()>,
}

impl ListenerHandle {
    /// Asks the connection to close. Messages already received are still
    /// handled.
    pub fn stop(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Waits for both tasks and returns the final connection state.
    pub async fn join(self) -> ConnectionState {
        let state = match self.feed.await {
            Ok(state) => state,
            Err(e) => {
                warn!(error = %e, "Feed task failed");
                ConnectionState::Disconnected
            }
        };
        if let Err(e) = self.consumer.await {
            warn!(error = %e, "Feed consumer failed");
        }
        info!(%state, "Notification listener stopped");
        state
    }

    /// Stops the listener and waits for it.
    pub async fn shutdown(self) -> ConnectionState {
        self.stop();
        self.join().await
    }
}
