//! Push-feed connection manager.
//!
//! Keeps one websocket to the backend's notification endpoint alive and
//! forwards its text frames. Reconnects are bounded: after the configured
//! number of failed attempts the manager goes [`ConnectionState::Terminal`]
//! and stays there until it is started again.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use crate::error::FeedError;
use crate::retry::RetryStrategy;

/// Path of the notification endpoint.
pub const FEED_PATH: &str = "ws/notification";

/// Stream of text frames from one connection.
pub type FeedStream = BoxStream<'static, Result<String, FeedError>>;

// ============================================================================
// Transport
// ============================================================================

/// Opens connections to the push feed.
#[async_trait]
pub trait FeedTransport: Send + Sync {
    /// Connects and returns the frame stream. The stream ends when the
    /// connection closes.
    async fn connect(&self) -> Result<FeedStream, FeedError>;
}

/// Websocket transport.
#[derive(Debug, Clone)]
pub struct WsTransport {
    url: String,
}

impl WsTransport {
    /// Creates a transport for `{base_url}/ws/notification`.
    pub fn new(base_url: &str) -> Self {
        Self {
            url: format!("{}/{FEED_PATH}", base_url.trim_end_matches('/')),
        }
    }

    /// Full websocket URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl FeedTransport for WsTransport {
    async fn connect(&self) -> Result<FeedStream, FeedError> {
        let (ws_stream, _) = connect_async(self.url.as_str())
            .await
            .map_err(|e| FeedError::Connect(e.to_string()))?;
        debug!(url = %self.url, "WebSocket handshake complete");

        let frames = ws_stream.filter_map(|msg| async move {
            match msg {
                Ok(Message::Text(text)) => Some(Ok(text)),
                Ok(Message::Binary(bytes)) => String::from_utf8(bytes).ok().map(Ok),
                Ok(_) => None,
                Err(e) => Some(Err(FeedError::Protocol(e.to_string()))),
            }
        });
        Ok(frames.boxed())
    }
}

// ============================================================================
// Connection State Machine
// ============================================================================

/// Connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Not connected and not trying.
    #[default]
    Disconnected,
    /// Handshake in progress.
    Connecting,
    /// Receiving frames.
    Connected,
    /// Waiting before the next reconnect.
    Backoff,
    /// Reconnect budget spent; stopped until restarted.
    Terminal,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Backoff => "backoff",
            Self::Terminal => "terminal",
        };
        f.write_str(name)
    }
}

/// What the manager reports to its consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
    /// A connection was established.
    Connected,
    /// One text frame.
    Message(String),
    /// The connection dropped; reconnect `attempt` of `max` is scheduled.
    Reconnecting {
        /// Reconnect number, starting at 1.
        attempt: u32,
        /// Reconnect budget.
        max: u32,
    },
    /// The budget is spent; no further reconnects.
    Terminal {
        /// Reconnects made.
        attempts: u32,
    },
}

/// Drives one push-feed connection with bounded reconnects.
pub struct FeedConnection {
    transport: Arc<dyn FeedTransport>,
    retry: RetryStrategy,
    state: ConnectionState,
    attempts: u32,
}

impl fmt::Debug for FeedConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeedConnection")
            .field("state", &self.state)
            .field("attempts", &self.attempts)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl FeedConnection {
    /// Creates a manager with the default reconnect policy.
    pub fn new(transport: Arc<dyn FeedTransport>) -> Self {
        Self {
            transport,
            retry: RetryStrategy::feed_reconnect(),
            state: ConnectionState::Disconnected,
            attempts: 0,
        }
    }

    /// Sets the reconnect policy.
    pub fn with_retry_strategy(mut self, retry: RetryStrategy) -> Self {
        self.retry = retry;
        self
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Reconnects made since the last successful connect.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    fn transition(&mut self, next: ConnectionState) {
        if self.state != next {
            debug!(from = %self.state, to = %next, attempts = self.attempts, "Feed state change");
            self.state = next;
        }
    }

    /// Runs until shutdown, terminal failure, or the consumer goes away.
    ///
    /// Setting `shutdown` to `true` (or dropping its sender) closes the
    /// connection and cancels any pending reconnect.
    pub async fn run(
        &mut self,
        events: mpsc::Sender<FeedEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) -> ConnectionState {
        loop {
            if *shutdown.borrow() {
                self.transition(ConnectionState::Disconnected);
                return self.state;
            }

            self.transition(ConnectionState::Connecting);
            let connected = tokio::select! {
                result = self.transport.connect() => result,
                _ = shutdown.changed() => {
                    self.transition(ConnectionState::Disconnected);
                    return self.state;
                }
            };

            match connected {
                Ok(mut stream) => {
                    self.attempts = 0;
                    self.transition(ConnectionState::Connected);
                    info!("Push feed connected");
                    if events.send(FeedEvent::Connected).await.is_err() {
                        self.transition(ConnectionState::Disconnected);
                        return self.state;
                    }

                    loop {
                        tokio::select! {
                            frame = stream.next() => match frame {
                                Some(Ok(text)) => {
                                    if events.send(FeedEvent::Message(text)).await.is_err() {
                                        self.transition(ConnectionState::Disconnected);
                                        return self.state;
                                    }
                                }
                                Some(Err(e)) => {
                                    warn!(error = %e, "Push feed error");
                                    break;
                                }
                                None => {
                                    info!("Push feed closed");
                                    break;
                                }
                            },
                            _ = shutdown.changed() => {
                                self.transition(ConnectionState::Disconnected);
                                return self.state;
                            }
                        }
                    }
                }
                Err(e) => warn!(error = %e, "Push feed connection failed"),
            }

            if self.attempts >= self.retry.max_attempts {
                self.transition(ConnectionState::Terminal);
                error!(attempts = self.attempts, "Push feed reconnect budget exhausted");
                let _ = events
                    .send(FeedEvent::Terminal {
                        attempts: self.attempts,
                    })
                    .await;
                return self.state;
            }

            self.attempts += 1;
            self.transition(ConnectionState::Backoff);
            warn!(
                attempt = self.attempts,
                max = self.retry.max_attempts,
                "Reconnecting push feed"
            );
            if events
                .send(FeedEvent::Reconnecting {
                    attempt: self.attempts,
                    max: self.retry.max_attempts,
                })
                .await
                .is_err()
            {
                self.transition(ConnectionState::Disconnected);
                return self.state;
            }

            let delay = self.retry.delay;
            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                _ = shutdown.changed() => {
                    self.transition(ConnectionState::Disconnected);
                    return self.state;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Transport that replays scripted connections.
    struct ScriptedTransport {
        script: Mutex<VecDeque<Result<Vec<&'static str>, ()>>>,
        connects: Mutex<u32>,
    }

    impl ScriptedTransport {
        fn new(script: Vec<Result<Vec<&'static str>, ()>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                connects: Mutex::new(0),
            })
        }

        fn connects(&self) -> u32 {
            *self.connects.lock().unwrap()
        }
    }

    #[async_trait]
    impl FeedTransport for ScriptedTransport {
        async fn connect(&self) -> Result<FeedStream, FeedError> {
            *self.connects.lock().unwrap() += 1;
            match self.script.lock().unwrap().pop_front() {
                Some(Ok(frames)) => Ok(futures::stream::iter(
                    frames.into_iter().map(|f| Ok(f.to_string())).collect::<Vec<_>>(),
                )
                .boxed()),
                _ => Err(FeedError::Connect("refused".to_string())),
            }
        }
    }

    async fn run_to_end(transport: Arc<ScriptedTransport>) -> (ConnectionState, Vec<FeedEvent>) {
        let (tx, mut rx) = mpsc::channel(64);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut connection = FeedConnection::new(transport)
            .with_retry_strategy(RetryStrategy::fixed(5, Duration::ZERO));

        let state = connection.run(tx, shutdown_rx).await;
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        (state, events)
    }

    #[tokio::test]
    async fn test_terminal_after_five_failed_reconnects() {
        let transport = ScriptedTransport::new(vec![]);
        let (state, events) = run_to_end(transport.clone()).await;

        assert_eq!(state, ConnectionState::Terminal);
        assert_eq!(transport.connects(), 6);
        let reconnects: Vec<u32> = events
            .iter()
            .filter_map(|e| match e {
                FeedEvent::Reconnecting { attempt, .. } => Some(*attempt),
                _ => None,
            })
            .collect();
        assert_eq!(reconnects, vec![1, 2, 3, 4, 5]);
        assert_eq!(events.last(), Some(&FeedEvent::Terminal { attempts: 5 }));
    }

    #[tokio::test]
    async fn test_successful_connect_resets_attempts() {
        let transport = ScriptedTransport::new(vec![
            Err(()),
            Err(()),
            Ok(vec!["\"refresh\""]),
        ]);
        let (state, events) = run_to_end(transport.clone()).await;

        assert_eq!(state, ConnectionState::Terminal);
        // 3 scripted connects, then 5 failing reconnects after the reset.
        assert_eq!(transport.connects(), 8);
        assert!(events.contains(&FeedEvent::Connected));
        assert!(events.contains(&FeedEvent::Message("\"refresh\"".to_string())));
        assert_eq!(events.last(), Some(&FeedEvent::Terminal { attempts: 5 }));
    }

    #[tokio::test]
    async fn test_shutdown_stops_before_connecting() {
        let transport = ScriptedTransport::new(vec![Ok(vec!["a"])]);
        let (tx, _rx) = mpsc::channel(8);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        shutdown_tx.send(true).unwrap();

        let mut connection = FeedConnection::new(transport.clone());
        let state = connection.run(tx, shutdown_rx).await;

        assert_eq!(state, ConnectionState::Disconnected);
        assert_eq!(transport.connects(), 0);
    }

    #[test]
    fn test_ws_url() {
        let transport = WsTransport::new("ws://10.0.0.5:3000/");
        assert_eq!(transport.url(), "ws://10.0.0.5:3000/ws/notification");
    }
}
