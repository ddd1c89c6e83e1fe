//! Desk configuration store.
//!
//! Manages settings with persistence and change notification.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parkgate_core::{Operator, ZoneChannels};
use parkgate_fetch::RetryStrategy;
use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, watch};
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::persistence::{default_settings_path, default_state_path, load_json, save_json};

// ============================================================================
// Settings Types
// ============================================================================

/// Desk configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // ========================================================================
    // Endpoints
    // ========================================================================
    /// Backend base URL, without `/api/v1`.
    pub api_url: String,

    /// Push-feed base URL, without `/ws/notification`.
    pub feed_url: String,

    /// Barrier controller base URL.
    pub barrier_host: String,

    /// Barrier controller user.
    pub barrier_username: String,

    /// Barrier controller password.
    pub barrier_password: String,

    // ========================================================================
    // Operator
    // ========================================================================
    /// Logged-in operator.
    pub operator: Operator,

    /// Sessions per directory page.
    pub page_limit: u32,

    /// Zone → channel overrides layered on the built-in table.
    pub zone_channels: HashMap<String, String>,

    // ========================================================================
    // Timing
    // ========================================================================
    /// Fee lookup retry policy.
    pub fee_retry: RetryPolicy,

    /// Push-feed reconnect policy.
    pub feed_reconnect: RetryPolicy,

    /// Pause between barrier open and close, in milliseconds.
    pub barrier_settle_ms: u64,

    /// HTTP request timeout, in seconds.
    pub request_timeout_secs: u64,

    // ========================================================================
    // Diagnostics & Storage
    // ========================================================================
    /// Log level.
    pub log_level: LogLevel,

    /// Shift state file; the platform data dir when unset.
    pub state_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:3000".to_string(),
            feed_url: "ws://localhost:3000".to_string(),
            barrier_host: "http://localhost:8080".to_string(),
            barrier_username: String::new(),
            barrier_password: String::new(),
            operator: Operator::default(),
            page_limit: parkgate_core::DEFAULT_PAGE_LIMIT,
            zone_channels: HashMap::new(),
            fee_retry: RetryPolicy::fee_quote(),
            feed_reconnect: RetryPolicy::feed_reconnect(),
            barrier_settle_ms: 500,
            request_timeout_secs: 30,
            log_level: LogLevel::default(),
            state_path: None,
        }
    }
}

impl Settings {
    /// Built-in zone channels with the configured overrides.
    pub fn channel_table(&self) -> ZoneChannels {
        ZoneChannels::with_overrides(&self.zone_channels)
    }

    /// Where shift state is stored.
    pub fn state_file(&self) -> PathBuf {
        self.state_path.clone().unwrap_or_else(default_state_path)
    }

    /// Pause between barrier open and close.
    pub fn barrier_settle(&self) -> Duration {
        Duration::from_millis(self.barrier_settle_ms)
    }

    /// HTTP request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Checks the settings are usable.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] describing the first problem found.
    pub fn validate(&self) -> Result<(), StoreError> {
        for (name, url) in [
            ("api_url", &self.api_url),
            ("feed_url", &self.feed_url),
            ("barrier_host", &self.barrier_host),
        ] {
            if url.trim().is_empty() {
                return Err(StoreError::Config(format!("{name} is empty")));
            }
        }
        if self.page_limit == 0 {
            return Err(StoreError::Config("page_limit must be at least 1".to_string()));
        }
        self.operator
            .validate()
            .map_err(|e| StoreError::Config(e.to_string()))
    }
}

/// Attempts and fixed pause of a retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Attempts (or reconnects) before giving up.
    pub attempts: u32,
    /// Pause between attempts, in milliseconds.
    pub delay_ms: u64,
}

impl RetryPolicy {
    /// Three fee lookups, one second apart.
    pub fn fee_quote() -> Self {
        Self {
            attempts: 3,
            delay_ms: 1000,
        }
    }

    /// Five reconnects, three seconds apart.
    pub fn feed_reconnect() -> Self {
        Self {
            attempts: 5,
            delay_ms: 3000,
        }
    }

    /// Converts into a fixed-delay strategy.
    pub fn strategy(self) -> RetryStrategy {
        RetryStrategy::fixed(self.attempts, Duration::from_millis(self.delay_ms))
    }
}

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    /// Error level logging.
    Error,
    /// Warning level logging.
    #[default]
    Warn,
    /// Info level logging.
    Info,
    /// Debug level logging.
    Debug,
    /// Trace level logging.
    Trace,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Error => write!(f, "error"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Trace => write!(f, "trace"),
        }
    }
}

// ============================================================================
// Settings Store
// ============================================================================

/// Persistent settings store with change notifications.
pub struct SettingsStore {
    settings: Arc<RwLock<Settings>>,
    path: PathBuf,
    notify: watch::Sender<u64>,
    version: Arc<RwLock<u64>>,
}

impl SettingsStore {
    /// Creates a store holding defaults.
    pub fn new(path: PathBuf) -> Self {
        let (notify, _) = watch::channel(0);
        Self {
            settings: Arc::new(RwLock::new(Settings::default())),
            path,
            notify,
            version: Arc::new(RwLock::new(0)),
        }
    }

    /// Loads settings from the default path.
    ///
    /// # Errors
    ///
    /// Returns error if settings cannot be loaded from disk.
    pub async fn load_default() -> Result<Self, StoreError> {
        Self::load(default_settings_path()).await
    }

    /// Loads settings from a path, falling back to defaults.
    ///
    /// # Errors
    ///
    /// Returns error if settings cannot be loaded from disk.
    pub async fn load(path: PathBuf) -> Result<Self, StoreError> {
        let settings = if path.exists() {
            info!(path = %path.display(), "Loading settings");
            load_json(&path).await.unwrap_or_else(|e| {
                warn!(error = %e, "Failed to load settings, using defaults");
                Settings::default()
            })
        } else {
            debug!(path = %path.display(), "Settings file not found, using defaults");
            Settings::default()
        };

        let store = Self::new(path);
        *store.settings.write().await = settings;
        Ok(store)
    }

    /// File backing this store.
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Gets a copy of the current settings.
    pub async fn get(&self) -> Settings {
        self.settings.read().await.clone()
    }

    /// Updates settings and notifies subscribers.
    pub async fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut Settings),
    {
        {
            let mut settings = self.settings.write().await;
            f(&mut settings);
        }
        self.notify_change().await;
    }

    /// Saves settings to disk.
    ///
    /// # Errors
    ///
    /// Returns error if settings cannot be written to disk.
    pub async fn save(&self) -> Result<(), StoreError> {
        let settings = self.settings.read().await;
        save_json(&self.path, &*settings).await?;
        info!(path = %self.path.display(), "Settings saved");
        Ok(())
    }

    /// Subscribes to settings changes.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.notify.subscribe()
    }

    /// Notifies subscribers of a change.
    async fn notify_change(&self) {
        let mut version = self.version.write().await;
        *version += 1;
        let _ = self.notify.send(*version);
    }

    // ========================================================================
    // Convenience Methods
    // ========================================================================

    /// Logged-in operator.
    pub async fn operator(&self) -> Operator {
        self.settings.read().await.operator.clone()
    }

    /// Replaces the operator.
    pub async fn set_operator(&self, operator: Operator) {
        self.update(|s| s.operator = operator).await;
    }

    /// Points the desk at a different backend.
    pub async fn set_api_url(&self, url: impl Into<String>) {
        let url = url.into();
        self.update(|s| s.api_url = url).await;
    }
}
