//! CLI command implementations.

pub mod config;
pub mod exit;
pub mod list;
pub mod shift;
pub mod show;
pub mod watch;

use anyhow::{Context, Result};
use parkgate_desk::Desk;
use parkgate_store::SettingsStore;

/// Builds a desk from the current settings.
pub(crate) async fn open_desk(store: &SettingsStore) -> Result<Desk> {
    let settings = store.get().await;
    Desk::from_settings(settings)
        .await
        .with_context(|| format!("Cannot start desk with settings from {}", store.path().display()))
}
