//! Config command - manage configuration.

use anyhow::Result;
use clap::{Args, Subcommand};
use tracing::info;

use parkgate_core::Operator;
use parkgate_store::{SettingsStore, default_config_dir, default_state_path};

use crate::output::JsonFormatter;
use crate::{Cli, OutputFormat};

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config subcommands.
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration.
    Show,

    /// Show configuration paths.
    Path,

    /// Log in as a zone operator, or as an admin.
    SetOperator {
        /// Parking zone (e.g. P3).
        #[arg(required_unless_present = "admin")]
        zone: Option<String>,

        /// Admin without a zone.
        #[arg(long, conflicts_with = "zone")]
        admin: bool,
    },

    /// Point the desk at a different backend.
    SetApi {
        /// Backend base URL (without /api/v1).
        url: String,

        /// Push-feed base URL; derived from the backend URL when omitted.
        #[arg(long)]
        feed_url: Option<String>,
    },
}

/// Runs the config command.
pub async fn run(args: &ConfigArgs, store: &SettingsStore, cli: &Cli) -> Result<()> {
    match &args.action {
        ConfigAction::Show => show_config(store, cli).await,
        ConfigAction::Path => show_paths(store, cli).await,
        ConfigAction::SetOperator { zone, admin } => set_operator(store, zone.as_deref(), *admin).await,
        ConfigAction::SetApi { url, feed_url } => set_api(store, url, feed_url.as_deref()).await,
    }
}

async fn show_config(store: &SettingsStore, cli: &Cli) -> Result<()> {
    let settings = store.get().await;

    match cli.format {
        OutputFormat::Text => {
            println!("ParkGate Configuration");
            println!("{}", "─".repeat(40));
            println!();
            println!("API URL:        {}", settings.api_url);
            println!("Feed URL:       {}", settings.feed_url);
            println!("Barrier host:   {}", settings.barrier_host);
            println!("Operator:       {:?}", settings.operator.role);
            println!("Zone:           {}", settings.operator.zone.as_deref().unwrap_or("-"));
            println!("Page size:      {}", settings.page_limit);
            println!(
                "Fee retry:      {} x {} ms",
                settings.fee_retry.attempts, settings.fee_retry.delay_ms
            );
            println!(
                "Feed reconnect: {} x {} ms",
                settings.feed_reconnect.attempts, settings.feed_reconnect.delay_ms
            );
            println!("Log level:      {}", settings.log_level);
        }
        OutputFormat::Json => {
            let mut settings = settings;
            if !settings.barrier_password.is_empty() {
                settings.barrier_password = "********".to_string();
            }
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&settings)?);
        }
    }

    Ok(())
}

async fn show_paths(store: &SettingsStore, cli: &Cli) -> Result<()> {
    let config_dir = default_config_dir();
    let state_file = store
        .get()
        .await
        .state_path
        .unwrap_or_else(default_state_path);

    match cli.format {
        OutputFormat::Text => {
            println!("Configuration Paths");
            println!("{}", "─".repeat(40));
            println!();
            println!("Config dir:    {}", config_dir.display());
            println!("Settings file: {}", store.path().display());
            println!("Shift state:   {}", state_file.display());
        }
        OutputFormat::Json => {
            let paths = serde_json::json!({
                "config_dir": config_dir.display().to_string(),
                "settings_file": store.path().display().to_string(),
                "state_file": state_file.display().to_string(),
            });
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&paths)?);
        }
    }

    Ok(())
}

async fn set_operator(store: &SettingsStore, zone: Option<&str>, admin: bool) -> Result<()> {
    let operator = match zone {
        Some(zone) if !admin => Operator::for_zone(zone.trim()),
        _ => Operator::admin(),
    };
    operator.validate()?;

    store.set_operator(operator.clone()).await;
    store.save().await?;

    info!(role = ?operator.role, zone = ?operator.zone, "Operator updated");
    match operator.assigned_zone() {
        Some(zone) => println!("Operator set for zone {zone}"),
        None => println!("Operator set to admin"),
    }
    Ok(())
}

async fn set_api(store: &SettingsStore, url: &str, feed_url: Option<&str>) -> Result<()> {
    let url = url.trim().trim_end_matches('/').to_string();
    let feed_url = feed_url.map_or_else(|| feed_url_for(&url), ToString::to_string);

    store.set_api_url(url.clone()).await;
    store.update(|s| s.feed_url.clone_from(&feed_url)).await;
    store.save().await?;

    info!(api_url = %url, feed_url = %feed_url, "Endpoints updated");
    println!("API URL set to: {url}");
    println!("Feed URL set to: {feed_url}");
    Ok(())
}

/// Websocket base matching an HTTP base URL.
fn feed_url_for(api_url: &str) -> String {
    if let Some(rest) = api_url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = api_url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        api_url.to_string()
    }
}
