//! Watch command - live updates and payment prompts.

use anyhow::Result;
use chrono::Utc;
use tracing::{info, warn};

use parkgate_desk::{Notice, notice_channel};
use parkgate_fetch::FetchError;
use parkgate_store::SettingsStore;

use super::open_desk;
use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Runs the watch command until Ctrl+C or the feed gives up.
pub async fn run(store: &SettingsStore, cli: &Cli) -> Result<()> {
    let desk = open_desk(store).await?;

    match desk.directory().refresh().await {
        Ok(page) => info!(count = page.entries.len(), "Initial directory loaded"),
        Err(e) if e.is_auth_expired() => return Err(e.into()),
        Err(e) => warn!(error = %e, "Initial directory load failed"),
    }

    let (tx, mut rx) = notice_channel();
    let handle = desk.listener(tx).spawn(desk.feed_connection());

    let text = TextFormatter::new(!cli.no_color);
    let json = JsonFormatter::new(cli.pretty);
    if cli.format == OutputFormat::Text && !cli.quiet {
        println!("Watching {} (Ctrl+C to exit)", desk.settings().feed_url);
    }

    let mut auth_expired = false;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
            notice = rx.recv() => {
                let Some(notice) = notice else { break };
                match cli.format {
                    OutputFormat::Text => println!("{}", text.format_notice(&notice)),
                    OutputFormat::Json => println!("{}", json.format_notice(&notice, Utc::now())?),
                }
                match notice {
                    Notice::ConnectionLost { .. } => break,
                    Notice::AuthExpired => {
                        auth_expired = true;
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    let state = handle.shutdown().await;
    info!(%state, "Watch stopped");

    if auth_expired {
        return Err(FetchError::AuthExpired.into());
    }
    Ok(())
}
