//! Shift command - profit and settled plates.

use std::sync::Arc;

use anyhow::Result;
use clap::{Args, Subcommand};
use tracing::info;

use parkgate_store::{JsonFileStore, SettingsStore, Shift};

use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Arguments for the shift command.
#[derive(Args)]
pub struct ShiftArgs {
    #[command(subcommand)]
    pub action: Option<ShiftAction>,
}

/// Shift subcommands.
#[derive(Subcommand, Clone, Copy)]
pub enum ShiftAction {
    /// Show profit and settled plates (default).
    Show,

    /// Start a new shift: zero the profit and forget settled plates.
    Reset,
}

/// Runs the shift command.
pub async fn run(args: &ShiftArgs, store: &SettingsStore, cli: &Cli) -> Result<()> {
    let path = store.get().await.state_file();
    let shift = Shift::load(Arc::new(JsonFileStore::new(&path))).await?;

    if let Some(ShiftAction::Reset) = args.action {
        shift.reset().await?;
        info!(path = %path.display(), "Shift reset");
        if cli.format == OutputFormat::Text && !cli.quiet {
            println!("Shift reset");
        }
    }

    let summary = shift.summary().await;
    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            println!("{}", formatter.format_shift(&summary));
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&summary)?);
        }
    }
    Ok(())
}
