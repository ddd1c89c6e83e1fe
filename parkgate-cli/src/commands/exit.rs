//! Exit command - collect the fee and let the car out.

use anyhow::{Context, Result};
use clap::Args;
use thiserror::Error;

use parkgate_core::{VehicleFilter, validate_plate};
use parkgate_desk::ExitRequest;
use parkgate_store::SettingsStore;

use super::open_desk;
use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Arguments for the exit command.
#[derive(Args, Debug)]
pub struct ExitArgs {
    /// Plate number.
    pub plate: String,

    /// Why the barrier is opened.
    #[arg(long, short)]
    pub reason: String,

    /// Barrier name to show; the car's zone when omitted.
    #[arg(long, short)]
    pub barrier: Option<String>,

    /// Barrier channel; resolved from the car or its zone when omitted.
    #[arg(long, short)]
    pub channel: Option<String>,
}

impl ExitArgs {
    /// Request described by the arguments.
    pub fn request(&self) -> ExitRequest {
        ExitRequest {
            plate: self.plate.trim().to_string(),
            barrier_label: self.barrier.clone(),
            channel_id: self.channel.clone(),
            reason: self.reason.clone(),
        }
    }
}

/// The car left without being credited to this shift.
#[derive(Debug, Error)]
#[error("{plate} was not credited to this shift; confirm the exit with the backend")]
pub struct Unreconciled {
    /// Plate.
    pub plate: String,
}

/// Runs the exit command.
pub async fn run(args: &ExitArgs, store: &SettingsStore, cli: &Cli) -> Result<()> {
    let plate = validate_plate(&args.plate)?;
    let desk = open_desk(store).await?;

    desk.directory()
        .load(VehicleFilter::new().with_search(plate))
        .await
        .context("Failed to fetch cars")?;

    let outcome = desk
        .orchestrator()
        .open_barrier_and_settle(args.request())
        .await?;

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            println!("{}", formatter.format_outcome(&outcome));
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&outcome)?);
        }
    }

    if outcome.needs_reconciliation() {
        return Err(Unreconciled {
            plate: outcome.plate().to_string(),
        }
        .into());
    }
    Ok(())
}
