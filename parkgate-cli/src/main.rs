// Lint configuration for this crate
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! `ParkGate` CLI - the attendant desk from the command line.
//!
//! # Examples
//!
//! ```bash
//! # Cars on the first page of the operator's zone
//! parkgate list
//!
//! # Search by plate, JSON output
//! parkgate list --search AB12 --format json --pretty
//!
//! # Current fee for a car
//! parkgate show AB1234AG
//!
//! # Collect the fee and open the barrier
//! parkgate exit AB1234AG --reason "Customer leaving"
//!
//! # Follow live updates
//! parkgate watch
//!
//! # Shift profit
//! parkgate shift show
//! ```

mod commands;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use parkgate_desk::{DeskError, ExitError};
use parkgate_fetch::FetchError;
use parkgate_store::{LogLevel, SettingsStore, StoreError};

use commands::{config, exit, list, shift, show, watch};

// ============================================================================
// CLI Definition
// ============================================================================

/// `ParkGate` CLI - parking-lot attendant desk.
#[derive(Parser)]
#[command(name = "parkgate")]
#[command(about = "Parking-lot attendant desk: cars, fees, barrier and shift profit")]
#[command(long_about = r#"
ParkGate lets a parking attendant list cars, check fees, let cars out
through the barrier and keep track of the shift's takings.

Examples:
  parkgate list                          # Cars in your zone
  parkgate list --status Pending         # Cars waiting to pay
  parkgate show AB1234AG                 # Current fee
  parkgate exit AB1234AG --reason paid   # Collect fee, open barrier
  parkgate watch                         # Live updates and payment prompts
  parkgate shift show                    # Shift profit
"#)]
#[command(version)]
#[command(author = "ParkGate Contributors")]
pub struct Cli {
    /// Command to run.
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (text or json).
    #[arg(long, short = 'f', default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Settings file to use instead of the default.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output (show debug info).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Quiet mode (minimal output).
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// List cars with filters and pagination.
    #[command(visible_alias = "ls")]
    List(list::ListArgs),

    /// Show the current fee for a car.
    Show(show::ShowArgs),

    /// Record the exit, collect the final fee and cycle the barrier.
    Exit(exit::ExitArgs),

    /// Follow live updates and payment prompts.
    #[command(visible_alias = "w")]
    Watch,

    /// Show or reset the shift.
    Shift(shift::ShiftArgs),

    /// Manage configuration.
    Config(config::ConfigArgs),
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable text with colors.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// CLI exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success.
    Success = 0,
    /// General error.
    Error = 1,
    /// Session expired; log in again.
    AuthExpired = 2,
    /// Remote record and shift books may disagree; check manually.
    ReconciliationNeeded = 3,
}

impl ExitCode {
    /// Classifies an error by walking its cause chain.
    pub fn for_error(error: &anyhow::Error) -> Self {
        for cause in error.chain() {
            if cause.downcast_ref::<exit::Unreconciled>().is_some() {
                return Self::ReconciliationNeeded;
            }
            if let Some(e) = cause.downcast_ref::<ExitError>() {
                if e.is_auth_expired() {
                    return Self::AuthExpired;
                }
                if e.is_reconciliation_needed() {
                    return Self::ReconciliationNeeded;
                }
            } else if let Some(e) = cause.downcast_ref::<FetchError>() {
                if e.is_auth_expired() {
                    return Self::AuthExpired;
                }
            } else if let Some(e) = cause.downcast_ref::<StoreError>() {
                if e.is_auth_expired() {
                    return Self::AuthExpired;
                }
            } else if let Some(DeskError::Fetch(e)) = cause.downcast_ref::<DeskError>() {
                if e.is_auth_expired() {
                    return Self::AuthExpired;
                }
            }
        }
        Self::Error
    }
}

/// Operator-facing text for an error.
fn describe(error: &anyhow::Error) -> String {
    match error.downcast_ref::<ExitError>() {
        Some(e) => e.user_message(),
        None => format!("{error:#}"),
    }
}

// ============================================================================
// Logging Setup
// ============================================================================

fn setup_logging(verbose: bool, quiet: bool, level: LogLevel) {
    if quiet {
        return; // No logging in quiet mode
    }

    let filter = if verbose {
        EnvFilter::new("parkgate=debug,info")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("parkgate={level}")))
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let store = match &cli.config {
        Some(path) => SettingsStore::load(path.clone()).await?,
        None => SettingsStore::load_default().await?,
    };
    setup_logging(cli.verbose, cli.quiet, store.get().await.log_level);

    let result = match &cli.command {
        Commands::List(args) => list::run(args, &store, &cli).await,
        Commands::Show(args) => show::run(args, &store, &cli).await,
        Commands::Exit(args) => exit::run(args, &store, &cli).await,
        Commands::Watch => watch::run(&store, &cli).await,
        Commands::Shift(args) => shift::run(args, &store, &cli).await,
        Commands::Config(args) => config::run(args, &store, &cli).await,
    };

    if let Err(e) = result {
        if !cli.quiet {
            eprintln!("Error: {}", describe(&e));
        }
        std::process::exit(ExitCode::for_error(&e) as i32);
    }

    Ok(())
}
