//! Show command - current fee for one car.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use tracing::debug;

use parkgate_core::{
    CoreError, FeeSnapshot, PriceDisplay, VehicleFilter, VehicleStatus, price_display,
    validate_plate,
};
use parkgate_store::SettingsStore;

use super::open_desk;
use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Arguments for the show command.
#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Plate number.
    pub plate: String,

    /// Barrier channel; resolved from the car or its zone when omitted.
    #[arg(long, short)]
    pub channel: Option<String>,
}

/// Fee quote as printed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteView {
    /// Plate.
    pub plate: String,
    /// Zone used for the lookup.
    pub zone: String,
    /// Channel used for the lookup.
    pub channel_id: String,
    /// Status reported by the backend.
    pub status: Option<VehicleStatus>,
    /// How to render the fee.
    pub price: PriceDisplay,
    /// Server snapshot.
    pub snapshot: FeeSnapshot,
}

impl QuoteView {
    /// Builds the view; an unknown status renders like `Inside`.
    pub fn new(plate: &str, zone: &str, channel_id: &str, snapshot: FeeSnapshot) -> Self {
        let price = price_display(snapshot.fee, snapshot.status.unwrap_or_default());
        Self {
            plate: plate.to_string(),
            zone: zone.to_string(),
            channel_id: channel_id.to_string(),
            status: snapshot.status,
            price,
            snapshot,
        }
    }
}

/// Runs the show command.
pub async fn run(args: &ShowArgs, store: &SettingsStore, cli: &Cli) -> Result<()> {
    let plate = validate_plate(&args.plate)?.to_string();
    let desk = open_desk(store).await?;

    desk.directory()
        .load(VehicleFilter::new().with_search(&plate))
        .await
        .context("Failed to fetch cars")?;
    let session = desk.directory().find_by_plate(&plate).await;
    debug!(found = session.is_some(), "Directory lookup");

    let zone = session
        .as_ref()
        .map(|s| s.parking_zone.clone())
        .or_else(|| desk.settings().operator.assigned_zone().map(ToString::to_string))
        .ok_or(CoreError::MissingZone)?;
    let channel = args
        .channel
        .clone()
        .filter(|c| !c.trim().is_empty())
        .or_else(|| {
            desk.directory()
                .channels()
                .resolve(session.as_ref().and_then(|s| s.channel_id.as_deref()), &zone)
        })
        .ok_or(CoreError::MissingChannel)?;

    let snapshot = desk
        .quotes()
        .in_zone(&zone)
        .quote_with_fallback(&plate, &channel)
        .await
        .context("Failed to fetch car details")?;
    let view = QuoteView::new(&plate, &zone, &channel, snapshot);

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            println!("{}", formatter.format_quote(&view));
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&view)?);
        }
    }
    Ok(())
}
