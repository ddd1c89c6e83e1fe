//! List command - one page of the vehicle directory.

use anyhow::Result;
use chrono::NaiveDate;
use clap::Args;
use tracing::info;

use parkgate_core::{VehicleFilter, VehicleStatus};
use parkgate_store::SettingsStore;

use super::open_desk;
use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Arguments for the list command.
#[derive(Args, Debug, Default)]
pub struct ListArgs {
    /// Plate search text.
    #[arg(long, short)]
    pub search: Option<String>,

    /// Entry date (YYYY-MM-DD).
    #[arg(long)]
    pub from: Option<NaiveDate>,

    /// Exit date (YYYY-MM-DD).
    #[arg(long)]
    pub to: Option<NaiveDate>,

    /// Status: Inside, Pending or Exited.
    #[arg(long)]
    pub status: Option<VehicleStatus>,

    /// Parking zone (admins only; operators always see their own).
    #[arg(long, short)]
    pub zone: Option<String>,

    /// Page number.
    #[arg(long, short, default_value = "1")]
    pub page: u32,
}

impl ListArgs {
    /// Filter described by the arguments.
    pub fn filter(&self, limit: u32) -> VehicleFilter {
        let mut filter = VehicleFilter::new()
            .with_limit(limit)
            .with_entry_date(self.from)
            .with_exit_date(self.to)
            .with_status(self.status)
            .with_zone(self.zone.clone());
        if let Some(search) = &self.search {
            filter = filter.with_search(search);
        }
        filter.with_page(self.page)
    }
}

/// Runs the list command.
pub async fn run(args: &ListArgs, store: &SettingsStore, cli: &Cli) -> Result<()> {
    let desk = open_desk(store).await?;
    let filter = args.filter(desk.settings().page_limit);
    info!(?filter, "Loading cars");

    let page = desk.directory().load(filter).await?;

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            println!("{}", formatter.format_directory(&page));
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&page)?);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_keeps_requested_page() {
        let args = ListArgs {
            search: Some("ab12".to_string()),
            status: Some(VehicleStatus::Pending),
            page: 3,
            ..ListArgs::default()
        };
        let filter = args.filter(25);
        assert_eq!(filter.search.as_deref(), Some("AB12"));
        assert_eq!(filter.status, Some(VehicleStatus::Pending));
        assert_eq!(filter.limit, 25);
        assert_eq!(filter.page, 3);
    }
}
