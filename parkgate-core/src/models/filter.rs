//! Directory filter and pagination.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::vehicle::VehicleStatus;

/// Default number of sessions per page.
pub const DEFAULT_PAGE_LIMIT: u32 = 10;

/// Maximum number of page links shown at once.
pub const MAX_PAGES_SHOWN: u32 = 5;

/// Criteria for one directory page.
///
/// Changing any criterion resets the page to 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleFilter {
    /// Plate search text, upper-cased.
    pub search: Option<String>,
    /// Entry date.
    pub entered_on: Option<NaiveDate>,
    /// Exit date.
    pub exited_on: Option<NaiveDate>,
    /// Status.
    pub status: Option<VehicleStatus>,
    /// Parking zone.
    pub zone: Option<String>,
    /// 1-based page number.
    pub page: u32,
    /// Page size.
    pub limit: u32,
}

impl Default for VehicleFilter {
    fn default() -> Self {
        Self {
            search: None,
            entered_on: None,
            exited_on: None,
            status: None,
            zone: None,
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl VehicleFilter {
    /// Creates a filter matching everything, first page.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the plate search text.
    pub fn with_search(mut self, search: impl AsRef<str>) -> Self {
        let search = search.as_ref().trim().to_uppercase();
        self.search = (!search.is_empty()).then_some(search);
        self.page = 1;
        self
    }

    /// Sets the entry date.
    pub fn with_entry_date(mut self, date: Option<NaiveDate>) -> Self {
        self.entered_on = date;
        self.page = 1;
        self
    }

    /// Sets the exit date.
    pub fn with_exit_date(mut self, date: Option<NaiveDate>) -> Self {
        self.exited_on = date;
        self.page = 1;
        self
    }

    /// Sets the status.
    pub fn with_status(mut self, status: Option<VehicleStatus>) -> Self {
        self.status = status;
        self.page = 1;
        self
    }

    /// Sets the zone.
    pub fn with_zone(mut self, zone: Option<String>) -> Self {
        self.zone = zone.filter(|z| !z.trim().is_empty());
        self.page = 1;
        self
    }

    /// Sets the page size.
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit.max(1);
        self.page = 1;
        self
    }

    /// Sets the page without range checks.
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }

    /// Moves to `page` if it lies within `1..=total_pages`.
    pub fn go_to_page(&mut self, page: u32, total_pages: u32) -> bool {
        if page >= 1 && page <= total_pages {
            self.page = page;
            true
        } else {
            false
        }
    }

    /// Page numbers to offer, centred on the current page.
    pub fn page_window(&self, total_pages: u32) -> Vec<u32> {
        let start = self.page.saturating_sub(MAX_PAGES_SHOWN / 2).max(1);
        let end = total_pages.min(start + MAX_PAGES_SHOWN - 1);
        (start..=end).collect()
    }

    /// Query pairs for the search endpoint.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("page", self.page.to_string()),
            ("limit", self.limit.to_string()),
        ];
        if let Some(search) = &self.search {
            pairs.push(("car_number", search.clone()));
        }
        if let Some(date) = self.entered_on {
            pairs.push(("enter_time", date.format("%Y-%m-%d").to_string()));
        }
        if let Some(date) = self.exited_on {
            pairs.push(("end_time", date.format("%Y-%m-%d").to_string()));
        }
        if let Some(status) = self.status {
            pairs.push(("status", status.as_str().to_string()));
        }
        if let Some(zone) = &self.zone {
            pairs.push(("park_no", zone.clone()));
        }
        pairs
    }
}
