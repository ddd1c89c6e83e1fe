//! Paginated, filtered view of vehicle sessions.
//!
//! The directory caches one page from the backend and lets the listener and
//! the exit flow patch entries in place until the next reload.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{RwLock, watch};
use tracing::{debug, info};

use parkgate_core::{
    Operator, PatchOutcome, VehicleFilter, VehicleId, VehiclePatch, VehicleSession, ZoneChannels,
};
use parkgate_fetch::VehicleGateway;

use crate::error::StoreError;

// ============================================================================
// Types
// ============================================================================

/// One loaded page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryPage {
    /// Sessions on the page.
    pub entries: Vec<VehicleSession>,
    /// Matches across all pages.
    pub total: u64,
    /// Number of pages, at least 1.
    pub total_pages: u32,
    /// Filter that produced the page.
    pub filter: VehicleFilter,
    /// Page numbers to offer around the current one.
    pub page_window: Vec<u32>,
}

struct DirectoryInner {
    entries: Vec<VehicleSession>,
    total: u64,
    total_pages: u32,
    filter: VehicleFilter,
    loaded_at: Option<DateTime<Utc>>,
}

impl DirectoryInner {
    fn new(filter: VehicleFilter) -> Self {
        Self {
            entries: Vec::new(),
            total: 0,
            total_pages: 1,
            filter,
            loaded_at: None,
        }
    }

    fn page(&self) -> DirectoryPage {
        DirectoryPage {
            entries: self.entries.clone(),
            total: self.total,
            total_pages: self.total_pages,
            filter: self.filter.clone(),
            page_window: self.filter.page_window(self.total_pages),
        }
    }
}

// ============================================================================
// Vehicle Directory
// ============================================================================

/// Cached page of vehicle sessions.
///
/// Observable via a watch channel bumped on every change.
pub struct VehicleDirectory {
    gateway: Arc<dyn VehicleGateway>,
    operator: Operator,
    channels: ZoneChannels,
    inner: Arc<RwLock<DirectoryInner>>,
    notify: watch::Sender<u64>,
    version: Arc<RwLock<u64>>,
}

impl std::fmt::Debug for VehicleDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VehicleDirectory")
            .field("operator", &self.operator)
            .finish_non_exhaustive()
    }
}

impl VehicleDirectory {
    /// Creates an empty directory.
    pub fn new(gateway: Arc<dyn VehicleGateway>, operator: Operator, channels: ZoneChannels) -> Self {
        Self::with_filter(gateway, operator, channels, VehicleFilter::new())
    }

    /// Creates an empty directory whose first load uses `filter`.
    pub fn with_filter(
        gateway: Arc<dyn VehicleGateway>,
        operator: Operator,
        channels: ZoneChannels,
        filter: VehicleFilter,
    ) -> Self {
        let (notify, _) = watch::channel(0);
        Self {
            gateway,
            operator,
            channels,
            inner: Arc::new(RwLock::new(DirectoryInner::new(filter))),
            notify,
            version: Arc::new(RwLock::new(0)),
        }
    }

    /// Operator the directory is scoped to.
    pub fn operator(&self) -> &Operator {
        &self.operator
    }

    /// Zone → channel table used to fill missing channels.
    pub fn channels(&self) -> &ZoneChannels {
        &self.channels
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Fetches the page described by `filter` and replaces the cache.
    ///
    /// Zone-scoped operators always search their own zone. On error the
    /// cache is left as it was.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Fetch`] if the search fails.
    pub async fn load(&self, filter: VehicleFilter) -> Result<DirectoryPage, StoreError> {
        let mut filter = filter;
        if let Some(zone) = self.operator.scoped_zone() {
            filter.zone = Some(zone.to_string());
        }

        let page = self.gateway.search(&filter).await?;
        let entries: Vec<VehicleSession> = page
            .sessions
            .into_iter()
            .map(|mut session| {
                session.channel_id = self
                    .channels
                    .resolve(session.channel_id.as_deref(), &session.parking_zone);
                session
            })
            .collect();

        let snapshot = {
            let mut inner = self.inner.write().await;
            inner.entries = entries;
            inner.total = page.total;
            inner.total_pages = page.total_pages.max(1);
            inner.filter = filter;
            inner.loaded_at = Some(Utc::now());
            inner.page()
        };
        self.notify_change().await;

        info!(
            count = snapshot.entries.len(),
            total = snapshot.total,
            page = snapshot.filter.page,
            "Directory loaded"
        );
        Ok(snapshot)
    }

    /// Reloads the current filter.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Fetch`] if the search fails.
    pub async fn refresh(&self) -> Result<DirectoryPage, StoreError> {
        let filter = self.inner.read().await.filter.clone();
        self.load(filter).await
    }

    // ========================================================================
    // Patching
    // ========================================================================

    /// Merges `patch` into the entry with `id`.
    ///
    /// A miss is a silent no-op; a patch that would move the status
    /// backwards is ignored.
    pub async fn apply_patch(&self, id: &VehicleId, patch: &VehiclePatch) -> PatchOutcome {
        let outcome = {
            let mut inner = self.inner.write().await;
            match inner.entries.iter_mut().find(|e| &e.id == id) {
                Some(entry) => entry.apply(patch),
                None => PatchOutcome::Missing,
            }
        };

        match outcome {
            PatchOutcome::Applied => {
                self.notify_change().await;
                debug!(id = %id, "Directory entry patched");
            }
            PatchOutcome::Regressed { from, to } => {
                debug!(id = %id, %from, %to, "Ignored backwards status patch");
            }
            PatchOutcome::Missing => debug!(id = %id, "Patch target not on current page"),
        }
        outcome
    }

    // ========================================================================
    // Access
    // ========================================================================

    /// Finds an entry by plate, ignoring case and surrounding whitespace.
    pub async fn find_by_plate(&self, plate: &str) -> Option<VehicleSession> {
        let wanted = plate.trim();
        self.inner
            .read()
            .await
            .entries
            .iter()
            .find(|e| e.plate_number.eq_ignore_ascii_case(wanted))
            .cloned()
    }

    /// Finds the session a plate can still exit from.
    ///
    /// Plates repeat across visits, so a search can return earlier `Exited`
    /// sessions next to the current one. Among the `Inside` and `Pending`
    /// entries the most recent entry time wins.
    pub async fn find_active_by_plate(&self, plate: &str) -> Option<VehicleSession> {
        let wanted = plate.trim();
        self.inner
            .read()
            .await
            .entries
            .iter()
            .filter(|e| e.plate_number.eq_ignore_ascii_case(wanted) && e.status.is_exitable())
            .max_by_key(|e| e.entry_time)
            .cloned()
    }

    /// Finds an entry by id.
    pub async fn get(&self, id: &VehicleId) -> Option<VehicleSession> {
        self.inner
            .read()
            .await
            .entries
            .iter()
            .find(|e| &e.id == id)
            .cloned()
    }

    /// Entries on the current page.
    pub async fn entries(&self) -> Vec<VehicleSession> {
        self.inner.read().await.entries.clone()
    }

    /// Matches across all pages.
    pub async fn total(&self) -> u64 {
        self.inner.read().await.total
    }

    /// Number of pages.
    pub async fn total_pages(&self) -> u32 {
        self.inner.read().await.total_pages
    }

    /// Active filter.
    pub async fn filter(&self) -> VehicleFilter {
        self.inner.read().await.filter.clone()
    }

    /// Current page as a snapshot.
    pub async fn page(&self) -> DirectoryPage {
        self.inner.read().await.page()
    }

    /// When the cache was last replaced.
    pub async fn loaded_at(&self) -> Option<DateTime<Utc>> {
        self.inner.read().await.loaded_at
    }

    // ========================================================================
    // Notifications
    // ========================================================================

    /// Subscribes to directory changes.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.notify.subscribe()
    }

    /// Notifies subscribers of a change.
    async fn notify_change(&self) {
        let mut version = self.version.write().await;
        *version += 1;
        let _ = self.notify.send(*version);
    }
}
