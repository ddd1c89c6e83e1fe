//! Fakes shared by the desk integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Notify;

use parkgate_core::{FeeSnapshot, Operator, VehicleFilter, VehicleSession, VehicleStatus, ZoneChannels};
use parkgate_desk::ExitOrchestrator;
use futures::StreamExt;
use parkgate_fetch::{
    BarrierActuator, FeeQuery, FeeQuoteClient, FeedError, FeedStream, FeedTransport, FetchError,
    RetryStrategy, SearchPage, VehicleGateway, VehicleUpdate,
};
use parkgate_store::{KeyValueStore, MemoryStore, Shift, StoreError, VehicleDirectory};

pub const PLATE: &str = "AB1234AG";
pub const ZONE: &str = "P3";
pub const CHANNEL: &str = "test-channel";

// ============================================================================
// Backend
// ============================================================================

/// In-memory parking backend.
///
/// Updates are applied to the stored sessions so later searches see them.
#[derive(Default)]
pub struct FakeBackend {
    sessions: Mutex<Vec<VehicleSession>>,
    lookups: Mutex<VecDeque<Result<FeeSnapshot, FetchError>>>,
    alternate: Mutex<VecDeque<Result<FeeSnapshot, FetchError>>>,
    lookup_calls: Mutex<Vec<(FeeQuery, bool)>>,
    updates: Mutex<Vec<(String, VehicleUpdate)>>,
    failing_update: Mutex<Option<usize>>,
    searches: Mutex<u32>,
    search_fails: AtomicBool,
    hold_lookups: AtomicBool,
    release: Notify,
}

impl FakeBackend {
    pub fn with_sessions(sessions: Vec<VehicleSession>) -> Arc<Self> {
        let backend = Self::default();
        *backend.sessions.lock().unwrap() = sessions;
        Arc::new(backend)
    }

    pub fn script_lookups(&self, results: Vec<Result<FeeSnapshot, FetchError>>) {
        *self.lookups.lock().unwrap() = results.into();
    }

    pub fn script_alternate(&self, results: Vec<Result<FeeSnapshot, FetchError>>) {
        *self.alternate.lock().unwrap() = results.into();
    }

    /// Makes the `index`-th update call (0-based) fail with a 500.
    pub fn fail_update(&self, index: usize) {
        *self.failing_update.lock().unwrap() = Some(index);
    }

    pub fn fail_searches(&self) {
        self.search_fails.store(true, Ordering::SeqCst);
    }

    /// Makes lookups wait for [`Self::release_lookups`].
    pub fn hold_lookups(&self) {
        self.hold_lookups.store(true, Ordering::SeqCst);
    }

    pub fn release_lookups(&self) {
        self.hold_lookups.store(false, Ordering::SeqCst);
        self.release.notify_waiters();
        self.release.notify_one();
    }

    pub fn updates(&self) -> Vec<(String, VehicleUpdate)> {
        self.updates.lock().unwrap().clone()
    }

    pub fn lookup_calls(&self) -> Vec<(FeeQuery, bool)> {
        self.lookup_calls.lock().unwrap().clone()
    }

    pub fn searches(&self) -> u32 {
        *self.searches.lock().unwrap()
    }
}

#[async_trait]
impl VehicleGateway for FakeBackend {
    async fn search(&self, _filter: &VehicleFilter) -> Result<SearchPage, FetchError> {
        *self.searches.lock().unwrap() += 1;
        if self.search_fails.load(Ordering::SeqCst) {
            return Err(FetchError::Remote {
                status: 503,
                message: "unavailable".to_string(),
            });
        }
        let sessions = self.sessions.lock().unwrap().clone();
        Ok(SearchPage {
            total: sessions.len() as u64,
            total_pages: 1,
            sessions,
        })
    }

    async fn lookup(&self, query: &FeeQuery, alternate: bool) -> Result<FeeSnapshot, FetchError> {
        self.lookup_calls.lock().unwrap().push((query.clone(), alternate));
        if self.hold_lookups.load(Ordering::SeqCst) {
            self.release.notified().await;
        }
        let queue = if alternate { &self.alternate } else { &self.lookups };
        queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(FeeSnapshot::default()))
    }

    async fn update(&self, plate: &str, update: &VehicleUpdate) -> Result<(), FetchError> {
        let index = {
            let mut updates = self.updates.lock().unwrap();
            updates.push((plate.to_string(), update.clone()));
            updates.len() - 1
        };
        if *self.failing_update.lock().unwrap() == Some(index) {
            return Err(FetchError::Remote {
                status: 500,
                message: "update rejected".to_string(),
            });
        }
        if let Some(session) = self
            .sessions
            .lock()
            .unwrap()
            .iter_mut()
            .rev()
            .find(|s| s.plate_number == plate)
        {
            session.status = update.status;
            session.fee = Some(update.total_payment);
            session.exit_time = Some(update.end_time);
        }
        Ok(())
    }
}

// ============================================================================
// Barrier
// ============================================================================

/// Barrier controller that records commands.
#[derive(Default)]
pub struct FakeBarrier {
    calls: Mutex<Vec<(&'static str, String)>>,
    pub fail_open: AtomicBool,
    pub fail_close: AtomicBool,
}

impl FakeBarrier {
    pub fn calls(&self) -> Vec<(&'static str, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl BarrierActuator for FakeBarrier {
    async fn open(&self, channel_id: &str) -> Result<(), FetchError> {
        self.calls.lock().unwrap().push(("open", channel_id.to_string()));
        if self.fail_open.load(Ordering::SeqCst) {
            return Err(FetchError::remote(502, None));
        }
        Ok(())
    }

    async fn close(&self, channel_id: &str) -> Result<(), FetchError> {
        self.calls.lock().unwrap().push(("close", channel_id.to_string()));
        if self.fail_close.load(Ordering::SeqCst) {
            return Err(FetchError::remote(502, None));
        }
        Ok(())
    }
}

// ============================================================================
// Storage
// ============================================================================

/// Memory store whose writes can be switched off.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    pub failing: AtomicBool,
}

#[async_trait]
impl KeyValueStore for FlakyStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        self.inner.get(key).await
    }

    async fn set_many(&self, entries: Vec<(String, Value)>) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(std::io::Error::other("disk full").into());
        }
        self.inner.set_many(entries).await
    }
}

// ============================================================================
// Fixtures
// ============================================================================

pub fn inside(id: i64, plate: &str) -> VehicleSession {
    VehicleSession::new(id, plate, ZONE).with_channel(CHANNEL)
}

pub fn fee(amount: f64) -> FeeSnapshot {
    FeeSnapshot {
        fee: Some(amount),
        status: Some(VehicleStatus::Exited),
        exit_time: Some(chrono::Utc::now()),
        ..FeeSnapshot::default()
    }
}

pub fn not_computed() -> FeeSnapshot {
    FeeSnapshot {
        status: Some(VehicleStatus::Pending),
        ..FeeSnapshot::default()
    }
}

pub fn zero_delay_quotes(gateway: Arc<dyn VehicleGateway>, operator: &Operator) -> FeeQuoteClient {
    FeeQuoteClient::new(gateway, operator.assigned_zone().map(ToString::to_string))
        .with_retry_strategy(RetryStrategy::fixed(3, Duration::ZERO))
}

/// Everything an exit test needs, wired with zero delays.
pub struct Harness {
    pub backend: Arc<FakeBackend>,
    pub barrier: Arc<FakeBarrier>,
    pub directory: Arc<VehicleDirectory>,
    pub shift: Arc<Shift>,
    pub orchestrator: ExitOrchestrator,
}

impl Harness {
    pub async fn new(sessions: Vec<VehicleSession>) -> Self {
        Self::with_store(sessions, Arc::new(MemoryStore::new())).await
    }

    pub async fn with_store(sessions: Vec<VehicleSession>, store: Arc<dyn KeyValueStore>) -> Self {
        let operator = Operator::for_zone(ZONE);
        let backend = FakeBackend::with_sessions(sessions);
        let barrier = Arc::new(FakeBarrier::default());
        let directory = Arc::new(VehicleDirectory::new(
            backend.clone(),
            operator.clone(),
            ZoneChannels::default(),
        ));
        directory.refresh().await.unwrap();

        let shift = Arc::new(Shift::load(store).await.unwrap());
        let orchestrator = ExitOrchestrator::new(
            backend.clone(),
            zero_delay_quotes(backend.clone(), &operator),
            barrier.clone(),
            directory.clone(),
            shift.clone(),
        )
        .with_settle_delay(Duration::ZERO);

        Self {
            backend,
            barrier,
            directory,
            shift,
            orchestrator,
        }
    }
}

// ============================================================================
// Push Feed
// ============================================================================

/// Feed that serves each scripted connection once, then refuses.
#[derive(Default)]
pub struct ScriptedFeed {
    connections: Mutex<VecDeque<Vec<String>>>,
    connects: Mutex<u32>,
}

impl ScriptedFeed {
    pub fn new(connections: Vec<Vec<String>>) -> Arc<Self> {
        Arc::new(Self {
            connections: Mutex::new(connections.into()),
            connects: Mutex::new(0),
        })
    }

    pub fn connects(&self) -> u32 {
        *self.connects.lock().unwrap()
    }
}

#[async_trait]
impl FeedTransport for ScriptedFeed {
    async fn connect(&self) -> Result<FeedStream, FeedError> {
        *self.connects.lock().unwrap() += 1;
        let next = self.connections.lock().unwrap().pop_front();
        match next {
            Some(frames) => Ok(futures::stream::iter(frames.into_iter().map(Ok)).boxed()),
            None => Err(FeedError::Connect("refused".to_string())),
        }
    }
}
