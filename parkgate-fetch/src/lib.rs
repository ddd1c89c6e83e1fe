// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `ParkGate` Fetch
//!
//! Remote clients for the `ParkGate` attendant desk.
//!
//! ## Host APIs
//!
//! - [`host::http`] - HTTP client with tracing and URL helpers
//!
//! ## Backend
//!
//! - [`api::VehicleGateway`] - Search, fee lookup and update calls
//! - [`api::ParkingApi`] - HTTP implementation against `{api_url}/api/v1`
//! - [`quote::FeeQuoteClient`] - Fee lookup with bounded retry and fallback
//!
//! ## Devices & Feed
//!
//! - [`barrier::BarrierActuator`] - Barrier open/close commands
//! - [`feed::FeedConnection`] - Push-feed connection with bounded reconnects
//!
//! ## Example
//!
//! ```ignore
//! use parkgate_fetch::{FeeQuoteClient, HttpClient, ParkingApi};
//!
//! let api = ParkingApi::new(HttpClient::new()?, "http://10.0.0.5:3000")?;
//! let quotes = FeeQuoteClient::new(Arc::new(api), Some("P3".into()));
//! let snapshot = quotes.retry_quote("AB1234AG", channel_id).await?;
//! ```

pub mod api;
pub mod barrier;
pub mod error;
pub mod feed;
pub mod host;
pub mod quote;
pub mod retry;
pub mod wire;


// Errors
pub use error::{FeedError, FetchError, HttpError};

// Host APIs
pub use host::http::HttpClient;

// Backend
pub use api::{FeeQuery, ParkingApi, SearchPage, VehicleGateway};
pub use quote::{FeeQuoteClient, ResolvedFee};
pub use wire::VehicleUpdate;

// Devices & feed
pub use barrier::{BarrierActuator, BarrierClient, BarrierReport, DEFAULT_SETTLE_DELAY, cycle_barrier};
pub use feed::{ConnectionState, FeedConnection, FeedEvent, FeedStream, FeedTransport, WsTransport};

pub use retry::RetryStrategy;
