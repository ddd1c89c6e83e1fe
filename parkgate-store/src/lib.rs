// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `ParkGate` Store
//!
//! State management for the `ParkGate` attendant desk.
//!
//! This crate provides:
//!
//! - **`VehicleDirectory`**: Cached, filtered page of sessions with watch channels
//! - **`Shift`**: Profit ledger and processed plates, settled atomically
//! - **`KeyValueStore`**: Persistence port with JSON-file and in-memory backends
//! - **`SettingsStore`**: Desk configuration with persistence
//! - **Persistence**: File I/O helpers for JSON data
//!
//! ## Usage
//!
//! ```ignore
//! use parkgate_store::{JsonFileStore, Shift, SettingsStore};
//!
//! let settings = SettingsStore::load_default().await?.get().await;
//! let shift = Shift::load(Arc::new(JsonFileStore::new(settings.state_file()))).await?;
//!
//! match shift.settle("AB1234AG", 45.0).await? {
//!     Settlement::Settled { total, .. } => println!("Shift total: {total}"),
//!     Settlement::AlreadyProcessed { .. } => println!("Already settled"),
//! }
//! ```

pub mod directory;
pub mod error;
pub mod kv;
pub mod ledger;
pub mod persistence;
pub mod processed;
pub mod settings_store;
pub mod shift;

pub use directory::{DirectoryPage, VehicleDirectory};
pub use error::StoreError;
pub use kv::{JsonFileStore, KeyValueStore, MemoryStore};
pub use ledger::{PROFIT_KEY, ShiftLedger};
pub use persistence::{
    default_config_dir, default_data_dir, default_settings_path, default_state_path, load_json,
    load_json_or_default, save_json,
};
pub use processed::{PROCESSED_KEY, ProcessedSet};
pub use settings_store::{LogLevel, RetryPolicy, Settings, SettingsStore};
pub use shift::{Settlement, Shift, ShiftSummary};
