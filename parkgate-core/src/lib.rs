// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `ParkGate` Core
//!
//! Core types and models for the `ParkGate` attendant desk.
//!
//! This crate has no I/O. It provides:
//!
//! - Domain models (vehicle sessions, statuses, fee snapshots)
//! - Validation errors
//! - Pure rules shared by every other crate (price display, forward-only
//!   status, zone scoping, push-feed parsing)
//!
//! ## Key Types
//!
//! ### Sessions
//! - [`VehicleSession`] - One parking visit
//! - [`VehicleStatus`] - `Inside → Pending → Exited`
//! - [`VehiclePatch`] - Partial update merged by id
//! - [`FeeSnapshot`] - Server view returned by the fee lookup
//!
//! ### Presentation rules
//! - [`PriceDisplay`] / [`price_display`] - Null vs zero fee rendering
//! - [`VehicleFilter`] - Search criteria and pagination
//!
//! ### Operator & feed
//! - [`Operator`] - Role and zone scoping
//! - [`ZoneChannels`] - Zone → barrier channel defaults
//! - [`FeedMessage`] - Parsed push-feed payload

pub mod error;
pub mod models;

pub use error::CoreError;

pub use models::{
    // Sessions
    FeeSnapshot,
    PatchOutcome,
    VehicleId,
    VehiclePatch,
    VehicleSession,
    VehicleStatus,
    parse_timestamp,
    validate_plate,
    // Presentation
    CURRENCY,
    NOT_COMPUTED_LABEL,
    PriceDisplay,
    SUBSCRIPTION_LABEL,
    format_amount,
    price_display,
    DEFAULT_PAGE_LIMIT,
    MAX_PAGES_SHOWN,
    VehicleFilter,
    // Operator & feed
    FeedMessage,
    Operator,
    OperatorRole,
    REFRESH_SIGNAL,
    VehicleEvent,
    ZoneChannels,
};
