//! Domain models for ParkGate.
//!
//! ## Submodules
//!
//! - [`vehicle`] - Sessions, statuses, patches and fee snapshots
//! - [`fee`] - Price display rules
//! - [`filter`] - Directory filter and pagination
//! - [`operator`] - Operator role and zone scoping
//! - [`zone`] - Zone to barrier-channel defaults
//! - [`event`] - Push-feed messages
//! - [`serde_helpers`] - Lenient deserializers for backend payloads

pub mod event;
pub mod fee;
pub mod filter;
pub mod operator;
pub mod serde_helpers;
pub mod vehicle;
pub mod zone;

pub use event::{FeedMessage, REFRESH_SIGNAL, VehicleEvent};
pub use fee::{CURRENCY, NOT_COMPUTED_LABEL, PriceDisplay, SUBSCRIPTION_LABEL, format_amount, price_display};
pub use filter::{DEFAULT_PAGE_LIMIT, MAX_PAGES_SHOWN, VehicleFilter};
pub use operator::{Operator, OperatorRole};
pub use vehicle::{
    FeeSnapshot, PatchOutcome, VehicleId, VehiclePatch, VehicleSession, VehicleStatus,
    parse_timestamp, validate_plate,
};
pub use zone::ZoneChannels;
