// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `ParkGate` Desk
//!
//! The attendant's workflows on top of the fetch and store crates.
//!
//! ## Overview
//!
//! - [`ExitOrchestrator`] - provisional exit, final fee, payment and
//!   barrier cycle for one vehicle
//! - [`NotificationListener`] - applies push-feed messages to the
//!   directory and raises payment prompts
//! - [`Notice`] - everything the operator should see
//! - [`Desk`] - wires settings into the above
//!
//! ## Example
//!
//! ```ignore
//! use parkgate_desk::{Desk, ExitRequest};
//!
//! let desk = Desk::from_settings(settings).await?;
//! desk.directory().refresh().await?;
//! let outcome = desk
//!     .orchestrator()
//!     .open_barrier_and_settle(ExitRequest::new("AB1234AG", "leaving"))
//!     .await?;
//! ```

pub mod desk;
pub mod error;
pub mod listener;
pub mod notices;
pub mod orchestrator;

pub use desk::{Desk, DeskPorts};
pub use error::{DeskError, ExitError};
pub use listener::{ListenerHandle, MessageOutcome, NotificationListener};
pub use notices::{
    Notice, NoticeLevel, NoticeReceiver, NoticeSender, PaymentPrompt, PromptSource, notice_channel,
};
pub use orchestrator::{ExitAttempt, ExitOrchestrator, ExitOutcome, ExitPhase, ExitRequest};
