//! Host APIs for ParkGate clients.
//!
//! - [`http`] - HTTP client with tracing and URL helpers

pub mod http;

pub use http::{HttpClient, join_url};
