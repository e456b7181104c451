//! Quoting service: HTTP surface and process wiring around the quoting
//! engine.
//!
//! - `api`: message batch endpoint and read-only quote lookups
//! - `service`: backend registration, engine assembly and server lifecycle

pub mod api;
pub mod service;

pub use service::QuotingService;
