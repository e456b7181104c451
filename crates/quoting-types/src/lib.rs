//! Shared domain types for the quoting service.
//!
//! Everything that crosses a crate boundary lives here: the quote and bulk
//! quote records, the inbound and outbound message envelopes, the payloads
//! they carry, and the typed error codes together with the event names they
//! map to on the wire.

pub mod common;
pub mod errors;
pub mod events;
pub mod messages;
pub mod participant;
pub mod quote;

pub use common::*;
pub use errors::*;
pub use events::*;
pub use messages::*;
pub use participant::*;
pub use quote::*;
