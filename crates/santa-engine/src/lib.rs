//! Assignment and reveal engine for a gift exchange.
//!
//! The pairing generator and reveal policy are pure functions. The lifecycle
//! transitions run against an [`store::EventStore`], which is responsible for
//! making each transition atomic.

pub mod clock;
pub mod error;
pub mod lifecycle;
pub mod pairing;
pub mod reveal;
pub mod store;

#[cfg(test)]
mod memory;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::EngineError;
pub use lifecycle::{Caller, Engine, EventSummary, GenerateOutcome, LockOutcome};
pub use pairing::{Pairing, generate_pairings};
pub use reveal::{Reveal, can_reveal};
pub use store::{AssignmentCounts, AssignmentLookup, EventRecord, EventStore, EventTxn, EventView, ReceiverProfile};
