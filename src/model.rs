//! Core data model for booksync.
//!
//! Events come in, records are stored. Everything the reconciliation engine
//! reasons about lives here: the status lattice, money, add-ons, staff sets
//! and durations.

mod addon;
mod duration;
mod event;
mod money;
mod record;
mod staff;
mod status;

pub use addon::AddOns;
pub use duration::BookingDuration;
pub use event::BookingEvent;
pub use money::Money;
pub use record::{BookingRecord, RecordFields, RecordId};
pub use staff::{StaffRef, StaffSet};
pub use status::{Precedence, Status};

/// A malformed event. Surfaced immediately, never retried, and raised
/// before any store mutation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("event has an email but no start time; cannot match by customer slot")]
    IncompleteCustomerSlot,

    #[error("booking must end after it starts (start {start}, end {end})")]
    Duration { start: String, end: String },

    #[error("invalid add-ons: {0}")]
    AddOn(String),

    #[error("invalid amount: {0:?}")]
    Money(String),
}
