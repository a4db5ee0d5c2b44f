//! Identity resolution for incoming booking events.
//!
//! An event is matched against stored records through a chain of strategies,
//! first usable one wins:
//!
//! 1. Booking code: exact match on the code, treated as an opaque token.
//! 2. Customer slot: exact match on (email, local booking date, local start
//!    time). Never combined with the booking code.
//! 3. Nothing usable: the event is create-only and no dedup is attempted.

use jiff::civil;
use jiff::tz::TimeZone;

use crate::model::{BookingEvent, ValidationError};
use crate::store::Filter;

/// How an event's existing records should be looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityQuery {
    /// Query the store with this filter to get the candidate set.
    Lookup(Filter),

    /// No identity to match on. Always create.
    CreateOnly,
}

/// Resolve the identity query for `event`.
///
/// Dates and times for the customer-slot strategy are taken in `tz`, the
/// zone records are stored in.
///
/// An email without a start time cannot form a customer slot, and is a
/// validation error rather than a silent create.
pub fn resolve(event: &BookingEvent, tz: &TimeZone) -> Result<IdentityQuery, ValidationError> {
    // 1. Booking code.
    if let Some(code) = event.booking_code() {
        return Ok(IdentityQuery::Lookup(Filter::BookingCode(code.to_string())));
    }

    // 2. Customer email + booking date + start time.
    if let Some(email) = event.customer_email() {
        let start = event
            .start
            .ok_or(ValidationError::IncompleteCustomerSlot)?
            .to_zoned(tz.clone());
        let time = start.time();
        return Ok(IdentityQuery::Lookup(Filter::CustomerSlot {
            email,
            date: start.date(),
            start: civil::time(time.hour(), time.minute(), 0, 0),
        }));
    }

    // 3. Degraded: nothing to match on.
    Ok(IdentityQuery::CreateOnly)
}
