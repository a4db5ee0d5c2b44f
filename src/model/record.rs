//! Booking records: the persisted, authoritative view of a booking.

use std::fmt;
use std::str::FromStr;

use jiff::{Timestamp, Zoned};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AddOns, BookingDuration, Money, StaffSet, Status};

/// Storage identifier of a booking record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(Uuid);

impl RecordId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The first eight characters, for human-facing output.
    pub fn short(&self) -> String {
        self.0.to_string()[..8].to_string()
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for RecordId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

/// The complete field set of a booking record.
///
/// Writes always carry the whole set, never a patch, so a record is never
/// left half-updated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordFields {
    pub booking_code: Option<String>,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub status: Status,
    pub amount: Option<Money>,
    pub start: Option<Zoned>,
    pub end: Option<Zoned>,
    pub booked_at: Option<Zoned>,
    pub duration: Option<BookingDuration>,
    pub items: Option<String>,
    pub add_ons: AddOns,
    pub onboarding: StaffSet,
    pub deloading: StaffSet,
}

/// A stored booking record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRecord {
    pub id: RecordId,

    /// When the store created the record. Used as the recency tie-breaker.
    pub created_at: Timestamp,

    #[serde(flatten)]
    pub fields: RecordFields,
}

impl BookingRecord {
    pub fn status(&self) -> &Status {
        &self.fields.status
    }
}
