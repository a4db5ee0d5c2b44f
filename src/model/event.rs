//! Booking events: one inbound notification about a booking.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{AddOns, Money, StaffRef, Status, ValidationError};

/// Where an event came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventSource {
    #[default]
    Webhook,
    Script,
    Sms,
}

/// A booking lifecycle event. Ephemeral: never persisted as-is.
///
/// Callers map their transport payload into this shape. Every field is
/// optional on the wire; an absent field means "no information", never
/// "clear the stored value".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BookingEvent {
    pub source: EventSource,

    pub booking_code: Option<String>,
    pub customer_email: Option<String>,
    pub customer_name: Option<String>,

    pub status: Option<Status>,
    pub amount: Option<Money>,

    pub start: Option<Timestamp>,
    pub end: Option<Timestamp>,

    /// When the customer placed the booking, per the source.
    pub booked_at: Option<Timestamp>,

    /// Accepted for compatibility, never trusted: duration is always
    /// recomputed from `start` and `end`.
    pub duration: Option<String>,

    pub items: Option<String>,

    /// Add-ons in `"<qty> x <name> - $<price>, ..."` form.
    pub add_ons: Option<String>,

    pub onboarding_staff: Vec<StaffRef>,
    pub deloading_staff: Vec<StaffRef>,
}

impl BookingEvent {
    /// The booking code, trimmed, if non-empty.
    pub fn booking_code(&self) -> Option<&str> {
        non_empty(self.booking_code.as_deref())
    }

    /// The customer email, trimmed and lowercased, if non-empty.
    pub fn customer_email(&self) -> Option<String> {
        non_empty(self.customer_email.as_deref()).map(str::to_lowercase)
    }

    pub fn customer_name(&self) -> Option<&str> {
        non_empty(self.customer_name.as_deref())
    }

    pub fn items(&self) -> Option<&str> {
        non_empty(self.items.as_deref())
    }

    /// Parse the add-on string. Absent or blank means no add-ons.
    pub fn parsed_add_ons(&self) -> Result<AddOns, ValidationError> {
        match non_empty(self.add_ons.as_deref()) {
            Some(s) => s.parse(),
            None => Ok(AddOns::new()),
        }
    }

    /// Checks that can fail before any store access.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.parsed_add_ons()?;
        if let (Some(start), Some(end)) = (self.start, self.end)
            && end <= start
        {
            return Err(ValidationError::Duration {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(())
    }

    /// Hex SHA-256 of the event's JSON form.
    ///
    /// Identical deliveries share a digest, which ties replays together in logs.
    pub fn digest(&self) -> String {
        // Serializing plain data to a Vec cannot fail.
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        hex::encode(Sha256::digest(&bytes))
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}
