//! Booking duration, derived from the start and end of a booking.

use std::fmt;

use jiff::Zoned;
use serde::{Deserialize, Serialize};

use super::ValidationError;

/// Length of a booking in whole minutes. Always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct BookingDuration(u32);

impl BookingDuration {
    /// Compute `end - start`, truncated to whole minutes.
    pub fn between(start: &Zoned, end: &Zoned) -> Result<Self, ValidationError> {
        let seconds = end.timestamp().as_second() - start.timestamp().as_second();
        let minutes = seconds / 60;
        if minutes <= 0 {
            return Err(ValidationError::Duration {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        u32::try_from(minutes)
            .map(Self)
            .map_err(|_| ValidationError::Duration {
                start: start.to_string(),
                end: end.to_string(),
            })
    }

    pub fn from_minutes(minutes: u32) -> Option<Self> {
        (minutes > 0).then_some(Self(minutes))
    }

    pub const fn total_minutes(self) -> u32 {
        self.0
    }

    pub const fn hours(self) -> u32 {
        self.0 / 60
    }

    pub const fn remainder_minutes(self) -> u32 {
        self.0 % 60
    }
}

impl TryFrom<u32> for BookingDuration {
    type Error = String;

    fn try_from(minutes: u32) -> Result<Self, Self::Error> {
        Self::from_minutes(minutes).ok_or_else(|| "duration must be positive".to_string())
    }
}

impl From<BookingDuration> for u32 {
    fn from(duration: BookingDuration) -> Self {
        duration.0
    }
}

impl fmt::Display for BookingDuration {
    /// `2 hours 30 minutes`, `1 hour`, `45 minutes`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plural = |n: u32| if n == 1 { "" } else { "s" };
        let (hours, minutes) = (self.hours(), self.remainder_minutes());
        match (hours, minutes) {
            (0, m) => write!(f, "{m} minute{}", plural(m)),
            (h, 0) => write!(f, "{h} hour{}", plural(h)),
            (h, m) => write!(f, "{h} hour{} {m} minute{}", plural(h), plural(m)),
        }
    }
}
