//! Status lattice: the precedence order over booking lifecycle states.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A booking lifecycle status.
///
/// Closed set of known tokens plus a catch-all for anything a source sends
/// that we don't recognize. Unrecognized tokens are kept verbatim so they
/// round-trip through storage, but they rank lowest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Status {
    /// Voided before it took effect.
    Void,

    /// Cancelled.
    Stop,

    /// Pending confirmation.
    #[default]
    Pend,

    /// Held by staff.
    Hold,

    /// Waitlisted.
    Wait,

    /// Partially paid.
    Part,

    /// Paid in full.
    Paid,

    /// A token outside the known set, stored as received.
    Unrecognized(String),
}

/// Outcome of comparing the precedence of two statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precedence {
    Higher,
    Lower,
    Equal,

    /// Same rank, different meaning. Neither supersedes the other.
    Incomparable,
}

impl Status {
    /// Parse a status token. Never fails: unknown tokens become `Unrecognized`.
    pub fn parse(token: &str) -> Self {
        let token = token.trim();
        match token.to_ascii_uppercase().as_str() {
            "VOID" => Self::Void,
            "STOP" => Self::Stop,
            "PEND" => Self::Pend,
            "HOLD" => Self::Hold,
            "WAIT" => Self::Wait,
            "PART" => Self::Part,
            "PAID" => Self::Paid,
            _ => Self::Unrecognized(token.to_string()),
        }
    }

    /// The token this status is stored and displayed as.
    pub fn token(&self) -> &str {
        match self {
            Self::Void => "VOID",
            Self::Stop => "STOP",
            Self::Pend => "PEND",
            Self::Hold => "HOLD",
            Self::Wait => "WAIT",
            Self::Part => "PART",
            Self::Paid => "PAID",
            Self::Unrecognized(token) => token,
        }
    }

    /// Numeric rank in the precedence table.
    ///
    /// Cancellations and unrecognized tokens share the bottom rank.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Void | Self::Stop | Self::Unrecognized(_) => 0,
            Self::Pend => 1,
            Self::Hold | Self::Wait => 2,
            Self::Part => 3,
            Self::Paid => 4,
        }
    }

    /// Compare the precedence of `self` against `other`.
    ///
    /// `HOLD` and `WAIT` compare `Equal` even though they are distinct.
    /// Any other pair of distinct statuses sharing a rank is `Incomparable`.
    pub fn compare_precedence(&self, other: &Self) -> Precedence {
        if self == other {
            return Precedence::Equal;
        }
        match self.rank().cmp(&other.rank()) {
            std::cmp::Ordering::Greater => Precedence::Higher,
            std::cmp::Ordering::Less => Precedence::Lower,
            std::cmp::Ordering::Equal => match (self, other) {
                (Self::Hold, Self::Wait) | (Self::Wait, Self::Hold) => Precedence::Equal,
                _ => Precedence::Incomparable,
            },
        }
    }

    /// `VOID` and `STOP`.
    pub fn is_terminal_cancellation(&self) -> bool {
        matches!(self, Self::Void | Self::Stop)
    }

    /// Whether sibling duplicates may be deleted once the canonical record
    /// holds this status. Only `PAID` qualifies.
    pub fn is_cleanup_eligible(&self) -> bool {
        matches!(self, Self::Paid)
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unrecognized(_))
    }
}

impl From<String> for Status {
    fn from(token: String) -> Self {
        Self::parse(&token)
    }
}

impl From<Status> for String {
    fn from(status: Status) -> Self {
        status.token().to_string()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}
