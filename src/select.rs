//! Record selection: pick the canonical record among a candidate set, and
//! decide what an incoming status does to it.
//!
//! Selection is a pure function of the set. Candidates are ranked by status
//! precedence, then amount, then creation time, then id, so the same set
//! always yields the same canonical record whatever order the store
//! returned it in.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::model::{BookingRecord, Precedence, Status};

/// Drop repeated records. Racing reads can return a record more than once.
pub fn dedupe(candidates: Vec<BookingRecord>) -> Vec<BookingRecord> {
    let mut seen = BTreeSet::new();
    candidates
        .into_iter()
        .filter(|r| seen.insert(r.id))
        .collect()
}

/// The canonical record, or `None` for an empty set.
pub fn select(candidates: &[BookingRecord]) -> Option<&BookingRecord> {
    candidates.iter().reduce(|best, candidate| {
        if rank(candidate, best) == Ordering::Greater {
            candidate
        } else {
            best
        }
    })
}

/// Total order over candidates; greater is preferred.
fn rank(a: &BookingRecord, b: &BookingRecord) -> Ordering {
    a.status()
        .rank()
        .cmp(&b.status().rank())
        .then_with(|| a.fields.amount.cmp(&b.fields.amount))
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

/// What an incoming status does to the canonical record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusDecision {
    /// Write the record with this status.
    Apply(Status),

    /// Merge the other fields, keep the stored status.
    Keep,

    /// Acknowledge the event without touching the record.
    Reject,
}

/// Decide the status outcome of applying `incoming` to a record at `existing`.
///
/// - A `PAID` record only accepts `PAID`; anything else is rejected.
/// - A cancelled record only advances to `PAID`. Every other status,
///   including the other cancellation token, leaves it cancelled.
/// - A cancellation overrides any other record.
/// - A higher-precedence status advances the record.
/// - Equal, incomparable and lower statuses leave the stored status alone;
///   `HOLD` never replaces `WAIT`, nor the reverse.
/// - An event without a status leaves it alone too.
pub fn decide_status(existing: &Status, incoming: Option<&Status>) -> StatusDecision {
    let Some(incoming) = incoming else {
        return StatusDecision::Keep;
    };

    if existing.is_cleanup_eligible() {
        return if incoming == existing {
            StatusDecision::Apply(incoming.clone())
        } else {
            StatusDecision::Reject
        };
    }

    if existing.is_terminal_cancellation() {
        return if incoming.is_cleanup_eligible() {
            StatusDecision::Apply(incoming.clone())
        } else {
            StatusDecision::Keep
        };
    }

    if incoming.is_terminal_cancellation() {
        return StatusDecision::Apply(incoming.clone());
    }

    match incoming.compare_precedence(existing) {
        Precedence::Higher => StatusDecision::Apply(incoming.clone()),
        Precedence::Equal | Precedence::Lower | Precedence::Incomparable => StatusDecision::Keep,
    }
}
