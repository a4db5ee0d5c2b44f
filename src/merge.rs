//! Field merge policies: how an incoming event combines with a stored record.
//!
//! | Field | Policy |
//! |---|---|
//! | code, name, email, amount, items | overwrite when the event has a value |
//! | start, end, booked-at | overwrite when present, always held in the target zone |
//! | duration | recomputed from start and end, never taken from the event |
//! | onboarding, deloading staff | set union, never cleared |
//! | add-ons | merge by normalized name, last writer wins per name |
//! | status | decided by the caller, see [`crate::select::decide_status`] |
//!
//! Applying the same event twice gives the same field set as applying it once.

use jiff::Timestamp;
use jiff::tz::TimeZone;

use crate::model::{BookingDuration, BookingEvent, RecordFields, Status, ValidationError};

/// Merge `event` onto `base`, producing the complete field set to write.
///
/// `base` is the canonical record's fields, or the defaults for a new record.
pub fn merge_fields(
    base: &RecordFields,
    event: &BookingEvent,
    status: Status,
    tz: &TimeZone,
) -> Result<RecordFields, ValidationError> {
    let mut add_ons = base.add_ons.clone();
    add_ons.merge(&event.parsed_add_ons()?);

    let mut onboarding = base.onboarding.clone();
    onboarding.union(&event.onboarding_staff);
    let mut deloading = base.deloading.clone();
    deloading.union(&event.deloading_staff);

    let in_zone = |incoming: Option<Timestamp>, stored: &Option<jiff::Zoned>| {
        incoming
            .map(|ts| ts.to_zoned(tz.clone()))
            .or_else(|| stored.as_ref().map(|z| z.with_time_zone(tz.clone())))
    };
    let start = in_zone(event.start, &base.start);
    let end = in_zone(event.end, &base.end);
    let booked_at = in_zone(event.booked_at, &base.booked_at);

    let duration = match (&start, &end) {
        (Some(start), Some(end)) => Some(BookingDuration::between(start, end)?),
        _ => None,
    };

    Ok(RecordFields {
        booking_code: overwrite(event.booking_code(), base.booking_code.as_deref()),
        customer_name: overwrite(event.customer_name(), base.customer_name.as_deref()),
        customer_email: event
            .customer_email()
            .or_else(|| base.customer_email.clone()),
        status,
        amount: event.amount.or(base.amount),
        start,
        end,
        booked_at,
        duration,
        items: overwrite(event.items(), base.items.as_deref()),
        add_ons,
        onboarding,
        deloading,
    })
}

fn overwrite(incoming: Option<&str>, stored: Option<&str>) -> Option<String> {
    incoming.or(stored).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    use jiff::tz::offset;

    use crate::model::{AddOns, Money, StaffRef, StaffSet};

    fn event_at(start: &str, end: &str) -> BookingEvent {
        BookingEvent {
            start: Some(start.parse().unwrap()),
            end: Some(end.parse().unwrap()),
            ..Default::default()
        }
    }

    #[test]
    fn duration_is_recomputed_not_copied() {
        let mut event = event_at("2026-10-19T10:00:00Z", "2026-10-19T12:30:00Z");
        event.duration = Some("45 minutes".into());

        let fields =
            merge_fields(&RecordFields::default(), &event, Status::Pend, &TimeZone::UTC).unwrap();
        assert_eq!(fields.duration.unwrap().to_string(), "2 hours 30 minutes");
    }

    #[test]
    fn new_end_before_stored_start_is_invalid() {
        let stored = merge_fields(
            &RecordFields::default(),
            &event_at("2026-10-19T10:00:00Z", "2026-10-19T12:00:00Z"),
            Status::Pend,
            &TimeZone::UTC,
        )
        .unwrap();
        let event = BookingEvent {
            end: Some("2026-10-19T09:00:00Z".parse().unwrap()),
            ..Default::default()
        };

        let err = merge_fields(&stored, &event, Status::Pend, &TimeZone::UTC).unwrap_err();
        assert!(matches!(err, ValidationError::Duration { .. }));
    }

    #[test]
    fn times_are_held_in_target_zone() {
        let tz = TimeZone::fixed(offset(-7));
        let event = event_at("2026-10-19T17:00:00Z", "2026-10-19T19:00:00Z");

        let fields = merge_fields(&RecordFields::default(), &event, Status::Pend, &tz).unwrap();
        let start = fields.start.unwrap();
        assert_eq!(start.hour(), 10);
        assert_eq!(start.offset(), offset(-7));
    }

    #[test]
    fn absent_values_keep_stored_ones() {
        let base = RecordFields {
            customer_name: Some("Jane".into()),
            amount: Some(Money::from_cents(500)),
            items: Some("Tour".into()),
            ..Default::default()
        };
        let event = BookingEvent {
            customer_name: Some("  ".into()),
            ..Default::default()
        };

        let fields = merge_fields(&base, &event, Status::Pend, &TimeZone::UTC).unwrap();
        assert_eq!(fields.customer_name.as_deref(), Some("Jane"));
        assert_eq!(fields.amount, Some(Money::from_cents(500)));
        assert_eq!(fields.items.as_deref(), Some("Tour"));
    }

    #[test]
    fn present_values_overwrite() {
        let base = RecordFields {
            amount: Some(Money::from_cents(500)),
            customer_email: Some("old@example.com".into()),
            ..Default::default()
        };
        let event = BookingEvent {
            amount: Some(Money::from_cents(900)),
            customer_email: Some("New@Example.com".into()),
            ..Default::default()
        };

        let fields = merge_fields(&base, &event, Status::Pend, &TimeZone::UTC).unwrap();
        assert_eq!(fields.amount, Some(Money::from_cents(900)));
        assert_eq!(fields.customer_email.as_deref(), Some("new@example.com"));
    }

    #[test]
    fn staff_survive_events_without_staff() {
        let base = RecordFields {
            onboarding: StaffSet::from(vec![StaffRef::new("S1")]),
            ..Default::default()
        };

        let fields =
            merge_fields(&base, &BookingEvent::default(), Status::Pend, &TimeZone::UTC).unwrap();
        assert!(fields.onboarding.contains("S1"));
        assert_eq!(fields.onboarding.len(), 1);
    }

    #[test]
    fn staff_are_unioned() {
        let base = RecordFields {
            deloading: StaffSet::from(vec![StaffRef::new("S1")]),
            ..Default::default()
        };
        let event = BookingEvent {
            deloading_staff: vec![StaffRef::new("S1"), StaffRef::new("S2")],
            ..Default::default()
        };

        let fields = merge_fields(&base, &event, Status::Pend, &TimeZone::UTC).unwrap();
        assert_eq!(fields.deloading.len(), 2);
    }

    #[test]
    fn add_ons_merge_across_events() {
        let mut fields = RecordFields::default();
        for add_ons in ["A - $5.00", "B - $3.00", "a - $7.00"] {
            let event = BookingEvent {
                add_ons: Some(add_ons.into()),
                ..Default::default()
            };
            fields = merge_fields(&fields, &event, Status::Pend, &TimeZone::UTC).unwrap();
        }
        let expected: AddOns = "A - $7.00, B - $3.00".parse().unwrap();
        assert_eq!(fields.add_ons, expected);
    }

    #[test]
    fn merging_twice_equals_merging_once() {
        let event = BookingEvent {
            booking_code: Some("X".into()),
            amount: Some(Money::from_cents(100)),
            add_ons: Some("2 x Kayak - $15.00".into()),
            onboarding_staff: vec![StaffRef::new("S1")],
            ..event_at("2026-10-19T10:00:00Z", "2026-10-19T11:00:00Z")
        };

        let once =
            merge_fields(&RecordFields::default(), &event, Status::Part, &TimeZone::UTC).unwrap();
        let twice = merge_fields(&once, &event, Status::Part, &TimeZone::UTC).unwrap();
        assert_eq!(once, twice);
    }
}
