//! Output formatting for CLI display.

use crate::model::{BookingRecord, StaffSet};
use crate::reconcile::{Action, ReconciliationResult};

/// One-line summary of a reconciliation for stderr.
pub(super) fn describe_result(result: &ReconciliationResult) -> String {
    let short_id = result.record_id.short();
    let verb = match result.action {
        Action::Created => "created",
        Action::Updated => "updated",
        Action::Rejected => "kept (event rejected)",
        Action::SkippedDedup => "created without dedup",
    };
    let mut line = format!("{verb} {short_id} [{}]", result.final_status);
    if let Some(report) = &result.cleanup {
        line.push_str(&format!(", removed {} duplicate(s)", report.deleted.len()));
        if !report.failed.is_empty() {
            line.push_str(&format!(", {} left for a later run", report.failed.len()));
        }
    }
    line
}

/// One line per record: id, status, customer, start, duration, amount.
pub(super) fn format_record(record: &BookingRecord) -> String {
    let f = &record.fields;
    let mut parts = vec![record.id.short(), format!("[{}]", f.status)];
    if let Some(name) = &f.customer_name {
        parts.push(name.clone());
    }
    if let Some(start) = &f.start {
        parts.push(start.strftime("%Y-%m-%d %H:%M %Z").to_string());
    }
    if let Some(duration) = f.duration {
        parts.push(format!("({duration})"));
    }
    if let Some(amount) = f.amount {
        parts.push(format!("${amount}"));
    }
    if !f.add_ons.is_empty() {
        parts.push(format!("+ {}", f.add_ons));
    }
    for (label, staff) in [("onboarding", &f.onboarding), ("deloading", &f.deloading)] {
        if !staff.is_empty() {
            parts.push(format!("{label}: {}", staff_names(staff)));
        }
    }
    parts.join("  ")
}

/// Staff names, falling back to ids where no name is known.
fn staff_names(staff: &StaffSet) -> String {
    staff
        .iter()
        .map(|s| s.name.as_deref().unwrap_or(s.id.as_str()))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    use jiff::Timestamp;

    use crate::cleanup::CleanupReport;
    use crate::model::{Money, RecordFields, RecordId, StaffRef, Status};

    fn result(action: Action, cleanup: Option<CleanupReport>) -> ReconciliationResult {
        ReconciliationResult {
            action,
            record_id: RecordId::new(),
            final_status: Status::Paid,
            event_digest: String::new(),
            cleanup,
        }
    }

    #[test]
    fn describes_each_action() {
        let cases = [
            (Action::Created, "created "),
            (Action::Updated, "updated "),
            (Action::Rejected, "kept (event rejected) "),
            (Action::SkippedDedup, "created without dedup "),
        ];
        for (action, prefix) in cases {
            let line = describe_result(&result(action, None));
            assert!(line.starts_with(prefix), "{line}");
            assert!(line.ends_with("[PAID]"), "{line}");
        }
    }

    #[test]
    fn describes_cleanup() {
        let report = CleanupReport {
            deleted: vec![RecordId::new()],
            failed: vec![RecordId::new(), RecordId::new()],
        };
        let line = describe_result(&result(Action::Updated, Some(report)));
        assert!(line.ends_with(", removed 1 duplicate(s), 2 left for a later run"));
    }

    #[test]
    fn formats_record_line() {
        let record = BookingRecord {
            id: RecordId::new(),
            created_at: Timestamp::UNIX_EPOCH,
            fields: RecordFields {
                status: Status::Part,
                customer_name: Some("Jane Doe".into()),
                amount: Some(Money::from_cents(12_550)),
                ..Default::default()
            },
        };
        let line = format_record(&record);
        assert!(line.ends_with("  [PART]  Jane Doe  $125.50"), "{line}");
    }

    #[test]
    fn lists_staff_by_name_or_id() {
        let record = BookingRecord {
            id: RecordId::new(),
            created_at: Timestamp::UNIX_EPOCH,
            fields: RecordFields {
                onboarding: vec![
                    StaffRef {
                        id: "S1".into(),
                        name: Some("Ana".into()),
                    },
                    StaffRef::new("S2"),
                ]
                .into(),
                ..Default::default()
            },
        };
        let line = format_record(&record);
        assert!(line.ends_with("  onboarding: Ana, S2"), "{line}");
        assert!(!line.contains("deloading"), "{line}");
    }
}
