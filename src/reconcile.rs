//! The reconciliation engine: one idempotent upsert per booking event.
//!
//! resolve identity → find candidates → select canonical → decide status →
//! merge fields → create or update → clean up duplicates.
//!
//! The write and the cleanup are separate steps, each safe to repeat. If the
//! process dies between them, replaying the same event lands on the same
//! canonical record, rewrites the same field set, and finishes the cleanup.
//! There is no locking across calls; the store is the only shared state.

use jiff::tz::TimeZone;
use serde::Serialize;

use crate::cleanup::{CleanupReport, cleanup};
use crate::identity::{self, IdentityQuery};
use crate::merge::merge_fields;
use crate::model::{BookingEvent, BookingRecord, RecordFields, RecordId, Status, ValidationError};
use crate::retry::RetryPolicy;
use crate::select::{StatusDecision, decide_status, dedupe, select};
use crate::store::{RecordStore, StoreError};

/// Errors that fail a reconciliation. Rejections are not errors.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What reconciliation did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    /// No existing record matched; a new one was created.
    Created,

    /// The canonical record was rewritten with the merged field set.
    Updated,

    /// The event would have downgraded a paid booking. Nothing was written.
    Rejected,

    /// The event carried no usable identity; a record was created without
    /// any dedup attempt.
    SkippedDedup,
}

/// Outcome of one reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationResult {
    pub action: Action,
    pub record_id: RecordId,
    pub final_status: Status,
    pub event_digest: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleanup: Option<CleanupReport>,
}

/// Engine tuning.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Zone every stored time is held in.
    pub timezone: TimeZone,
    pub retry: RetryPolicy,
    pub cleanup_batch_size: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            timezone: TimeZone::UTC,
            retry: RetryPolicy::default(),
            cleanup_batch_size: 10,
        }
    }
}

/// Reconciles booking events against a record store.
pub struct Engine<'s, S: ?Sized> {
    store: &'s S,
    settings: Settings,
}

impl<'s, S: RecordStore + ?Sized> Engine<'s, S> {
    pub fn new(store: &'s S, settings: Settings) -> Self {
        Self { store, settings }
    }

    /// Reconcile one event into the store.
    pub fn reconcile(&self, event: &BookingEvent) -> Result<ReconciliationResult, ReconcileError> {
        let digest = event.digest();
        let span = tracing::info_span!(
            "reconcile",
            source = ?event.source,
            booking_code = event.booking_code().unwrap_or(""),
            digest = &digest[..12],
        );
        let _enter = span.enter();

        event.validate()?;
        if let Some(status) = &event.status
            && !status.is_recognized()
        {
            tracing::warn!(token = status.token(), "unrecognized status token; ranking it lowest");
        }

        let query = identity::resolve(event, &self.settings.timezone)?;
        let IdentityQuery::Lookup(filter) = query else {
            tracing::warn!("event has no booking code or email; creating without dedup");
            let record = self.create(event)?;
            return Ok(self.finish(Action::SkippedDedup, &record, digest, None));
        };

        let candidates = dedupe(self.retry("find", || self.store.find(&filter))?);
        let Some(canonical) = select(&candidates) else {
            let record = self.create(event)?;
            return Ok(self.finish(Action::Created, &record, digest, None));
        };
        let siblings: Vec<RecordId> = candidates
            .iter()
            .map(|r| r.id)
            .filter(|id| *id != canonical.id)
            .collect();

        let (action, record) = match decide_status(canonical.status(), event.status.as_ref()) {
            StatusDecision::Reject => {
                tracing::info!(
                    record_id = %canonical.id,
                    incoming = event.status.as_ref().map_or("", Status::token),
                    "event would downgrade a paid booking; rejected"
                );
                (Action::Rejected, canonical.clone())
            }
            StatusDecision::Apply(status) => {
                (Action::Updated, self.update(canonical, event, status)?)
            }
            StatusDecision::Keep => {
                let status = canonical.status().clone();
                (Action::Updated, self.update(canonical, event, status)?)
            }
        };

        let report = (record.status().is_cleanup_eligible() && !siblings.is_empty()).then(|| {
            cleanup(
                self.store,
                record.id,
                &siblings,
                self.settings.cleanup_batch_size,
                &self.settings.retry,
            )
        });

        Ok(self.finish(action, &record, digest, report))
    }

    fn create(&self, event: &BookingEvent) -> Result<BookingRecord, ReconcileError> {
        let status = event.status.clone().unwrap_or_default();
        let fields = merge_fields(
            &RecordFields::default(),
            event,
            status,
            &self.settings.timezone,
        )?;
        Ok(self.retry("create", || self.store.create(&fields))?)
    }

    fn update(
        &self,
        canonical: &BookingRecord,
        event: &BookingEvent,
        status: Status,
    ) -> Result<BookingRecord, ReconcileError> {
        let fields = merge_fields(&canonical.fields, event, status, &self.settings.timezone)?;
        if fields == canonical.fields {
            tracing::debug!(record_id = %canonical.id, "merged fields unchanged; skipping write");
            return Ok(canonical.clone());
        }
        Ok(self.retry("update", || self.store.update(canonical.id, &fields))?)
    }

    fn retry<T>(
        &self,
        what: &str,
        op: impl FnMut() -> crate::store::Result<T>,
    ) -> crate::store::Result<T> {
        self.settings.retry.run(what, op)
    }

    fn finish(
        &self,
        action: Action,
        record: &BookingRecord,
        event_digest: String,
        cleanup: Option<CleanupReport>,
    ) -> ReconciliationResult {
        tracing::info!(
            action = ?action,
            record_id = %record.id,
            status = %record.status(),
            "reconciled"
        );
        ReconciliationResult {
            action,
            record_id: record.id,
            final_status: record.status().clone(),
            event_digest,
            cleanup,
        }
    }
}
