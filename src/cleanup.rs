//! Duplicate cleanup: delete non-canonical siblings once a booking is settled.
//!
//! Deletes run in batches no larger than the store allows. When a batch
//! fails partway, the ids that are already gone are dropped from the retry,
//! so nothing is deleted twice. Failures are reported, never raised: the
//! canonical record is already correct by the time cleanup runs.

use serde::Serialize;

use crate::model::RecordId;
use crate::retry::RetryPolicy;
use crate::store::{RecordStore, StoreError};

/// What a cleanup pass achieved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub deleted: Vec<RecordId>,
    pub failed: Vec<RecordId>,
}

impl CleanupReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Delete `siblings` of `canonical`.
///
/// The canonical id is never deleted, even if it appears among the siblings.
/// `batch_size` is clamped to the store's own limit.
pub fn cleanup<S: RecordStore + ?Sized>(
    store: &S,
    canonical: RecordId,
    siblings: &[RecordId],
    batch_size: usize,
    retry: &RetryPolicy,
) -> CleanupReport {
    let mut pending: Vec<RecordId> = Vec::new();
    for id in siblings {
        if *id != canonical && !pending.contains(id) {
            pending.push(*id);
        }
    }

    let batch_size = batch_size.min(store.max_batch()).max(1);
    let mut report = CleanupReport::default();
    for batch in pending.chunks(batch_size) {
        delete_batch(store, batch, retry, &mut report);
    }

    if report.is_complete() {
        tracing::info!(
            canonical = %canonical,
            deleted = report.deleted.len(),
            "removed duplicate records"
        );
    } else {
        tracing::warn!(
            canonical = %canonical,
            deleted = report.deleted.len(),
            failed = report.failed.len(),
            "duplicate cleanup incomplete; will converge on a later reconciliation"
        );
    }
    report
}

fn delete_batch<S: RecordStore + ?Sized>(
    store: &S,
    batch: &[RecordId],
    retry: &RetryPolicy,
    report: &mut CleanupReport,
) {
    let mut remaining = batch.to_vec();
    let attempts = retry.max_attempts.max(1);

    for attempt in 1..=attempts {
        let err = match store.delete(&remaining) {
            Ok(()) => {
                report.deleted.append(&mut remaining);
                return;
            }
            Err(err) => err,
        };
        tracing::warn!(attempt, batch = remaining.len(), error = %err, "delete batch failed");

        // Keep only the ids that are still there.
        let (gone, still_there) = partition_deleted(store, &remaining);
        report.deleted.extend(gone);
        remaining = still_there;

        if remaining.is_empty() {
            return;
        }
        if !err.is_retryable() || attempt == attempts {
            break;
        }
        std::thread::sleep(retry.delay_for_retry(attempt - 1));
    }

    report.failed.append(&mut remaining);
}

/// Split `ids` into those the store no longer has and those it may still have.
fn partition_deleted<S: RecordStore + ?Sized>(
    store: &S,
    ids: &[RecordId],
) -> (Vec<RecordId>, Vec<RecordId>) {
    let mut gone = Vec::new();
    let mut still_there = Vec::new();
    for id in ids {
        match store.get(*id) {
            Err(StoreError::NotFound(_)) => gone.push(*id),
            _ => still_there.push(*id),
        }
    }
    (gone, still_there)
}
