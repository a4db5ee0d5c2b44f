//! The record store collaborator.
//!
//! The engine only talks to storage through [`RecordStore`]. Lookups take a
//! [`Filter`] of typed predicates; implementations bind its values as
//! parameters and never splice them into query text.

#[cfg(test)]
pub mod memory;
mod sqlite;

use jiff::civil::{Date, Time};

use crate::model::{BookingRecord, RecordFields, RecordId};

pub use sqlite::SqliteStore;

/// Errors a store can report.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(RecordId),

    /// Timeouts, busy or locked databases, 5xx and rate limits.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store refused the request and will refuse it again.
    #[error("store rejected request: {0}")]
    Rejected(String),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

impl StoreError {
    /// Only transient failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

pub type Result<T> = core::result::Result<T, StoreError>;

/// A parameterized lookup predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Exact match on booking code.
    BookingCode(String),

    /// Exact match on (customer email, local booking date, local start time).
    CustomerSlot {
        email: String,
        date: Date,
        start: Time,
    },
}

/// Record storage as seen by the reconciliation engine.
///
/// Every call is bounded by a timeout the caller fixes when constructing the
/// store (`store-timeout-ms`; see [`SqliteStore::open`]). A call that runs
/// out of time fails with [`StoreError::Unavailable`], which the engine
/// retries with backoff. No call blocks indefinitely.
pub trait RecordStore {
    /// All records matching `filter`. Order is unspecified.
    fn find(&self, filter: &Filter) -> Result<Vec<BookingRecord>>;

    /// A single record by id.
    fn get(&self, id: RecordId) -> Result<BookingRecord>;

    /// Store a new record. The store assigns its id and creation time.
    fn create(&self, fields: &RecordFields) -> Result<BookingRecord>;

    /// Replace a record's complete field set.
    fn update(&self, id: RecordId, fields: &RecordFields) -> Result<BookingRecord>;

    /// Delete up to [`max_batch`](Self::max_batch) records.
    ///
    /// Ids that no longer exist are ignored.
    fn delete(&self, ids: &[RecordId]) -> Result<()>;

    /// Largest number of ids one `delete` call accepts.
    fn max_batch(&self) -> usize {
        10
    }
}
