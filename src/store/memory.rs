//! In-memory record store for tests, with failure injection.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap, VecDeque};

use jiff::Timestamp;

use crate::model::{BookingRecord, RecordFields, RecordId};
use crate::reminder::SentCache;

use super::{Filter, RecordStore, Result, StoreError};

/// Store operations, for failure injection and call counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Find,
    Get,
    Create,
    Update,
    Delete,
}

pub struct MemoryStore {
    records: RefCell<BTreeMap<RecordId, BookingRecord>>,
    /// Seconds since the epoch handed to the next created record.
    clock: Cell<i64>,
    failures: RefCell<VecDeque<(Op, StoreError)>>,
    partial_delete: Cell<Option<usize>>,
    repeat_finds: Cell<bool>,
    calls: RefCell<Vec<Op>>,
    deleted: RefCell<Vec<RecordId>>,
    sent: RefCell<HashMap<String, Timestamp>>,
    max_batch: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_max_batch(10)
    }

    pub fn with_max_batch(max_batch: usize) -> Self {
        Self {
            records: RefCell::new(BTreeMap::new()),
            clock: Cell::new(1_700_000_000),
            failures: RefCell::new(VecDeque::new()),
            partial_delete: Cell::new(None),
            repeat_finds: Cell::new(false),
            calls: RefCell::new(Vec::new()),
            deleted: RefCell::new(Vec::new()),
            sent: RefCell::new(HashMap::new()),
            max_batch,
        }
    }

    /// Seed a record directly, bypassing call accounting.
    pub fn seed(&self, fields: RecordFields) -> RecordId {
        let record = self.new_record(fields);
        let id = record.id;
        self.records.borrow_mut().insert(id, record);
        id
    }

    /// Fail the next call of `op` with `err`.
    pub fn fail_next(&self, op: Op, err: StoreError) {
        self.failures.borrow_mut().push_back((op, err));
    }

    /// Make the next delete remove only its first `n` ids, then fail.
    pub fn fail_delete_after(&self, n: usize) {
        self.partial_delete.set(Some(n));
    }

    /// Make every find return each match twice, as racing reads can.
    pub fn repeat_finds(&self) {
        self.repeat_finds.set(true);
    }

    pub fn records(&self) -> Vec<BookingRecord> {
        self.records.borrow().values().cloned().collect()
    }

    pub fn calls(&self, op: Op) -> usize {
        self.calls.borrow().iter().filter(|c| **c == op).count()
    }

    /// Every id a delete call actually removed, in order.
    pub fn deleted(&self) -> Vec<RecordId> {
        self.deleted.borrow().clone()
    }

    fn enter(&self, op: Op) -> Result<()> {
        self.calls.borrow_mut().push(op);
        let mut failures = self.failures.borrow_mut();
        if let Some(pos) = failures.iter().position(|(o, _)| *o == op)
            && let Some((_, err)) = failures.remove(pos)
        {
            return Err(err);
        }
        Ok(())
    }

    fn new_record(&self, fields: RecordFields) -> BookingRecord {
        let secs = self.clock.get();
        self.clock.set(secs + 60);
        BookingRecord {
            id: RecordId::new(),
            created_at: Timestamp::new(secs, 0).unwrap_or(Timestamp::UNIX_EPOCH),
            fields,
        }
    }
}

fn matches(filter: &Filter, record: &BookingRecord) -> bool {
    let fields = &record.fields;
    match filter {
        Filter::BookingCode(code) => fields.booking_code.as_deref() == Some(code.as_str()),
        Filter::CustomerSlot { email, date, start } => {
            fields.customer_email.as_deref() == Some(email.as_str())
                && fields.start.as_ref().is_some_and(|z| {
                    z.date() == *date
                        && z.time().hour() == start.hour()
                        && z.time().minute() == start.minute()
                })
        }
    }
}

impl RecordStore for MemoryStore {
    fn find(&self, filter: &Filter) -> Result<Vec<BookingRecord>> {
        self.enter(Op::Find)?;
        let found: Vec<BookingRecord> = self
            .records
            .borrow()
            .values()
            .filter(|r| matches(filter, r))
            .cloned()
            .collect();
        if self.repeat_finds.get() {
            return Ok(found.iter().chain(found.iter()).cloned().collect());
        }
        Ok(found)
    }

    fn get(&self, id: RecordId) -> Result<BookingRecord> {
        self.enter(Op::Get)?;
        self.records
            .borrow()
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    fn create(&self, fields: &RecordFields) -> Result<BookingRecord> {
        self.enter(Op::Create)?;
        let record = self.new_record(fields.clone());
        self.records.borrow_mut().insert(record.id, record.clone());
        Ok(record)
    }

    fn update(&self, id: RecordId, fields: &RecordFields) -> Result<BookingRecord> {
        self.enter(Op::Update)?;
        let mut records = self.records.borrow_mut();
        let record = records.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        record.fields = fields.clone();
        Ok(record.clone())
    }

    fn delete(&self, ids: &[RecordId]) -> Result<()> {
        self.enter(Op::Delete)?;
        if ids.len() > self.max_batch {
            return Err(StoreError::Rejected("batch too large".into()));
        }
        let limit = self.partial_delete.take();
        let mut records = self.records.borrow_mut();
        for (i, id) in ids.iter().enumerate() {
            if limit.is_some_and(|n| i >= n) {
                return Err(StoreError::Unavailable("connection reset mid-batch".into()));
            }
            if records.remove(id).is_some() {
                self.deleted.borrow_mut().push(*id);
            }
        }
        Ok(())
    }

    fn max_batch(&self) -> usize {
        self.max_batch
    }
}

impl SentCache for MemoryStore {
    fn last_sent(&self, key: &str) -> Result<Option<Timestamp>> {
        Ok(self.sent.borrow().get(key).copied())
    }

    fn mark_sent(&self, key: &str, at: Timestamp) -> Result<()> {
        self.sent.borrow_mut().insert(key.to_string(), at);
        Ok(())
    }
}
