//! `SQLite`-backed record store.
//!
//! One `bookings` table holds the complete field set of every record. The
//! local booking date and start time are stored alongside the zoned start
//! so the customer-slot lookup is a plain indexed equality match.

use std::path::{Path, PathBuf};
use std::time::Duration;

use jiff::{Timestamp, Zoned};
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row};

use crate::model::{
    AddOns, BookingDuration, BookingRecord, Money, RecordFields, RecordId, StaffSet, Status,
};
use crate::reminder::SentCache;

use super::{Filter, RecordStore, Result, StoreError};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS bookings (
    id               TEXT PRIMARY KEY,
    created_at       TEXT NOT NULL,
    booking_code     TEXT,
    customer_name    TEXT,
    customer_email   TEXT,
    status           TEXT NOT NULL,
    amount_cents     INTEGER,
    start_at         TEXT,
    end_at           TEXT,
    booked_at        TEXT,
    booking_date     TEXT,
    start_time       TEXT,
    duration_minutes INTEGER,
    items            TEXT,
    add_ons          TEXT NOT NULL DEFAULT '',
    onboarding       TEXT NOT NULL DEFAULT '[]',
    deloading        TEXT NOT NULL DEFAULT '[]'
);
CREATE INDEX IF NOT EXISTS bookings_by_code ON bookings (booking_code);
CREATE INDEX IF NOT EXISTS bookings_by_slot ON bookings (customer_email, booking_date, start_time);
CREATE TABLE IF NOT EXISTS sent_marks (
    key     TEXT PRIMARY KEY,
    sent_at TEXT NOT NULL
);
";

const COLUMNS: &str = "id, created_at, booking_code, customer_name, customer_email, status, \
    amount_cents, start_at, end_at, booked_at, duration_minutes, items, add_ons, onboarding, \
    deloading";

/// Record store over a single `SQLite` database file.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens (or creates) the database at `path`.
    ///
    /// `timeout` bounds how long any call waits on a locked database before
    /// failing with [`StoreError::Unavailable`].
    pub fn open(path: impl AsRef<Path>, timeout: Duration) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Rejected(format!("{}: {e}", parent.display())))?;
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(timeout)?;
        Self::init(conn)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    /// Returns the default database path: `~/.booksync/bookings.sqlite`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".booksync").join("bookings.sqlite"))
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    fn query(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<BookingRecord>> {
        let mut stmt = self.conn.prepare(sql)?;
        let raws = stmt
            .query_map(params, RawRow::read)?
            .collect::<core::result::Result<Vec<_>, _>>()?;
        raws.into_iter().map(RawRow::decode).collect()
    }
}

impl RecordStore for SqliteStore {
    fn find(&self, filter: &Filter) -> Result<Vec<BookingRecord>> {
        match filter {
            Filter::BookingCode(code) => self.query(
                &format!(
                    "SELECT {COLUMNS} FROM bookings WHERE booking_code = ?1 ORDER BY created_at, id"
                ),
                [code],
            ),
            Filter::CustomerSlot { email, date, start } => self.query(
                &format!(
                    "SELECT {COLUMNS} FROM bookings
                     WHERE customer_email = ?1 AND booking_date = ?2 AND start_time = ?3
                     ORDER BY created_at, id"
                ),
                [
                    email.clone(),
                    date.to_string(),
                    start.strftime("%H:%M").to_string(),
                ],
            ),
        }
    }

    fn get(&self, id: RecordId) -> Result<BookingRecord> {
        let raw = self
            .conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM bookings WHERE id = ?1"),
                [id.to_string()],
                RawRow::read,
            )
            .optional()?;
        raw.ok_or(StoreError::NotFound(id))?.decode()
    }

    fn create(&self, fields: &RecordFields) -> Result<BookingRecord> {
        let record = BookingRecord {
            id: RecordId::new(),
            created_at: Timestamp::now(),
            fields: fields.clone(),
        };
        let cols = Encoded::new(fields)?;
        self.conn.execute(
            "INSERT INTO bookings (id, created_at, booking_code, customer_name, customer_email,
                status, amount_cents, start_at, end_at, booked_at, booking_date, start_time,
                duration_minutes, items, add_ons, onboarding, deloading)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
            rusqlite::params![
                record.id.to_string(),
                record.created_at.to_string(),
                fields.booking_code,
                fields.customer_name,
                fields.customer_email,
                cols.status,
                cols.amount_cents,
                cols.start_at,
                cols.end_at,
                cols.booked_at,
                cols.booking_date,
                cols.start_time,
                cols.duration_minutes,
                fields.items,
                cols.add_ons,
                cols.onboarding,
                cols.deloading,
            ],
        )?;
        Ok(record)
    }

    fn update(&self, id: RecordId, fields: &RecordFields) -> Result<BookingRecord> {
        let cols = Encoded::new(fields)?;
        let rows = self.conn.execute(
            "UPDATE bookings
             SET booking_code = ?1, customer_name = ?2, customer_email = ?3, status = ?4,
                 amount_cents = ?5, start_at = ?6, end_at = ?7, booked_at = ?8,
                 booking_date = ?9, start_time = ?10, duration_minutes = ?11, items = ?12,
                 add_ons = ?13, onboarding = ?14, deloading = ?15
             WHERE id = ?16",
            rusqlite::params![
                fields.booking_code,
                fields.customer_name,
                fields.customer_email,
                cols.status,
                cols.amount_cents,
                cols.start_at,
                cols.end_at,
                cols.booked_at,
                cols.booking_date,
                cols.start_time,
                cols.duration_minutes,
                fields.items,
                cols.add_ons,
                cols.onboarding,
                cols.deloading,
                id.to_string(),
            ],
        )?;
        if rows == 0 {
            return Err(StoreError::NotFound(id));
        }
        self.get(id)
    }

    fn delete(&self, ids: &[RecordId]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        if ids.len() > self.max_batch() {
            return Err(StoreError::Rejected(format!(
                "delete batch of {} exceeds limit of {}",
                ids.len(),
                self.max_batch()
            )));
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        self.conn.execute(
            &format!("DELETE FROM bookings WHERE id IN ({placeholders})"),
            rusqlite::params_from_iter(ids.iter().map(ToString::to_string)),
        )?;
        Ok(())
    }
}

impl SentCache for SqliteStore {
    fn last_sent(&self, key: &str) -> Result<Option<Timestamp>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT sent_at FROM sent_marks WHERE key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()?;
        raw.map(|s| {
            s.parse::<Timestamp>()
                .map_err(|e| StoreError::Corrupt(format!("invalid sent_at: {e}")))
        })
        .transpose()
    }

    fn mark_sent(&self, key: &str, at: Timestamp) -> Result<()> {
        self.conn.execute(
            "INSERT INTO sent_marks (key, sent_at) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET sent_at = excluded.sent_at",
            rusqlite::params![key, at.to_string()],
        )?;
        Ok(())
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        match &e {
            rusqlite::Error::SqliteFailure(failure, _)
                if matches!(
                    failure.code,
                    ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked
                ) =>
            {
                Self::Unavailable(e.to_string())
            }
            _ => Self::Rejected(e.to_string()),
        }
    }
}

/// Column values derived from a field set.
struct Encoded {
    status: String,
    amount_cents: Option<i64>,
    start_at: Option<String>,
    end_at: Option<String>,
    booked_at: Option<String>,
    booking_date: Option<String>,
    start_time: Option<String>,
    duration_minutes: Option<u32>,
    add_ons: String,
    onboarding: String,
    deloading: String,
}

impl Encoded {
    fn new(fields: &RecordFields) -> Result<Self> {
        let staff_json = |set: &StaffSet| {
            serde_json::to_string(set)
                .map_err(|e| StoreError::Rejected(format!("unencodable staff set: {e}")))
        };
        Ok(Self {
            status: fields.status.token().to_string(),
            amount_cents: fields.amount.map(Money::cents),
            start_at: fields.start.as_ref().map(Zoned::to_string),
            end_at: fields.end.as_ref().map(Zoned::to_string),
            booked_at: fields.booked_at.as_ref().map(Zoned::to_string),
            booking_date: fields.start.as_ref().map(|z| z.date().to_string()),
            start_time: fields
                .start
                .as_ref()
                .map(|z| z.time().strftime("%H:%M").to_string()),
            duration_minutes: fields.duration.map(BookingDuration::total_minutes),
            add_ons: fields.add_ons.to_string(),
            onboarding: staff_json(&fields.onboarding)?,
            deloading: staff_json(&fields.deloading)?,
        })
    }
}

/// A row as read from the `bookings` table, before decoding.
struct RawRow {
    id: String,
    created_at: String,
    booking_code: Option<String>,
    customer_name: Option<String>,
    customer_email: Option<String>,
    status: String,
    amount_cents: Option<i64>,
    start_at: Option<String>,
    end_at: Option<String>,
    booked_at: Option<String>,
    duration_minutes: Option<u32>,
    items: Option<String>,
    add_ons: String,
    onboarding: String,
    deloading: String,
}

impl RawRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            created_at: row.get(1)?,
            booking_code: row.get(2)?,
            customer_name: row.get(3)?,
            customer_email: row.get(4)?,
            status: row.get(5)?,
            amount_cents: row.get(6)?,
            start_at: row.get(7)?,
            end_at: row.get(8)?,
            booked_at: row.get(9)?,
            duration_minutes: row.get(10)?,
            items: row.get(11)?,
            add_ons: row.get(12)?,
            onboarding: row.get(13)?,
            deloading: row.get(14)?,
        })
    }

    fn decode(self) -> Result<BookingRecord> {
        let id = self
            .id
            .parse::<RecordId>()
            .map_err(|e| StoreError::Corrupt(format!("invalid record id: {e}")))?;
        let created_at = self
            .created_at
            .parse::<Timestamp>()
            .map_err(|e| StoreError::Corrupt(format!("invalid created_at on {id}: {e}")))?;
        let add_ons = self
            .add_ons
            .parse::<AddOns>()
            .map_err(|e| StoreError::Corrupt(format!("invalid add-ons on {id}: {e}")))?;
        let staff = |json: &str| -> Result<StaffSet> {
            serde_json::from_str(json)
                .map_err(|e| StoreError::Corrupt(format!("invalid staff set on {id}: {e}")))
        };

        Ok(BookingRecord {
            id,
            created_at,
            fields: RecordFields {
                booking_code: self.booking_code,
                customer_name: self.customer_name,
                customer_email: self.customer_email,
                status: Status::parse(&self.status),
                amount: self.amount_cents.map(Money::from_cents),
                start: parse_zoned(self.start_at.as_deref(), "start_at", id)?,
                end: parse_zoned(self.end_at.as_deref(), "end_at", id)?,
                booked_at: parse_zoned(self.booked_at.as_deref(), "booked_at", id)?,
                duration: self.duration_minutes.and_then(BookingDuration::from_minutes),
                items: self.items,
                add_ons,
                onboarding: staff(&self.onboarding)?,
                deloading: staff(&self.deloading)?,
            },
        })
    }
}

fn parse_zoned(raw: Option<&str>, column: &str, id: RecordId) -> Result<Option<Zoned>> {
    raw.map(|s| {
        s.parse::<Zoned>()
            .map_err(|e| StoreError::Corrupt(format!("invalid {column} on {id}: {e}")))
    })
    .transpose()
}
