//! booksync configuration.
//!
//! Loaded from `~/.booksync/config.toml`. Every key is optional; a missing
//! file means all defaults.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use jiff::SignedDuration;
use jiff::tz::TimeZone;
use serde::{Deserialize, Serialize};

use crate::reconcile::Settings;
use crate::retry::RetryPolicy;

/// booksync configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct Config {
    /// IANA zone every stored booking time is held in.
    pub timezone: String,

    /// Database file. Defaults to `~/.booksync/bookings.sqlite`.
    pub database: Option<PathBuf>,

    /// How long a store call may wait on a busy database.
    pub store_timeout_ms: u64,

    /// Attempts per store call, including the first.
    pub retry_attempts: u32,

    pub retry_initial_delay_ms: u64,

    /// Ids per delete call during duplicate cleanup.
    pub cleanup_batch_size: usize,

    /// Minimum gap between two reminders for the same booking and recipient.
    pub reminder_ttl_minutes: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timezone: "UTC".to_string(),
            database: None,
            store_timeout_ms: 5_000,
            retry_attempts: 3,
            retry_initial_delay_ms: 100,
            cleanup_batch_size: 10,
            reminder_ttl_minutes: 60,
        }
    }
}

impl Config {
    /// Load config from `~/.booksync/config.toml`.
    /// Returns defaults if the file is missing, an error if it is invalid.
    pub fn load() -> Result<Self, String> {
        match Self::path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load config from a specific file.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let contents = match fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(format!("failed to read {}: {e}", path.display())),
        };

        let config: Self = toml::from_str(&contents)
            .map_err(|e| format!("invalid config at {}: {e}", path.display()))?;

        if config.cleanup_batch_size == 0 {
            return Err(format!(
                "cleanup-batch-size must be at least 1 in {}",
                path.display()
            ));
        }
        config.time_zone()?;

        Ok(config)
    }

    /// The config file path: `~/.booksync/config.toml`.
    pub fn path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".booksync").join("config.toml"))
    }

    pub fn time_zone(&self) -> Result<TimeZone, String> {
        if self.timezone.eq_ignore_ascii_case("UTC") {
            return Ok(TimeZone::UTC);
        }
        TimeZone::get(&self.timezone)
            .map_err(|e| format!("unknown timezone {:?}: {e}", self.timezone))
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn reminder_ttl(&self) -> SignedDuration {
        SignedDuration::from_mins(self.reminder_ttl_minutes)
    }

    /// Engine settings derived from this config.
    pub fn settings(&self) -> Result<Settings, String> {
        Ok(Settings {
            timezone: self.time_zone()?,
            retry: RetryPolicy {
                max_attempts: self.retry_attempts.max(1),
                initial_delay: Duration::from_millis(self.retry_initial_delay_ms),
                ..RetryPolicy::default()
            },
            cleanup_batch_size: self.cleanup_batch_size,
        })
    }
}
