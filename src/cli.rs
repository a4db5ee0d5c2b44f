//! CLI interface for booksync.
//!
//! Non-interactive: arguments and JSON in, structured output out. Webhook
//! handlers, scripts and SMS hooks all feed events through `reconcile`.

mod format;

use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use jiff::Timestamp;

use crate::config::Config;
use crate::model::BookingEvent;
use crate::reconcile::Engine;
use crate::reminder::{Notifier, NotifyOutcome, ReminderOutcome, Reminders};
use crate::select::{dedupe, select};
use crate::store::{Filter, RecordStore, SqliteStore};

use format::{describe_result, format_record};

/// booksync: converge booking events on one record per booking.
#[derive(Debug, Parser)]
#[command(name = "booksync", after_long_help = USAGE_HELP)]
pub struct Cli {
    /// Database file. Overrides `database` in the config file.
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// IANA time zone stored times are held in. Overrides `timezone`.
    #[arg(long, global = true)]
    timezone: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

const USAGE_HELP: &str = r#"Examples:
  booksync reconcile --event delivery.json
  curl -s $HOOK | booksync reconcile
  booksync show ABC123
  booksync remind ABC123 --to +15550100

Event JSON (every field optional):
  {"bookingCode": "ABC123", "status": "PAID", "amount": "125.00",
   "start": "2026-10-19T10:00:00-07:00", "end": "2026-10-19T12:30:00-07:00",
   "addOns": "2 x Kayak - $15.00", "onboardingStaff": [{"id": "S1"}]}"#;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Reconcile one booking event into the store.
    ///
    /// Reads the event JSON from `--event` or stdin and prints the result
    /// as JSON. A one-line summary goes to stderr.
    Reconcile {
        /// Event file. Reads stdin when omitted.
        #[arg(long)]
        event: Option<PathBuf>,
    },

    /// Show the stored records for a booking code.
    Show {
        /// Booking code.
        code: String,
    },

    /// Send a reminder for a booking, at most once per TTL per recipient.
    Remind {
        /// Booking code.
        code: String,

        /// Recipient (phone number or address).
        #[arg(long)]
        to: String,
    },
}

/// Run the CLI, returning an error message on failure.
pub fn run(config: &Config) -> Result<(), String> {
    let cli = Cli::parse();

    let mut config = config.clone();
    if let Some(tz) = cli.timezone {
        config.timezone = tz;
    }
    let path = cli
        .db
        .or_else(|| config.database.clone())
        .or_else(SqliteStore::default_path)
        .ok_or("could not determine database path; pass --db")?;
    let store = SqliteStore::open(&path, config.store_timeout())
        .map_err(|e| format!("failed to open {}: {e}", path.display()))?;

    match cli.command {
        Command::Reconcile { event } => cmd_reconcile(&config, &store, event),
        Command::Show { code } => cmd_show(&store, &code),
        Command::Remind { code, to } => cmd_remind(&config, &store, &code, &to),
    }
}

fn cmd_reconcile(
    config: &Config,
    store: &SqliteStore,
    event: Option<PathBuf>,
) -> Result<(), String> {
    let json = match &event {
        Some(path) => fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {e}", path.display()))?,
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .map_err(|e| format!("failed to read stdin: {e}"))?;
            buf
        }
    };
    let event: BookingEvent =
        serde_json::from_str(&json).map_err(|e| format!("invalid event: {e}"))?;

    let engine = Engine::new(store, config.settings()?);
    let result = engine
        .reconcile(&event)
        .map_err(|e| format!("reconcile failed: {e}"))?;

    let out = serde_json::to_string_pretty(&result)
        .map_err(|e| format!("failed to serialize result: {e}"))?;
    println!("{out}");
    eprintln!("{}", describe_result(&result));
    Ok(())
}

fn cmd_show(store: &SqliteStore, code: &str) -> Result<(), String> {
    let records = store
        .find(&Filter::BookingCode(code.to_string()))
        .map_err(|e| format!("failed to look up {code}: {e}"))?;

    if records.is_empty() {
        println!("No records for {code}");
        return Ok(());
    }

    let canonical = select(&records).map(|r| r.id);
    for r in &records {
        let marker = if Some(r.id) == canonical { "*" } else { " " };
        println!("{marker} {}", format_record(r));
    }
    Ok(())
}

fn cmd_remind(
    config: &Config,
    store: &SqliteStore,
    code: &str,
    to: &str,
) -> Result<(), String> {
    let records = dedupe(
        store
            .find(&Filter::BookingCode(code.to_string()))
            .map_err(|e| format!("failed to look up {code}: {e}"))?,
    );
    let record = select(&records).ok_or_else(|| format!("no booking with code {code}"))?;

    let reminders = Reminders::new(store, &StdoutNotifier, config.reminder_ttl());
    let outcome = reminders
        .dispatch(record, to, Timestamp::now())
        .map_err(|e| format!("failed to record reminder: {e}"))?;

    match outcome {
        ReminderOutcome::Sent => eprintln!("Reminder sent to {to}"),
        ReminderOutcome::Suppressed { last_sent } => {
            eprintln!("Reminder already sent to {to} at {last_sent}; skipped");
        }
        ReminderOutcome::Failed(reason) => return Err(format!("reminder failed: {reason}")),
    }
    Ok(())
}

/// Prints messages instead of delivering them. Real channels plug in
/// through [`Notifier`].
struct StdoutNotifier;

impl Notifier for StdoutNotifier {
    fn send(&self, recipient: &str, message: &str) -> NotifyOutcome {
        match writeln!(io::stdout().lock(), "To {recipient}: {message}") {
            Ok(()) => NotifyOutcome::Sent,
            Err(e) => NotifyOutcome::Failed(e.to_string()),
        }
    }
}
