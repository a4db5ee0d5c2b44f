//! Booking reminders, deduplicated through an injected "last sent" cache.
//!
//! The cache and the notification channel are both collaborators: nothing
//! here holds state of its own between calls.

use jiff::{SignedDuration, Timestamp};

use crate::model::BookingRecord;
use crate::store;

/// Key-value record of when something was last sent.
pub trait SentCache {
    fn last_sent(&self, key: &str) -> store::Result<Option<Timestamp>>;
    fn mark_sent(&self, key: &str, at: Timestamp) -> store::Result<()>;
}

/// Result of handing a message to a notification channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyOutcome {
    Sent,
    Failed(String),
}

/// A channel that delivers a formatted message to a recipient.
pub trait Notifier {
    fn send(&self, recipient: &str, message: &str) -> NotifyOutcome;
}

/// What happened to one reminder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReminderOutcome {
    Sent,

    /// Already sent within the TTL.
    Suppressed { last_sent: Timestamp },

    Failed(String),
}

/// Reminder dispatch over a cache and a channel.
pub struct Reminders<'a, C: ?Sized, N: ?Sized> {
    cache: &'a C,
    notifier: &'a N,
    ttl: SignedDuration,
}

impl<'a, C, N> Reminders<'a, C, N>
where
    C: SentCache + ?Sized,
    N: Notifier + ?Sized,
{
    pub fn new(cache: &'a C, notifier: &'a N, ttl: SignedDuration) -> Self {
        Self {
            cache,
            notifier,
            ttl,
        }
    }

    /// Send a reminder for `record` to `recipient` unless one went out
    /// within the TTL. The cache is only marked after a successful send.
    pub fn dispatch(
        &self,
        record: &BookingRecord,
        recipient: &str,
        now: Timestamp,
    ) -> store::Result<ReminderOutcome> {
        let key = format!("reminder:{}:{recipient}", record.id);

        if let Some(last_sent) = self.cache.last_sent(&key)?
            && now.duration_since(last_sent) < self.ttl
        {
            tracing::debug!(%key, %last_sent, "reminder suppressed");
            return Ok(ReminderOutcome::Suppressed { last_sent });
        }

        match self.notifier.send(recipient, &format_reminder(record)) {
            NotifyOutcome::Sent => {
                self.cache.mark_sent(&key, now)?;
                tracing::info!(%key, "reminder sent");
                Ok(ReminderOutcome::Sent)
            }
            NotifyOutcome::Failed(reason) => {
                tracing::warn!(%key, %reason, "reminder failed");
                Ok(ReminderOutcome::Failed(reason))
            }
        }
    }
}

/// Human-readable reminder text for a record.
pub fn format_reminder(record: &BookingRecord) -> String {
    let f = &record.fields;
    let mut message = String::from("Reminder: booking");
    if let Some(code) = &f.booking_code {
        message.push_str(&format!(" {code}"));
    }
    if let Some(name) = &f.customer_name {
        message.push_str(&format!(" for {name}"));
    }
    if let Some(start) = &f.start {
        message.push_str(&format!(" on {}", start.strftime("%a %b %-d at %-I:%M %p")));
    }
    if let Some(duration) = f.duration {
        message.push_str(&format!(" ({duration})"));
    }
    message.push('.');
    if let Some(items) = &f.items {
        message.push_str(&format!(" Items: {items}."));
    }
    if !f.add_ons.is_empty() {
        message.push_str(&format!(" Add-ons: {}.", f.add_ons));
    }
    message
}
