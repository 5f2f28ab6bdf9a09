//! Shared state handed to every operation.
//!
//! [`AppContext`] holds the database connection together with the injected clock and
//! notifier and the lock registries that serialize contended writes. [`Customer`] is
//! the authenticated caller supplied by the outer auth layer.

use crate::core::clock::{Clock, SystemClock};
use crate::core::locks::KeyedLocks;
use crate::core::notify::{LogNotifier, Notifier};
use crate::errors::{Error, Result};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

/// The authenticated user an operation runs on behalf of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Customer {
    /// Stable user identifier
    pub id: String,
    /// Name used in greetings
    pub username: String,
    /// Address for confirmations, if known
    pub email: Option<String>,
}

impl Customer {
    /// Creates a customer without an email address.
    #[must_use]
    pub fn new(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            email: None,
        }
    }

    /// Sets the confirmation address.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Everything an operation needs besides its own arguments.
pub struct AppContext {
    /// Database connection for all storage operations
    pub database: DatabaseConnection,
    /// Source of "now"
    pub clock: Arc<dyn Clock>,
    /// Outbound confirmations
    pub notifier: Arc<dyn Notifier>,
    /// Venue's local time offset
    pub venue_offset: FixedOffset,
    /// Serializes reservation commits per table id
    pub table_locks: KeyedLocks<i64>,
    /// Serializes cart mutations per user id
    pub cart_locks: KeyedLocks<String>,
}

impl AppContext {
    /// Creates a context using the system clock and the logging notifier.
    #[must_use]
    pub fn new(database: DatabaseConnection, venue_offset: FixedOffset) -> Self {
        Self {
            database,
            clock: Arc::new(SystemClock),
            notifier: Arc::new(LogNotifier),
            venue_offset,
            table_locks: KeyedLocks::new(),
            cart_locks: KeyedLocks::new(),
        }
    }

    /// Replaces the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the notifier.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Current instant according to the injected clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Calendar date at the venue for `instant`.
    #[must_use]
    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        local_date(instant, self.venue_offset)
    }

    /// Absolute instant of a local date and time-of-day at the venue.
    pub fn local_instant(&self, date: NaiveDate, time: NaiveTime) -> Result<DateTime<Utc>> {
        local_instant(date, time, self.venue_offset)
    }
}

/// Calendar date in `offset` for `instant`.
#[must_use]
pub fn local_date(instant: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    instant.with_timezone(&offset).date_naive()
}

/// Absolute instant of `date` at `time` in `offset`.
pub fn local_instant(
    date: NaiveDate,
    time: NaiveTime,
    offset: FixedOffset,
) -> Result<DateTime<Utc>> {
    date.and_time(time)
        .and_local_timezone(offset)
        .single()
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| Error::validation("date", format!("{date} {time} is not a valid local time")))
}
