//! Shared test utilities for the ordering and reservation core.
//!
//! This module provides helpers for setting up an in-memory database, a context with
//! a pinned clock, and fixture records with sensible defaults.

use crate::{
    config::database::{create_connection, create_tables},
    context::{AppContext, Customer},
    core::{
        catalog,
        clock::FixedClock,
        notify::{Notification, Notifier, NotifyError},
        reservation::{self, ReservationRequest},
        schedule,
    },
    entities,
    errors::Result,
};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tokio::sync::mpsc;

const TEST_CATEGORY_SLUG: &str = "test-dishes";

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = create_connection("sqlite::memory:").await?;
    create_tables(&db).await?;
    Ok(db)
}

/// The instant every test starts at: Wednesday 2030-01-02 10:00 UTC.
#[allow(clippy::unwrap_used)]
pub fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 1, 2, 10, 0, 0).unwrap()
}

/// The venue offset used in tests (UTC).
#[allow(clippy::unwrap_used)]
pub fn utc_offset() -> FixedOffset {
    FixedOffset::east_opt(0).unwrap()
}

/// The Monday after [`test_now`], weekday 0.
#[allow(clippy::unwrap_used)]
pub fn next_monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2030, 1, 7).unwrap()
}

/// Shorthand for a time of day.
#[allow(clippy::unwrap_used)]
pub fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
}

/// `date` at `time`, read as UTC.
pub fn utc(date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
    date.and_time(time).and_utc()
}

/// An amount given in cents.
pub fn money(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

/// The default caller, without an email address.
pub fn test_customer() -> Customer {
    Customer::new("guest", "Guest")
}

/// Sets up a fresh database and a context whose clock is pinned at [`test_now`].
/// Returns the clock so tests can move time forward.
pub async fn setup_context() -> Result<(AppContext, Arc<FixedClock>)> {
    let db = setup_test_db().await?;
    let clock = Arc::new(FixedClock::new(test_now()));
    let ctx = AppContext::new(db, utc_offset()).with_clock(Arc::clone(&clock) as _);
    Ok((ctx, clock))
}

/// A context on `db` with a pinned clock and the given notifier.
pub fn context_with_notifier(db: DatabaseConnection, notifier: Arc<dyn Notifier>) -> AppContext {
    AppContext::new(db, utc_offset())
        .with_clock(Arc::new(FixedClock::new(test_now())))
        .with_notifier(notifier)
}

/// Creates an active table.
pub async fn create_test_table(
    db: &DatabaseConnection,
    name: &str,
    capacity: i32,
) -> Result<entities::dining_table::Model> {
    schedule::create_table(db, name, capacity).await
}

/// Opens the venue on Mondays from 09:00 to 17:00.
pub async fn open_monday(db: &DatabaseConnection) -> Result<entities::operating_hours::Model> {
    schedule::set_operating_hours(db, 0, hm(9, 0), hm(17, 0)).await
}

/// Books a table for [`test_customer`].
pub async fn book(
    ctx: &AppContext,
    party_size: i32,
    date: NaiveDate,
    start_time: NaiveTime,
    end_time: NaiveTime,
) -> Result<entities::reservation::Model> {
    reservation::create_reservation(
        ctx,
        &test_customer(),
        ReservationRequest {
            party_size,
            date,
            start_time,
            end_time,
        },
    )
    .await
}

/// Creates a plain dish in a shared test category.
///
/// # Defaults
/// * category: "Test Dishes", created on first use
/// * spiciness 0, no nuts, not vegetarian, not featured
pub async fn create_test_dish(
    db: &DatabaseConnection,
    name: &str,
    price: Decimal,
) -> Result<entities::dish::Model> {
    if catalog::get_category_by_slug(db, TEST_CATEGORY_SLUG)
        .await?
        .is_none()
    {
        catalog::create_category(db, "Test Dishes", Some(TEST_CATEGORY_SLUG)).await?;
    }
    catalog::create_dish(db, catalog::NewDish::new(TEST_CATEGORY_SLUG, name, price)).await
}

/// Records every notification on a channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    sender: mpsc::UnboundedSender<Notification>,
}

impl ChannelNotifier {
    /// Returns the notifier and the receiving end of its outbox.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl Notifier for ChannelNotifier {
    async fn send(&self, notification: Notification) -> std::result::Result<(), NotifyError> {
        self.sender.send(notification).map_err(|e| NotifyError {
            message: e.to_string(),
        })
    }
}

/// A notifier whose transport is always down.
#[derive(Debug, Clone, Copy)]
pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn send(&self, _notification: Notification) -> std::result::Result<(), NotifyError> {
        Err(NotifyError {
            message: "transport unavailable".to_string(),
        })
    }
}
