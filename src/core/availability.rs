//! Availability calculator - Free and busy 30-minute slots for one table on one date.
//!
//! Slots start at the opening time and step by [`SLOT_MINUTES`] while the slot start is
//! before closing time. A slot is busy when its start instant falls inside a confirmed
//! reservation's `[start, end)` interval, so a booking ending exactly at a slot start
//! leaves that slot free. On the venue's current date, slots that already started are
//! reported as unavailable too.

use crate::{
    context::{AppContext, local_date, local_instant},
    core::schedule,
    entities::{operating_hours, reservation},
    errors::{Error, Result},
};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Utc};
use serde::{Serialize, Serializer};
use tracing::{debug, instrument};

/// Slot length in minutes.
pub const SLOT_MINUTES: i64 = 30;

/// One slot of the availability grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Slot {
    /// Local start time, serialized as `HH:MM`
    #[serde(serialize_with = "serialize_hhmm")]
    pub time: NaiveTime,
    /// Whether a booking may start in this slot
    pub available: bool,
}

impl Slot {
    /// Start time formatted as `HH:MM`.
    #[must_use]
    pub fn label(&self) -> String {
        self.time.format("%H:%M").to_string()
    }
}

fn serialize_hhmm<S>(time: &NaiveTime, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_str(&time.format("%H:%M"))
}

/// Slot start times covering `[open, close)`.
#[must_use]
pub fn slot_starts(open: NaiveTime, close: NaiveTime) -> Vec<NaiveTime> {
    let step = Duration::minutes(SLOT_MINUTES);
    let mut starts = Vec::new();
    let mut current = open;

    while current < close {
        starts.push(current);
        let (next, wrapped) = current.overflowing_add_signed(step);
        if wrapped != 0 {
            break;
        }
        current = next;
    }
    starts
}

/// Builds the slot grid for `date` from its hours and the table's confirmed bookings.
pub fn compute_slots(
    date: NaiveDate,
    hours: &operating_hours::Model,
    reservations: &[reservation::Model],
    offset: FixedOffset,
    now: DateTime<Utc>,
) -> Result<Vec<Slot>> {
    let is_today = local_date(now, offset) == date;

    slot_starts(hours.open_time, hours.close_time)
        .into_iter()
        .map(|time| {
            let instant = local_instant(date, time, offset)?;
            let booked = reservations.iter().any(|r| r.covers(instant));
            let started = is_today && instant < now;
            Ok(Slot {
                time,
                available: !booked && !started,
            })
        })
        .collect()
}

/// Availability of `table_id` on `date`.
///
/// # Errors
/// - [`Error::TableNotFound`] if the table does not exist
/// - [`Error::Closed`] if no operating hours exist for that weekday
#[instrument(skip(ctx))]
pub async fn get_availability(
    ctx: &AppContext,
    date: NaiveDate,
    table_id: i64,
) -> Result<Vec<Slot>> {
    let db = &ctx.database;

    schedule::get_table_by_id(db, table_id)
        .await?
        .ok_or(Error::TableNotFound { id: table_id })?;

    let hours = schedule::get_hours_for_date(db, date)
        .await?
        .ok_or(Error::Closed { date })?;

    let reservations = schedule::confirmed_reservations_for_table(db, table_id).await?;
    let slots = compute_slots(date, &hours, &reservations, ctx.venue_offset, ctx.now())?;

    debug!(
        slots = slots.len(),
        free = slots.iter().filter(|s| s.available).count(),
        "Availability computed"
    );
    Ok(slots)
}
