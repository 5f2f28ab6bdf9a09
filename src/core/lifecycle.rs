//! Reservation lifecycle - Cancellation and the active/past history split.
//!
//! Cancellation is terminal and only allowed before the booking starts. History is
//! partitioned against a single "now" read once per request: only `Confirmed`
//! bookings that have not ended are active, so every reservation lands in exactly
//! one of the two lists.

use crate::{
    context::{AppContext, Customer},
    entities::{Reservation, ReservationStatus, reservation},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::Serialize;
use tracing::{info, instrument};

/// A user's reservations split into upcoming and finished.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReservationHistory {
    /// Confirmed and not yet ended, earliest first
    pub active: Vec<reservation::Model>,
    /// Not confirmed or already ended, latest first
    pub past: Vec<reservation::Model>,
}

/// Splits `reservations` into active and past as seen at `now`.
#[must_use]
pub fn partition_history(
    reservations: Vec<reservation::Model>,
    now: DateTime<Utc>,
) -> ReservationHistory {
    let (mut past, mut active): (Vec<_>, Vec<_>) = reservations
        .into_iter()
        .partition(|r| r.status != ReservationStatus::Confirmed || r.end_time < now);

    active.sort_by(|a, b| a.start_time.cmp(&b.start_time).then(a.id.cmp(&b.id)));
    past.sort_by(|a, b| b.start_time.cmp(&a.start_time).then(b.id.cmp(&a.id)));

    ReservationHistory { active, past }
}

/// Finds one of `customer`'s reservations.
pub async fn get_reservation<C>(
    db: &C,
    customer: &Customer,
    reservation_id: i64,
) -> Result<Option<reservation::Model>>
where
    C: ConnectionTrait,
{
    Reservation::find_by_id(reservation_id)
        .filter(reservation::Column::UserId.eq(customer.id.as_str()))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Cancels a reservation owned by `customer`.
///
/// # Errors
/// - [`Error::ReservationNotFound`] if the reservation does not exist or belongs to someone else
/// - [`Error::AlreadyStarted`] if its start is not in the future
/// - [`Error::AlreadyCancelled`] if it was cancelled before
#[instrument(skip(ctx, customer), fields(user_id = %customer.id))]
pub async fn cancel_reservation(
    ctx: &AppContext,
    customer: &Customer,
    reservation_id: i64,
) -> Result<reservation::Model> {
    let txn = ctx.database.begin().await?;

    let existing = get_reservation(&txn, customer, reservation_id)
        .await?
        .ok_or(Error::ReservationNotFound { id: reservation_id })?;

    if existing.start_time <= ctx.now() {
        return Err(Error::AlreadyStarted { id: reservation_id });
    }
    if existing.status == ReservationStatus::Cancelled {
        return Err(Error::AlreadyCancelled { id: reservation_id });
    }

    let mut active: reservation::ActiveModel = existing.into();
    active.status = Set(ReservationStatus::Cancelled);
    let cancelled = active.update(&txn).await?;

    txn.commit().await?;

    info!(reservation_id, table_id = cancelled.table_id, "Reservation cancelled");
    Ok(cancelled)
}

/// Active and past reservations of `customer`.
#[instrument(skip(ctx, customer), fields(user_id = %customer.id))]
pub async fn reservation_history(
    ctx: &AppContext,
    customer: &Customer,
) -> Result<ReservationHistory> {
    let now = ctx.now();
    let reservations = Reservation::find()
        .filter(reservation::Column::UserId.eq(customer.id.as_str()))
        .order_by_asc(reservation::Column::Id)
        .all(&ctx.database)
        .await?;

    Ok(partition_history(reservations, now))
}
