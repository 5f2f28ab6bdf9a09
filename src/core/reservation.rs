//! Reservation allocator - Picks a table for a party and commits the booking.
//!
//! A request is checked in a fixed order and each failure has its own error:
//! closed day, duration over [`MAX_DURATION_HOURS`], window outside operating hours,
//! start not in the future, start not before end, overlap with a confirmed booking.
//!
//! The overlap check and the insert run inside one database transaction while the
//! table's entry in [`AppContext::table_locks`] is held, so two requests for the same
//! table cannot both pass the check.

use crate::{
    context::{AppContext, Customer, local_instant},
    core::{notify, schedule},
    entities::{ReservationStatus, dining_table, operating_hours, reservation},
    errors::{Error, Result},
};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Utc};
use sea_orm::{Set, TransactionTrait, prelude::*};
use tracing::{info, instrument, warn};

/// Longest booking accepted online; longer stays are arranged with the venue directly.
pub const MAX_DURATION_HOURS: i64 = 10;

/// A customer's booking request in venue-local terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservationRequest {
    /// Number of guests
    pub party_size: i32,
    /// Local calendar date
    pub date: NaiveDate,
    /// Local start time
    pub start_time: NaiveTime,
    /// Local end time on the same date
    pub end_time: NaiveTime,
}

/// Runs the time-window checks and returns the absolute `[start, end)` interval.
///
/// `hours` is `None` when the venue is closed on the requested weekday.
pub fn validate_window(
    request: &ReservationRequest,
    hours: Option<&operating_hours::Model>,
    offset: FixedOffset,
    now: DateTime<Utc>,
) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let hours = hours.ok_or(Error::Closed { date: request.date })?;

    let start = local_instant(request.date, request.start_time, offset)?;
    let end = local_instant(request.date, request.end_time, offset)?;

    if end - start > Duration::hours(MAX_DURATION_HOURS) {
        return Err(Error::DurationExceeded {
            max_hours: MAX_DURATION_HOURS,
        });
    }

    if request.start_time < hours.open_time || request.end_time > hours.close_time {
        return Err(Error::OutOfHours {
            open: hours.open_time,
            close: hours.close_time,
        });
    }

    if start <= now {
        return Err(Error::InThePast);
    }

    if start >= end {
        return Err(Error::InvalidWindow);
    }

    Ok((start, end))
}

/// First confirmed booking in `existing` that intersects `[start, end)`.
#[must_use]
pub fn find_conflict(
    existing: &[reservation::Model],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Option<&reservation::Model> {
    existing
        .iter()
        .filter(|r| r.status == ReservationStatus::Confirmed)
        .find(|r| r.overlaps(start, end))
}

/// Books the tightest-fitting table for `request` on behalf of `customer`.
///
/// On success a confirmation is sent in the background; delivery problems never
/// affect the returned reservation.
///
/// # Errors
/// - [`Error::Validation`] for a non-positive party size
/// - [`Error::NoTableAvailable`] when no active table seats the party
/// - [`Error::Closed`], [`Error::DurationExceeded`], [`Error::OutOfHours`],
///   [`Error::InThePast`], [`Error::InvalidWindow`] for window violations
/// - [`Error::ReservationConflict`] when the table is already booked
#[instrument(skip(ctx, customer), fields(user_id = %customer.id))]
pub async fn create_reservation(
    ctx: &AppContext,
    customer: &Customer,
    request: ReservationRequest,
) -> Result<reservation::Model> {
    if request.party_size <= 0 {
        return Err(Error::validation(
            "party_size",
            format!("Party size must be positive, got {}", request.party_size),
        ));
    }

    let table = schedule::find_tightest_table(&ctx.database, request.party_size)
        .await?
        .ok_or(Error::NoTableAvailable {
            party_size: request.party_size,
        })?;

    let _table_guard = ctx.table_locks.lock(table.id).await;
    let txn = ctx.database.begin().await?;

    let hours = schedule::get_hours_for_date(&txn, request.date).await?;
    let now = ctx.now();
    let (start, end) = validate_window(&request, hours.as_ref(), ctx.venue_offset, now)?;

    let existing = schedule::confirmed_reservations_for_table(&txn, table.id).await?;
    if let Some(conflict) = find_conflict(&existing, start, end) {
        warn!(
            table_id = table.id,
            conflicting_id = conflict.id,
            "Reservation rejected: overlapping booking"
        );
        return Err(Error::ReservationConflict { table_id: table.id });
    }

    let booked = reservation::ActiveModel {
        user_id: Set(customer.id.clone()),
        table_id: Set(table.id),
        party_size: Set(request.party_size),
        start_time: Set(start),
        end_time: Set(end),
        status: Set(ReservationStatus::Confirmed),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    info!(
        reservation_id = booked.id,
        table_id = table.id,
        %start,
        %end,
        "Reservation confirmed"
    );

    send_confirmation(ctx, customer, &table, &booked);
    Ok(booked)
}

fn send_confirmation(
    ctx: &AppContext,
    customer: &Customer,
    table: &dining_table::Model,
    booked: &reservation::Model,
) {
    let start = booked.start_time.with_timezone(&ctx.venue_offset);
    let end = booked.end_time.with_timezone(&ctx.venue_offset);

    let subject = format!("Your Table Reservation is Confirmed! (ID: #{})", booked.id);
    let body = format!(
        "Hi {},\n\nYour reservation is confirmed:\n\n\
         Table: {}\nGuests: {}\nDate: {}\nTime: {} - {}\n\n\
         We look forward to seeing you!",
        customer.username,
        table.name,
        booked.party_size,
        start.format("%Y-%m-%d"),
        start.format("%H:%M"),
        end.format("%H:%M"),
    );

    notify::dispatch_to(&ctx.notifier, customer.email.as_deref(), subject, body);
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::availability::get_availability;
    use crate::test_utils::*;
    use std::sync::Arc;

    fn monday_hours() -> operating_hours::Model {
        operating_hours::Model {
            id: 1,
            weekday: 0,
            open_time: hm(9, 0),
            close_time: hm(17, 0),
        }
    }

    fn request(start: NaiveTime, end: NaiveTime) -> ReservationRequest {
        ReservationRequest {
            party_size: 2,
            date: next_monday(),
            start_time: start,
            end_time: end,
        }
    }

    #[test]
    fn test_validate_window_accepts_valid_request() {
        let (start, end) = validate_window(
            &request(hm(12, 0), hm(13, 30)),
            Some(&monday_hours()),
            utc_offset(),
            test_now(),
        )
        .unwrap();
        assert_eq!(start, utc(next_monday(), hm(12, 0)));
        assert_eq!(end, utc(next_monday(), hm(13, 30)));
    }

    #[test]
    fn test_validate_window_closed_day() {
        let result = validate_window(&request(hm(12, 0), hm(13, 0)), None, utc_offset(), test_now());
        assert!(matches!(result.unwrap_err(), Error::Closed { .. }));
    }

    #[test]
    fn test_validate_window_duration_checked_before_hours() {
        // 11 hours and also outside 09:00-17:00; duration wins
        let hours = operating_hours::Model {
            close_time: hm(23, 0),
            ..monday_hours()
        };
        let result = validate_window(
            &request(hm(9, 0), hm(20, 0)),
            Some(&hours),
            utc_offset(),
            test_now(),
        );
        assert!(matches!(
            result.unwrap_err(),
            Error::DurationExceeded { max_hours: 10 }
        ));

        let result = validate_window(
            &request(hm(8, 0), hm(19, 0)),
            Some(&monday_hours()),
            utc_offset(),
            test_now(),
        );
        assert!(matches!(
            result.unwrap_err(),
            Error::DurationExceeded { .. }
        ));
    }

    #[test]
    fn test_validate_window_exactly_ten_hours_is_allowed() {
        let hours = operating_hours::Model {
            open_time: hm(8, 0),
            close_time: hm(22, 0),
            ..monday_hours()
        };
        assert!(
            validate_window(
                &request(hm(10, 0), hm(20, 0)),
                Some(&hours),
                utc_offset(),
                test_now()
            )
            .is_ok()
        );
    }

    #[test]
    fn test_validate_window_out_of_hours() {
        for (start, end) in [(hm(8, 30), hm(10, 0)), (hm(16, 0), hm(17, 30))] {
            let result = validate_window(
                &request(start, end),
                Some(&monday_hours()),
                utc_offset(),
                test_now(),
            );
            assert!(matches!(result.unwrap_err(), Error::OutOfHours { .. }));
        }

        // Ending exactly at closing time is inside the window
        assert!(
            validate_window(
                &request(hm(16, 0), hm(17, 0)),
                Some(&monday_hours()),
                utc_offset(),
                test_now()
            )
            .is_ok()
        );
    }

    #[test]
    fn test_validate_window_in_the_past() {
        let today = ReservationRequest {
            date: test_now().date_naive(),
            ..request(hm(9, 0), hm(9, 30))
        };
        let result = validate_window(&today, Some(&monday_hours()), utc_offset(), test_now());
        assert!(matches!(result.unwrap_err(), Error::InThePast));
    }

    #[test]
    fn test_validate_window_inverted_window() {
        let result = validate_window(
            &request(hm(14, 0), hm(13, 0)),
            Some(&monday_hours()),
            utc_offset(),
            test_now(),
        );
        assert!(matches!(result.unwrap_err(), Error::InvalidWindow));

        let result = validate_window(
            &request(hm(14, 0), hm(14, 0)),
            Some(&monday_hours()),
            utc_offset(),
            test_now(),
        );
        assert!(matches!(result.unwrap_err(), Error::InvalidWindow));
    }

    #[tokio::test]
    async fn test_create_reservation_picks_tightest_table() -> Result<()> {
        let (ctx, _clock) = setup_context().await?;
        create_test_table(&ctx.database, "Family", 8).await?;
        let booth = create_test_table(&ctx.database, "Booth", 4).await?;
        create_test_table(&ctx.database, "Window", 2).await?;
        open_monday(&ctx.database).await?;

        let booked = book(&ctx, 3, next_monday(), hm(12, 0), hm(13, 0)).await?;

        assert_eq!(booked.table_id, booth.id);
        assert_eq!(booked.party_size, 3);
        assert_eq!(booked.status, ReservationStatus::Confirmed);
        assert_eq!(booked.user_id, test_customer().id);
        assert_eq!(booked.created_at, test_now());
        Ok(())
    }

    #[tokio::test]
    async fn test_create_reservation_no_table_for_party() -> Result<()> {
        let (ctx, _clock) = setup_context().await?;
        create_test_table(&ctx.database, "Window", 2).await?;
        open_monday(&ctx.database).await?;

        let result = book(&ctx, 5, next_monday(), hm(12, 0), hm(13, 0)).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::NoTableAvailable { party_size: 5 }
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_reservation_rejects_bad_party_size() -> Result<()> {
        let (ctx, _clock) = setup_context().await?;
        let result = book(&ctx, 0, next_monday(), hm(12, 0), hm(13, 0)).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::Validation {
                field: "party_size",
                ..
            }
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_reservation_overlap_conflict() -> Result<()> {
        let (ctx, _clock) = setup_context().await?;
        let table = create_test_table(&ctx.database, "Window", 4).await?;
        open_monday(&ctx.database).await?;

        book(&ctx, 2, next_monday(), hm(12, 0), hm(13, 0)).await?;
        let result = book(&ctx, 2, next_monday(), hm(12, 30), hm(13, 30)).await;

        assert!(matches!(
            result.unwrap_err(),
            Error::ReservationConflict { table_id } if table_id == table.id
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_reservation_back_to_back_is_allowed() -> Result<()> {
        let (ctx, _clock) = setup_context().await?;
        create_test_table(&ctx.database, "Window", 4).await?;
        open_monday(&ctx.database).await?;

        let first = book(&ctx, 2, next_monday(), hm(12, 0), hm(13, 0)).await?;
        let second = book(&ctx, 2, next_monday(), hm(13, 0), hm(14, 0)).await?;

        assert_eq!(first.end_time, second.start_time);
        Ok(())
    }

    #[tokio::test]
    async fn test_create_reservation_duration_exceeded() -> Result<()> {
        let (ctx, _clock) = setup_context().await?;
        create_test_table(&ctx.database, "Window", 4).await?;
        open_monday(&ctx.database).await?;

        let result = book(&ctx, 2, next_monday(), hm(9, 0), hm(20, 0)).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::DurationExceeded { .. }
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_overlapping_requests_single_winner() -> Result<()> {
        let (ctx, _clock) = setup_context().await?;
        create_test_table(&ctx.database, "Window", 4).await?;
        open_monday(&ctx.database).await?;
        let ctx = Arc::new(ctx);

        let mut handles = Vec::new();
        for start_hour in [12, 12, 12, 13] {
            let ctx = Arc::clone(&ctx);
            handles.push(tokio::spawn(async move {
                let start = hm(start_hour, 0);
                book(&ctx, 2, next_monday(), start, start + Duration::minutes(90)).await
            }));
        }

        let mut successes = 0;
        let mut conflicts = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(Error::ReservationConflict { .. }) => conflicts += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        // 12:00-13:30 and 13:00-14:30 overlap, so only one of the four can win
        assert_eq!(successes, 1);
        assert_eq!(conflicts, 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_confirmed_bookings_never_overlap_after_many_requests() -> Result<()> {
        let (ctx, _clock) = setup_context().await?;
        let table = create_test_table(&ctx.database, "Window", 4).await?;
        open_monday(&ctx.database).await?;

        for (start, end) in [
            (hm(9, 0), hm(10, 0)),
            (hm(9, 30), hm(11, 0)),
            (hm(10, 0), hm(11, 30)),
            (hm(11, 0), hm(12, 0)),
            (hm(11, 30), hm(12, 30)),
            (hm(12, 30), hm(16, 0)),
        ] {
            let _ = book(&ctx, 2, next_monday(), start, end).await;
        }

        let confirmed = schedule::confirmed_reservations_for_table(&ctx.database, table.id).await?;
        // 09:00-10:00, 10:00-11:30, 11:30-12:30 and 12:30-16:00 win
        assert_eq!(confirmed.len(), 4);
        for (i, a) in confirmed.iter().enumerate() {
            for b in &confirmed[i + 1..] {
                assert!(!a.overlaps(b.start_time, b.end_time));
            }
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_create_reservation_blocks_availability() -> Result<()> {
        let (ctx, _clock) = setup_context().await?;
        let table = create_test_table(&ctx.database, "Window", 4).await?;
        open_monday(&ctx.database).await?;

        book(&ctx, 2, next_monday(), hm(12, 0), hm(13, 0)).await?;

        let slots = get_availability(&ctx, next_monday(), table.id).await?;
        let busy: Vec<String> = slots
            .iter()
            .filter(|s| !s.available)
            .map(|s| s.label())
            .collect();
        assert_eq!(busy, vec!["12:00", "12:30"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_create_reservation_sends_confirmation() -> Result<()> {
        let db = setup_test_db().await?;
        let (notifier, mut outbox) = ChannelNotifier::new();
        let ctx = context_with_notifier(db, Arc::new(notifier));
        create_test_table(&ctx.database, "Window", 4).await?;
        open_monday(&ctx.database).await?;

        let customer = test_customer().with_email("guest@example.com");
        let booked = create_reservation(
            &ctx,
            &customer,
            ReservationRequest {
                party_size: 2,
                date: next_monday(),
                start_time: hm(12, 0),
                end_time: hm(13, 0),
            },
        )
        .await?;

        let sent = outbox.recv().await.unwrap();
        assert_eq!(sent.recipient, "guest@example.com");
        assert!(sent.subject.contains(&format!("#{}", booked.id)));
        assert!(sent.body.contains("Table: Window"));
        assert!(sent.body.contains("Time: 12:00 - 13:00"));
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_notification_does_not_fail_booking() -> Result<()> {
        let db = setup_test_db().await?;
        let ctx = context_with_notifier(db, Arc::new(FailingNotifier));
        create_test_table(&ctx.database, "Window", 4).await?;
        open_monday(&ctx.database).await?;

        let customer = test_customer().with_email("guest@example.com");
        let booked = create_reservation(
            &ctx,
            &customer,
            ReservationRequest {
                party_size: 2,
                date: next_monday(),
                start_time: hm(12, 0),
                end_time: hm(13, 0),
            },
        )
        .await?;

        tokio::task::yield_now().await;
        assert_eq!(booked.status, ReservationStatus::Confirmed);
        Ok(())
    }
}
