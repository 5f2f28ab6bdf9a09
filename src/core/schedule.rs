//! Schedule store - Tables, weekly operating hours and the reservations held on them.
//!
//! Read helpers here are generic over `ConnectionTrait` so the reservation engine can
//! run them inside its transaction. The administrative writers enforce the reference
//! data invariants: positive capacity, one row per weekday and `open < close`.

use crate::{
    entities::{
        DiningTable, OperatingHours, Reservation, ReservationStatus, dining_table,
        operating_hours, reservation,
    },
    errors::{Error, Result},
};
use chrono::{Datelike, NaiveDate, NaiveTime};
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::info;

/// Weekday index used by [`operating_hours`], Monday = 0.
#[must_use]
pub fn weekday_index(date: NaiveDate) -> i32 {
    // num_days_from_monday is always in 0..=6
    i32::try_from(date.weekday().num_days_from_monday()).unwrap_or_default()
}

/// Finds a table by id.
pub async fn get_table_by_id<C>(db: &C, table_id: i64) -> Result<Option<dining_table::Model>>
where
    C: ConnectionTrait,
{
    DiningTable::find_by_id(table_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Lists active tables, smallest first.
pub async fn list_active_tables<C>(db: &C) -> Result<Vec<dining_table::Model>>
where
    C: ConnectionTrait,
{
    DiningTable::find()
        .filter(dining_table::Column::IsActive.eq(true))
        .order_by_asc(dining_table::Column::Capacity)
        .order_by_asc(dining_table::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Picks the active table with the smallest capacity that still seats `party_size`.
///
/// Ties on capacity go to the lowest id so the choice is stable.
pub async fn find_tightest_table<C>(
    db: &C,
    party_size: i32,
) -> Result<Option<dining_table::Model>>
where
    C: ConnectionTrait,
{
    DiningTable::find()
        .filter(dining_table::Column::IsActive.eq(true))
        .filter(dining_table::Column::Capacity.gte(party_size))
        .order_by_asc(dining_table::Column::Capacity)
        .order_by_asc(dining_table::Column::Id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Operating hours for the weekday of `date`, or `None` when the venue is closed.
pub async fn get_hours_for_date<C>(
    db: &C,
    date: NaiveDate,
) -> Result<Option<operating_hours::Model>>
where
    C: ConnectionTrait,
{
    OperatingHours::find()
        .filter(operating_hours::Column::Weekday.eq(weekday_index(date)))
        .one(db)
        .await
        .map_err(Into::into)
}

/// All configured weekdays, Monday first.
pub async fn list_operating_hours<C>(db: &C) -> Result<Vec<operating_hours::Model>>
where
    C: ConnectionTrait,
{
    OperatingHours::find()
        .order_by_asc(operating_hours::Column::Weekday)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Confirmed reservations on a table ordered by start.
///
/// Interval filtering happens in memory: a single venue holds few bookings per table,
/// and comparing instants in Rust avoids depending on how the backend stores them.
pub async fn confirmed_reservations_for_table<C>(
    db: &C,
    table_id: i64,
) -> Result<Vec<reservation::Model>>
where
    C: ConnectionTrait,
{
    Reservation::find()
        .filter(reservation::Column::TableId.eq(table_id))
        .filter(reservation::Column::Status.eq(ReservationStatus::Confirmed))
        .order_by_asc(reservation::Column::StartTime)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Adds a table.
pub async fn create_table<C>(db: &C, name: &str, capacity: i32) -> Result<dining_table::Model>
where
    C: ConnectionTrait,
{
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::validation("name", "Table name cannot be empty"));
    }
    if capacity <= 0 {
        return Err(Error::validation(
            "capacity",
            format!("Capacity must be positive, got {capacity}"),
        ));
    }

    let table = dining_table::ActiveModel {
        name: Set(name.to_string()),
        capacity: Set(capacity),
        is_active: Set(true),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(table_id = table.id, capacity, "Table created");
    Ok(table)
}

/// Enables or disables a table for new reservations. Existing bookings are kept.
pub async fn set_table_active<C>(db: &C, table_id: i64, active: bool) -> Result<dining_table::Model>
where
    C: ConnectionTrait,
{
    let mut table: dining_table::ActiveModel = get_table_by_id(db, table_id)
        .await?
        .ok_or(Error::TableNotFound { id: table_id })?
        .into();

    table.is_active = Set(active);
    table.update(db).await.map_err(Into::into)
}

/// Sets the hours of one weekday, replacing any existing row.
pub async fn set_operating_hours<C>(
    db: &C,
    weekday: i32,
    open_time: NaiveTime,
    close_time: NaiveTime,
) -> Result<operating_hours::Model>
where
    C: ConnectionTrait,
{
    if !(0..=6).contains(&weekday) {
        return Err(Error::validation(
            "weekday",
            format!("Weekday must be between 0 and 6, got {weekday}"),
        ));
    }
    if open_time >= close_time {
        return Err(Error::validation(
            "close_time",
            format!("Closing time {close_time} must be after opening time {open_time}"),
        ));
    }

    let existing = OperatingHours::find()
        .filter(operating_hours::Column::Weekday.eq(weekday))
        .one(db)
        .await?;

    let hours = if let Some(existing) = existing {
        let mut active: operating_hours::ActiveModel = existing.into();
        active.open_time = Set(open_time);
        active.close_time = Set(close_time);
        active.update(db).await?
    } else {
        operating_hours::ActiveModel {
            weekday: Set(weekday),
            open_time: Set(open_time),
            close_time: Set(close_time),
            ..Default::default()
        }
        .insert(db)
        .await?
    };

    info!(weekday, %open_time, %close_time, "Operating hours set");
    Ok(hours)
}

/// Removes the hours of one weekday, closing the venue that day.
pub async fn clear_operating_hours<C>(db: &C, weekday: i32) -> Result<bool>
where
    C: ConnectionTrait,
{
    let result = OperatingHours::delete_many()
        .filter(operating_hours::Column::Weekday.eq(weekday))
        .exec(db)
        .await?;
    Ok(result.rows_affected > 0)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[test]
    fn test_weekday_index_starts_monday() {
        assert_eq!(weekday_index(next_monday()), 0);
        assert_eq!(
            weekday_index(NaiveDate::from_ymd_opt(2030, 1, 13).unwrap()),
            6
        );
    }

    #[tokio::test]
    async fn test_create_table_validation() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();

        let result = create_table(&db, "  ", 4).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::Validation { field: "name", .. }
        ));

        let result = create_table(&db, "Patio", 0).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::Validation {
                field: "capacity",
                ..
            }
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_find_tightest_table_integration() -> Result<()> {
        let db = setup_test_db().await?;
        let large = create_table(&db, "Family", 8).await?;
        let small = create_table(&db, "Window", 2).await?;
        let medium = create_table(&db, "Booth", 4).await?;

        assert_eq!(find_tightest_table(&db, 1).await?.unwrap().id, small.id);
        assert_eq!(find_tightest_table(&db, 3).await?.unwrap().id, medium.id);
        assert_eq!(find_tightest_table(&db, 5).await?.unwrap().id, large.id);
        assert!(find_tightest_table(&db, 9).await?.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_find_tightest_table_skips_inactive() -> Result<()> {
        let db = setup_test_db().await?;
        let small = create_table(&db, "Window", 2).await?;
        let medium = create_table(&db, "Booth", 4).await?;

        set_table_active(&db, small.id, false).await?;

        assert_eq!(find_tightest_table(&db, 2).await?.unwrap().id, medium.id);
        assert_eq!(list_active_tables(&db).await?.len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_set_operating_hours_upserts_per_weekday() -> Result<()> {
        let db = setup_test_db().await?;

        set_operating_hours(&db, 0, hm(9, 0), hm(17, 0)).await?;
        set_operating_hours(&db, 0, hm(10, 0), hm(22, 0)).await?;

        let all = list_operating_hours(&db).await?;
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].open_time, hm(10, 0));
        assert_eq!(all[0].close_time, hm(22, 0));

        let monday = get_hours_for_date(&db, next_monday()).await?;
        assert_eq!(monday.unwrap().weekday, 0);

        assert!(clear_operating_hours(&db, 0).await?);
        assert!(get_hours_for_date(&db, next_monday()).await?.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_set_operating_hours_validation() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();

        let result = set_operating_hours(&db, 7, hm(9, 0), hm(17, 0)).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::Validation {
                field: "weekday",
                ..
            }
        ));

        let result = set_operating_hours(&db, 1, hm(17, 0), hm(17, 0)).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::Validation {
                field: "close_time",
                ..
            }
        ));

        Ok(())
    }
}
