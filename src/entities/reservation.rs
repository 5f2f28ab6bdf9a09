//! Reservation entity - A booking of one table for a half-open `[start, end)` interval.
//!
//! Reservations are created as `Confirmed` and may later move to `Cancelled`.
//! They are never physically deleted, so cancelled rows remain as history.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a reservation
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum ReservationStatus {
    /// Awaiting manual approval; no current flow produces it
    #[sea_orm(string_value = "Pending")]
    Pending,
    /// Holds the table for its interval
    #[sea_orm(string_value = "Confirmed")]
    Confirmed,
    /// Terminal; releases the table
    #[sea_orm(string_value = "Cancelled")]
    Cancelled,
}

/// Reservation database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reservations")]
pub struct Model {
    /// Unique identifier for the reservation
    #[sea_orm(primary_key)]
    pub id: i64,
    /// User who owns the reservation
    #[sea_orm(indexed)]
    pub user_id: String,
    /// Reserved table
    #[sea_orm(indexed)]
    pub table_id: i64,
    /// Number of guests
    pub party_size: i32,
    /// Inclusive start instant
    pub start_time: DateTimeUtc,
    /// Exclusive end instant
    pub end_time: DateTimeUtc,
    /// Current lifecycle state
    pub status: ReservationStatus,
    /// When the reservation was booked
    pub created_at: DateTimeUtc,
}

impl Model {
    /// Whether this reservation's interval intersects `[start, end)`.
    #[must_use]
    pub fn overlaps(&self, start: DateTimeUtc, end: DateTimeUtc) -> bool {
        self.start_time < end && self.end_time > start
    }

    /// Whether `instant` falls inside this reservation's interval.
    #[must_use]
    pub fn covers(&self, instant: DateTimeUtc) -> bool {
        self.start_time <= instant && instant < self.end_time
    }
}

/// Defines relationships between Reservation and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each reservation holds one table
    #[sea_orm(
        belongs_to = "super::dining_table::Entity",
        from = "Column::TableId",
        to = "super::dining_table::Column::Id"
    )]
    DiningTable,
}

impl Related<super::dining_table::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DiningTable.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
