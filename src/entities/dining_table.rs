//! Dining table entity - A physical table that can be reserved.
//!
//! Tables are shared reference data: the reservation engine reads them to pick the
//! tightest-fitting table for a party, and only administrative code mutates them.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Dining table database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "dining_tables")]
pub struct Model {
    /// Unique identifier for the table
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name shown to guests (e.g., "Window 2")
    #[sea_orm(unique)]
    pub name: String,
    /// Number of seats, always positive
    pub capacity: i32,
    /// Inactive tables are never offered for new reservations
    pub is_active: bool,
}

/// Defines relationships between a dining table and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One table has many reservations
    #[sea_orm(has_many = "super::reservation::Entity")]
    Reservations,
}

impl Related<super::reservation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reservations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
