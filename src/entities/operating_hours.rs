//! Operating hours entity - Opening and closing time for one weekday.
//!
//! Weekdays are numbered from Monday = 0 to Sunday = 6. A weekday without a row
//! means the venue is closed that day.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Operating hours database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "operating_hours")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Day of week, Monday = 0 through Sunday = 6, unique per row
    #[sea_orm(unique)]
    pub weekday: i32,
    /// Local opening time
    pub open_time: Time,
    /// Local closing time, strictly after `open_time`
    pub close_time: Time,
}

/// Operating hours have no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
