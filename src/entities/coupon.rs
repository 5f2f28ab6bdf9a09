//! Coupon entity - A percentage discount code.
//!
//! Codes are matched case-insensitively. Whether a coupon currently discounts is
//! decided at every total recomputation from `is_active` and `valid_to`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Coupon database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "coupons")]
pub struct Model {
    /// Unique identifier for the coupon
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Code entered by customers
    #[sea_orm(unique)]
    pub code: String,
    /// Discount applied to the order total, 0 to 100
    pub discount_percent: i32,
    /// Deactivated coupons stop discounting immediately
    pub is_active: bool,
    /// Optional expiry instant; the coupon is invalid from this instant on
    pub valid_to: Option<DateTimeUtc>,
    /// Each user may complete at most one order with this coupon
    pub one_use_per_user: bool,
}

impl Model {
    /// Whether the coupon should discount an order evaluated at `now`.
    #[must_use]
    pub fn is_valid_at(&self, now: DateTimeUtc) -> bool {
        self.is_active && self.valid_to.is_none_or(|valid_to| now < valid_to)
    }
}

/// Defines relationships between Coupon and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// A coupon may be attached to many orders
    #[sea_orm(has_many = "super::order::Entity")]
    Orders,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
