//! Order entity - A customer's basket and, once placed, its historical record.
//!
//! A pending order is the user's cart. `pending_owner` carries the user id only while
//! the order is pending; its unique index is what keeps a user to a single cart.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle state of an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum OrderStatus {
    /// The user's open cart
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Checked out; never recomputed again
    #[sea_orm(string_value = "completed")]
    Completed,
    /// Abandoned
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

/// Order database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    /// Unique identifier for the order
    #[sea_orm(primary_key)]
    pub id: i64,
    /// User who owns the order
    #[sea_orm(indexed)]
    pub user_id: String,
    /// Same as `user_id` while pending, `None` afterwards
    #[sea_orm(unique)]
    pub pending_owner: Option<String>,
    /// Current lifecycle state
    pub status: OrderStatus,
    /// Attached coupon, if any
    pub coupon_id: Option<i64>,
    /// Cached total after discount
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub total_price: Decimal,
    /// When the order was first created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Order and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One order owns many line items
    #[sea_orm(has_many = "super::order_item::Entity")]
    Items,
    /// An order may carry one coupon
    #[sea_orm(
        belongs_to = "super::coupon::Entity",
        from = "Column::CouponId",
        to = "super::coupon::Column::Id",
        on_delete = "SetNull"
    )]
    Coupon,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl Related<super::coupon::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Coupon.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
