//! Order item entity - One line of an order.
//!
//! `price_at_order` is captured when the line is created and never rewritten.
//! Deleting a dish keeps the line with `dish_id` set to `None`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Order item database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "order_items")]
pub struct Model {
    /// Unique identifier for the line
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning order
    #[sea_orm(indexed)]
    pub order_id: i64,
    /// Ordered dish, `None` once the dish has been removed from the menu
    pub dish_id: Option<i64>,
    /// Number of portions, always positive
    pub quantity: i32,
    /// Unit price at the time the line was created
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub price_at_order: Decimal,
}

impl Model {
    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price_at_order * Decimal::from(self.quantity)
    }
}

/// Defines relationships between an order item and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each line belongs to one order and is deleted with it
    #[sea_orm(
        belongs_to = "super::order::Entity",
        from = "Column::OrderId",
        to = "super::order::Column::Id",
        on_delete = "Cascade"
    )]
    Order,
    /// Each line references the dish it was created from
    #[sea_orm(
        belongs_to = "super::dish::Entity",
        from = "Column::DishId",
        to = "super::dish::Column::Id",
        on_delete = "SetNull"
    )]
    Dish,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl Related<super::dish::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Dish.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
