//! Dish entity - A menu item with a current price.
//!
//! The price here is the live menu price. Order lines copy it at the moment a dish
//! first enters a cart, so later price changes never alter existing orders.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Dish database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "dishes")]
pub struct Model {
    /// Unique identifier for the dish
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Category this dish is listed under
    #[sea_orm(indexed)]
    pub category_id: i64,
    /// Name shown on the menu
    pub name: String,
    /// Current menu price
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub price: Decimal,
    /// Heat level from 0 (not spicy) to 4 (very hot)
    pub spiciness: i32,
    /// Contains nuts
    pub has_nuts: bool,
    /// Suitable for vegetarians
    pub is_vegetarian: bool,
    /// Shown in the featured section
    pub is_featured: bool,
    /// Optional long description
    pub description: Option<String>,
}

/// Defines relationships between Dish and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each dish belongs to one category
    #[sea_orm(
        belongs_to = "super::dish_category::Entity",
        from = "Column::CategoryId",
        to = "super::dish_category::Column::Id",
        on_delete = "Cascade"
    )]
    Category,
    /// One dish has many reviews
    #[sea_orm(has_many = "super::review::Entity")]
    Reviews,
}

impl Related<super::dish_category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::review::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reviews.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
