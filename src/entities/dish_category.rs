//! Dish category entity - Groups dishes on the menu.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Dish category database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "dish_categories")]
pub struct Model {
    /// Unique identifier for the category
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Human-readable name (e.g., "Main Courses")
    #[sea_orm(unique)]
    pub name: String,
    /// URL-friendly key used for filtering (e.g., "main-courses")
    #[sea_orm(unique)]
    pub slug: String,
}

/// Defines relationships between a category and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One category has many dishes
    #[sea_orm(has_many = "super::dish::Entity")]
    Dishes,
}

impl Related<super::dish::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Dishes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
