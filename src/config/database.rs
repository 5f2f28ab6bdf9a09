//! Database configuration module.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with `Schema::create_table_from_entity`,
//! so the schema always matches the Rust structs. Indexes declared with `#[sea_orm(indexed)]`
//! and the composite uniqueness rules that entities cannot express are created here as well.

use crate::entities::{
    Coupon, DiningTable, Dish, DishCategory, OperatingHours, Order, OrderItem, Reservation,
    Review, review,
};
use crate::errors::Result;
use sea_orm::sea_query::Index;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema,
};
use tracing::{debug, info};

/// Opens the connection for `database_url`.
///
/// The pool holds a single connection. With more, a deferred transaction fails with
/// `SQLITE_BUSY_SNAPSHOT` when another connection commits between its first read and
/// its first write. In-memory databases need one connection regardless.
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    let mut options = ConnectOptions::new(database_url.to_owned());
    options
        .sqlx_logging(false)
        .max_connections(1)
        .min_connections(1);

    debug!("Connecting to database at {}", database_url);
    Database::connect(options).await.map_err(Into::into)
}

async fn create_entity_table<E>(db: &DatabaseConnection, schema: &Schema, entity: E) -> Result<()>
where
    E: EntityTrait + Copy,
{
    let builder = db.get_database_backend();

    let mut table = schema.create_table_from_entity(entity);
    table.if_not_exists();
    db.execute(builder.build(&table)).await?;

    for mut index in schema.create_index_from_entity(entity) {
        index.if_not_exists();
        db.execute(builder.build(&index)).await?;
    }
    Ok(())
}

/// Creates all tables and indexes if they do not exist yet.
///
/// Safe to call on every start-up. Referenced tables are created before the tables
/// holding foreign keys to them.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    create_entity_table(db, &schema, DishCategory).await?;
    create_entity_table(db, &schema, Dish).await?;
    create_entity_table(db, &schema, DiningTable).await?;
    create_entity_table(db, &schema, OperatingHours).await?;
    create_entity_table(db, &schema, Coupon).await?;
    create_entity_table(db, &schema, Order).await?;
    create_entity_table(db, &schema, OrderItem).await?;
    create_entity_table(db, &schema, Reservation).await?;
    create_entity_table(db, &schema, Review).await?;

    // One review per user per dish
    let review_index = Index::create()
        .name("idx_reviews_user_dish")
        .table(Review)
        .col(review::Column::UserId)
        .col(review::Column::DishId)
        .unique()
        .if_not_exists()
        .to_owned();
    db.execute(builder.build(&review_index)).await?;

    info!("Database tables ensured.");
    Ok(())
}
