//! Reference data seeding from the venue file.
//!
//! Seeding only adds: a table, weekday, coupon, category or dish that already exists
//! is left untouched, so running it on every start-up is safe.

use crate::{
    config::venue::VenueConfig,
    core::{catalog, coupon, schedule},
    entities::{DiningTable, Dish, dining_table, dish},
    errors::Result,
};
use sea_orm::{TransactionTrait, prelude::*};
use serde::Serialize;
use tracing::{debug, info, instrument};

/// How many records of each kind a seeding run inserted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    /// Dining tables added
    pub tables: usize,
    /// Weekdays given opening hours
    pub hours: usize,
    /// Coupons added
    pub coupons: usize,
    /// Menu categories added
    pub categories: usize,
    /// Dishes added
    pub dishes: usize,
}

impl SeedSummary {
    /// Whether the run inserted nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.tables == 0
            && self.hours == 0
            && self.coupons == 0
            && self.categories == 0
            && self.dishes == 0
    }
}

/// Inserts the reference data in `config` that is not stored yet.
#[instrument(skip(db, config))]
pub async fn seed_from_config<C>(db: &C, config: &VenueConfig) -> Result<SeedSummary>
where
    C: ConnectionTrait + TransactionTrait,
{
    config.validate()?;
    info!(
        tables = config.tables.len(),
        hours = config.hours.len(),
        coupons = config.coupons.len(),
        categories = config.categories.len(),
        "Seeding venue reference data"
    );

    let txn = db.begin().await?;
    let mut summary = SeedSummary::default();

    for table in &config.tables {
        let exists = DiningTable::find()
            .filter(dining_table::Column::Name.eq(table.name.trim()))
            .one(&txn)
            .await?
            .is_some();
        if exists {
            debug!(name = %table.name, "Table already exists, skipping");
            continue;
        }
        let created = schedule::create_table(&txn, &table.name, table.capacity).await?;
        if !table.is_active {
            schedule::set_table_active(&txn, created.id, false).await?;
        }
        summary.tables += 1;
    }

    let configured = schedule::list_operating_hours(&txn).await?;
    for hours in &config.hours {
        if configured.iter().any(|h| h.weekday == hours.weekday) {
            debug!(weekday = hours.weekday, "Hours already set, skipping");
            continue;
        }
        schedule::set_operating_hours(&txn, hours.weekday, hours.open, hours.close).await?;
        summary.hours += 1;
    }

    for entry in &config.coupons {
        if coupon::find_coupon_by_code(&txn, &entry.code).await?.is_some() {
            debug!(code = %entry.code, "Coupon already exists, skipping");
            continue;
        }
        coupon::create_coupon(
            &txn,
            coupon::NewCoupon {
                code: entry.code.clone(),
                discount_percent: entry.discount_percent,
                valid_to: entry.valid_to,
                one_use_per_user: entry.one_use_per_user,
                is_active: entry.is_active,
            },
        )
        .await?;
        summary.coupons += 1;
    }

    for entry in &config.categories {
        let slug = entry
            .slug
            .clone()
            .unwrap_or_else(|| catalog::slugify(&entry.name));

        let category = if let Some(existing) = catalog::get_category_by_slug(&txn, &slug).await? {
            existing
        } else {
            summary.categories += 1;
            catalog::create_category(&txn, &entry.name, Some(slug.as_str())).await?
        };

        for item in &entry.dishes {
            let exists = Dish::find()
                .filter(dish::Column::CategoryId.eq(category.id))
                .filter(dish::Column::Name.eq(item.name.trim()))
                .one(&txn)
                .await?
                .is_some();
            if exists {
                continue;
            }
            catalog::create_dish(
                &txn,
                catalog::NewDish {
                    category_slug: category.slug.clone(),
                    name: item.name.clone(),
                    price: item.price,
                    spiciness: item.spiciness,
                    has_nuts: item.has_nuts,
                    is_vegetarian: item.is_vegetarian,
                    is_featured: item.is_featured,
                    description: item.description.clone(),
                },
            )
            .await?;
            summary.dishes += 1;
        }
    }

    txn.commit().await?;
    info!(?summary, "Finished seeding venue reference data");
    Ok(summary)
}
