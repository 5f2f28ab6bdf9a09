//! Venue configuration loading from a TOML file.
//!
//! The venue file describes the reference data the engine reads but never mutates:
//! tables, weekly operating hours, coupons and the menu. It is used to seed the
//! database on first run or when entries are missing.

use crate::errors::{Error, Result};
use chrono::{DateTime, FixedOffset, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use std::collections::HashSet;
use std::path::Path;

/// Configuration structure representing the entire venue file
#[derive(Debug, Deserialize)]
pub struct VenueConfig {
    /// Offset of the venue's local time from UTC, in minutes
    #[serde(default)]
    pub utc_offset_minutes: i32,
    /// Reservable tables
    #[serde(default)]
    pub tables: Vec<TableConfig>,
    /// Opening hours, one entry per open weekday
    #[serde(default)]
    pub hours: Vec<HoursConfig>,
    /// Discount codes
    #[serde(default)]
    pub coupons: Vec<CouponConfig>,
    /// Menu categories with their dishes
    #[serde(default)]
    pub categories: Vec<CategoryConfig>,
}

/// Configuration for a single table
#[derive(Debug, Deserialize, Clone)]
pub struct TableConfig {
    /// Display name, unique across tables
    pub name: String,
    /// Number of seats
    pub capacity: i32,
    /// Whether the table can be booked
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// Opening hours for one weekday
#[derive(Debug, Deserialize, Clone)]
pub struct HoursConfig {
    /// Monday = 0 through Sunday = 6
    pub weekday: i32,
    /// Opening time, `HH:MM`
    #[serde(deserialize_with = "deserialize_time")]
    pub open: NaiveTime,
    /// Closing time, `HH:MM`
    #[serde(deserialize_with = "deserialize_time")]
    pub close: NaiveTime,
}

/// Configuration for a single coupon
#[derive(Debug, Deserialize, Clone)]
pub struct CouponConfig {
    /// Code entered by customers
    pub code: String,
    /// Percentage discount, 0 to 100
    pub discount_percent: i32,
    /// Optional RFC 3339 expiry instant
    #[serde(default)]
    pub valid_to: Option<DateTime<Utc>>,
    /// Limit to one completed order per user
    #[serde(default)]
    pub one_use_per_user: bool,
    /// Whether the coupon starts out active
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// A menu category and its dishes
#[derive(Debug, Deserialize, Clone)]
pub struct CategoryConfig {
    /// Category name
    pub name: String,
    /// Optional slug; derived from the name when absent
    #[serde(default)]
    pub slug: Option<String>,
    /// Dishes listed under this category
    #[serde(default)]
    pub dishes: Vec<DishConfig>,
}

/// A single dish
#[derive(Debug, Deserialize, Clone)]
pub struct DishConfig {
    /// Dish name
    pub name: String,
    /// Menu price
    pub price: Decimal,
    /// Heat level 0-4
    #[serde(default)]
    pub spiciness: i32,
    /// Contains nuts
    #[serde(default)]
    pub has_nuts: bool,
    /// Vegetarian
    #[serde(default)]
    pub is_vegetarian: bool,
    /// Featured on the home page
    #[serde(default)]
    pub is_featured: bool,
    /// Optional description
    #[serde(default)]
    pub description: Option<String>,
}

const fn default_true() -> bool {
    true
}

fn deserialize_time<'de, D>(deserializer: D) -> std::result::Result<NaiveTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    NaiveTime::parse_from_str(&raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M:%S"))
        .map_err(serde::de::Error::custom)
}

impl VenueConfig {
    /// The venue's fixed offset from UTC.
    pub fn offset(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).ok_or_else(|| Error::Config {
            message: format!("utc_offset_minutes out of range: {}", self.utc_offset_minutes),
        })
    }

    /// Checks the invariants of every entry before anything is written.
    pub fn validate(&self) -> Result<()> {
        self.offset()?;

        for table in &self.tables {
            if table.name.trim().is_empty() {
                return Err(config_error("table name cannot be empty"));
            }
            if table.capacity <= 0 {
                return Err(config_error(format!(
                    "table '{}' must have a positive capacity, got {}",
                    table.name, table.capacity
                )));
            }
        }

        let mut weekdays = HashSet::new();
        for hours in &self.hours {
            if !(0..=6).contains(&hours.weekday) {
                return Err(config_error(format!(
                    "weekday must be between 0 and 6, got {}",
                    hours.weekday
                )));
            }
            if !weekdays.insert(hours.weekday) {
                return Err(config_error(format!(
                    "weekday {} is listed more than once",
                    hours.weekday
                )));
            }
            if hours.open >= hours.close {
                return Err(config_error(format!(
                    "weekday {} opens at {} but closes at {}",
                    hours.weekday, hours.open, hours.close
                )));
            }
        }

        for coupon in &self.coupons {
            if coupon.code.trim().is_empty() {
                return Err(config_error("coupon code cannot be empty"));
            }
            if !coupon.code.is_ascii() {
                return Err(config_error(format!(
                    "coupon '{}' must use ASCII characters only",
                    coupon.code
                )));
            }
            if !(0..=100).contains(&coupon.discount_percent) {
                return Err(config_error(format!(
                    "coupon '{}' discount must be between 0 and 100, got {}",
                    coupon.code, coupon.discount_percent
                )));
            }
        }

        for category in &self.categories {
            for dish in &category.dishes {
                if dish.price.is_sign_negative() {
                    return Err(config_error(format!(
                        "dish '{}' has a negative price",
                        dish.name
                    )));
                }
            }
        }

        Ok(())
    }
}

fn config_error(message: impl Into<String>) -> Error {
    Error::Config {
        message: message.into(),
    }
}

/// Parses and validates venue configuration from TOML text.
pub fn parse_config(contents: &str) -> Result<VenueConfig> {
    let config: VenueConfig = toml::from_str(contents)?;
    config.validate()?;
    Ok(config)
}

/// Loads venue configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - Required fields are missing or an entry breaks a reference-data invariant
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<VenueConfig> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!(
            "Failed to read venue file {}: {e}",
            path.as_ref().display()
        ),
    })?;

    parse_config(&contents)
}
