//! Unified error type for the ordering and reservation core.
//!
//! Every rejection path returns one of these variants. [`Error::kind`] groups them
//! into the categories a transport layer maps onto its own status codes.

use chrono::{NaiveDate, NaiveTime};
use thiserror::Error;

/// Broad category of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or missing input
    Validation,
    /// A referenced record does not exist
    NotFound,
    /// Rejected because of the current state of shared records
    Conflict,
    /// A domain rule (hours, duration, timing) was violated
    BusinessRule,
    /// Storage, configuration or environment failure
    Internal,
}

/// All errors produced by this crate.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    #[error("Failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid {field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("Table {id} not found")]
    TableNotFound { id: i64 },

    #[error("Restaurant is closed on {date}")]
    Closed { date: NaiveDate },

    #[error("Sorry, we do not have a table available for {party_size} guests")]
    NoTableAvailable { party_size: i32 },

    #[error(
        "To book a table for more than {max_hours} hours, please contact the restaurant directly"
    )]
    DurationExceeded { max_hours: i64 },

    #[error("The restaurant is open {open} - {close}; the selected time is outside operating hours")]
    OutOfHours { open: NaiveTime, close: NaiveTime },

    #[error("Cannot book a reservation in the past")]
    InThePast,

    #[error("End time must be after start time")]
    InvalidWindow,

    #[error("Table {table_id} is already booked for part of the selected time range")]
    ReservationConflict { table_id: i64 },

    #[error("Reservation {id} not found")]
    ReservationNotFound { id: i64 },

    #[error("Reservation {id} has already started or passed")]
    AlreadyStarted { id: i64 },

    #[error("Reservation {id} is already cancelled")]
    AlreadyCancelled { id: i64 },

    #[error("Dish {id} not found")]
    DishNotFound { id: i64 },

    #[error("Category '{slug}' not found")]
    CategoryNotFound { slug: String },

    #[error("Item {id} not found in your cart")]
    CartItemNotFound { id: i64 },

    #[error("You do not have an active cart")]
    NoActiveCart,

    #[error("Your cart is empty")]
    EmptyCart,

    #[error("Order {id} is no longer pending")]
    OrderNotPending { id: i64 },

    #[error("Invalid coupon code '{code}'")]
    CouponNotFound { code: String },

    #[error("You have already used coupon '{code}'")]
    CouponAlreadyUsed { code: String },

    #[error("Coupon '{code}' is already applied")]
    CouponAlreadyApplied { code: String },

    #[error("Coupon '{code}' already exists")]
    DuplicateCoupon { code: String },

    #[error("No coupon is applied to this cart")]
    NoCouponApplied,

    #[error("Discount must be between 0 and 100 percent, got {percent}")]
    InvalidDiscount { percent: i32 },

    #[error("You can only review dishes you have purchased (dish {dish_id})")]
    NotPurchased { dish_id: i64 },

    #[error("You have already reviewed dish {dish_id}")]
    DuplicateReview { dish_id: i64 },
}

impl Error {
    /// Shorthand for a [`Error::Validation`] on a named input field.
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } | Self::InvalidDiscount { .. } => ErrorKind::Validation,
            Self::TableNotFound { .. }
            | Self::Closed { .. }
            | Self::ReservationNotFound { .. }
            | Self::DishNotFound { .. }
            | Self::CategoryNotFound { .. }
            | Self::CartItemNotFound { .. }
            | Self::NoActiveCart
            | Self::CouponNotFound { .. } => ErrorKind::NotFound,
            Self::ReservationConflict { .. }
            | Self::NoTableAvailable { .. }
            | Self::AlreadyCancelled { .. }
            | Self::OrderNotPending { .. }
            | Self::CouponAlreadyUsed { .. }
            | Self::CouponAlreadyApplied { .. }
            | Self::DuplicateCoupon { .. }
            | Self::NoCouponApplied
            | Self::DuplicateReview { .. } => ErrorKind::Conflict,
            Self::DurationExceeded { .. }
            | Self::OutOfHours { .. }
            | Self::InThePast
            | Self::InvalidWindow
            | Self::AlreadyStarted { .. }
            | Self::EmptyCart
            | Self::NotPurchased { .. } => ErrorKind::BusinessRule,
            Self::Config { .. }
            | Self::Database(_)
            | Self::Io(_)
            | Self::EnvVar(_)
            | Self::Toml(_) => ErrorKind::Internal,
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_groups_reservation_rejections() {
        assert_eq!(Error::InThePast.kind(), ErrorKind::BusinessRule);
        assert_eq!(
            Error::DurationExceeded { max_hours: 10 }.kind(),
            ErrorKind::BusinessRule
        );
        assert_eq!(
            Error::ReservationConflict { table_id: 1 }.kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            Error::Closed {
                date: NaiveDate::from_ymd_opt(2030, 1, 7).unwrap_or_default()
            }
            .kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn test_kind_groups_cart_rejections() {
        assert_eq!(Error::EmptyCart.kind(), ErrorKind::BusinessRule);
        assert_eq!(Error::NoCouponApplied.kind(), ErrorKind::Conflict);
        assert_eq!(
            Error::validation("quantity", "must be positive").kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            Error::CouponNotFound {
                code: "X".to_string()
            }
            .kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn test_duration_message_directs_to_manual_contact() {
        let message = Error::DurationExceeded { max_hours: 10 }.to_string();
        assert!(message.contains("contact the restaurant"));
    }
}
