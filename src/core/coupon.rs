//! Coupons - Attaching discounts to carts and managing the coupon list.
//!
//! Codes match case-insensitively. A coupon is usable while it is active and not past
//! its `valid_to`; attaching checks that once, and every later recomputation checks it
//! again.

use crate::{
    context::{AppContext, Customer},
    core::cart::{self, OrderView},
    entities::{Coupon, Order, OrderStatus, coupon, order},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{
    PaginatorTrait, Set, SqlErr, TransactionTrait,
    prelude::*,
    sea_query::{Expr, Func},
};
use tracing::{info, instrument};

/// Looks up a coupon by code regardless of case or validity.
///
/// Stored codes are ASCII, and `SQLite`'s `lower()` only folds ASCII, so the input is
/// folded the same way.
pub async fn find_coupon_by_code<C>(db: &C, code: &str) -> Result<Option<coupon::Model>>
where
    C: ConnectionTrait,
{
    Coupon::find()
        .filter(Expr::expr(Func::lower(Expr::col(coupon::Column::Code))).eq(code.trim().to_ascii_lowercase()))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Looks up a coupon that can be used at `now`.
pub async fn find_valid_coupon_by_code<C>(
    db: &C,
    code: &str,
    now: DateTime<Utc>,
) -> Result<Option<coupon::Model>>
where
    C: ConnectionTrait,
{
    Ok(find_coupon_by_code(db, code)
        .await?
        .filter(|coupon| coupon.is_valid_at(now)))
}

/// Whether `user_id` has a completed order that used `coupon_id`.
pub async fn has_used_coupon<C>(db: &C, user_id: &str, coupon_id: i64) -> Result<bool>
where
    C: ConnectionTrait,
{
    let used = Order::find()
        .filter(order::Column::UserId.eq(user_id))
        .filter(order::Column::CouponId.eq(coupon_id))
        .filter(order::Column::Status.eq(OrderStatus::Completed))
        .count(db)
        .await?;
    Ok(used > 0)
}

/// Attaches a coupon to the caller's cart and recomputes its total.
///
/// # Errors
/// - [`Error::NoActiveCart`] if the caller has no cart
/// - [`Error::CouponNotFound`] if the code is unknown, inactive or expired
/// - [`Error::CouponAlreadyUsed`] if a one-use coupon appears on a completed order of the caller
/// - [`Error::CouponAlreadyApplied`] if the cart already carries this coupon
#[instrument(skip(ctx, customer), fields(user_id = %customer.id))]
pub async fn apply_coupon(ctx: &AppContext, customer: &Customer, code: &str) -> Result<OrderView> {
    let _guard = ctx.cart_locks.lock(customer.id.clone()).await;
    let now = ctx.now();
    let txn = ctx.database.begin().await?;

    let cart = cart::find_cart(&txn, &customer.id)
        .await?
        .ok_or(Error::NoActiveCart)?;

    let coupon = find_valid_coupon_by_code(&txn, code, now)
        .await?
        .ok_or_else(|| Error::CouponNotFound {
            code: code.to_string(),
        })?;

    if coupon.one_use_per_user && has_used_coupon(&txn, &customer.id, coupon.id).await? {
        return Err(Error::CouponAlreadyUsed { code: coupon.code });
    }
    if cart.coupon_id == Some(coupon.id) {
        return Err(Error::CouponAlreadyApplied { code: coupon.code });
    }

    let order_id = cart.id;
    let mut active: order::ActiveModel = cart.into();
    active.coupon_id = Set(Some(coupon.id));
    active.update(&txn).await?;

    let view = cart::recalculate_view(&txn, order_id, now).await?;
    txn.commit().await?;

    info!(
        order_id,
        code = %coupon.code,
        discount = coupon.discount_percent,
        total = %view.total_price(),
        "Coupon applied"
    );
    Ok(view)
}

/// Detaches the coupon from the caller's cart and recomputes its total.
///
/// # Errors
/// - [`Error::NoActiveCart`] if the caller has no cart
/// - [`Error::NoCouponApplied`] if the cart carries no coupon
#[instrument(skip(ctx, customer), fields(user_id = %customer.id))]
pub async fn remove_coupon(ctx: &AppContext, customer: &Customer) -> Result<OrderView> {
    let _guard = ctx.cart_locks.lock(customer.id.clone()).await;
    let now = ctx.now();
    let txn = ctx.database.begin().await?;

    let cart = cart::find_cart(&txn, &customer.id)
        .await?
        .ok_or(Error::NoActiveCart)?;
    if cart.coupon_id.is_none() {
        return Err(Error::NoCouponApplied);
    }

    let order_id = cart.id;
    let mut active: order::ActiveModel = cart.into();
    active.coupon_id = Set(None);
    active.update(&txn).await?;

    let view = cart::recalculate_view(&txn, order_id, now).await?;
    txn.commit().await?;

    info!(order_id, total = %view.total_price(), "Coupon removed");
    Ok(view)
}

/// Fields of a new coupon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCoupon {
    /// Code customers type in; stored trimmed, ASCII only
    pub code: String,
    /// Percentage taken off the subtotal, 0..=100
    pub discount_percent: i32,
    /// Instant after which the coupon stops applying
    pub valid_to: Option<DateTime<Utc>>,
    /// Whether a user may use it in only one completed order
    pub one_use_per_user: bool,
    /// Inactive coupons cannot be attached and do not discount
    pub is_active: bool,
}

impl NewCoupon {
    /// An active coupon without expiry that anyone may reuse.
    #[must_use]
    pub fn new(code: impl Into<String>, discount_percent: i32) -> Self {
        Self {
            code: code.into(),
            discount_percent,
            valid_to: None,
            one_use_per_user: false,
            is_active: true,
        }
    }

    /// Limits the coupon to one completed order per user.
    #[must_use]
    pub fn one_use_per_user(mut self) -> Self {
        self.one_use_per_user = true;
        self
    }

    /// Expires the coupon at `valid_to`.
    #[must_use]
    pub fn valid_to(mut self, valid_to: DateTime<Utc>) -> Self {
        self.valid_to = Some(valid_to);
        self
    }
}

/// Creates a coupon.
///
/// # Errors
/// - [`Error::InvalidDiscount`] if the percentage is outside 0..=100
/// - [`Error::Validation`] if the code is blank or not ASCII
/// - [`Error::DuplicateCoupon`] if the code exists in any letter case
pub async fn create_coupon<C>(db: &C, new: NewCoupon) -> Result<coupon::Model>
where
    C: ConnectionTrait,
{
    if !(0..=100).contains(&new.discount_percent) {
        return Err(Error::InvalidDiscount {
            percent: new.discount_percent,
        });
    }

    let code = new.code.trim().to_string();
    if code.is_empty() {
        return Err(Error::validation("code", "Coupon code cannot be empty"));
    }
    if !code.is_ascii() {
        return Err(Error::validation(
            "code",
            "Coupon code may only contain ASCII characters",
        ));
    }
    if find_coupon_by_code(db, &code).await?.is_some() {
        return Err(Error::DuplicateCoupon { code });
    }

    let inserted = coupon::ActiveModel {
        code: Set(code.clone()),
        discount_percent: Set(new.discount_percent),
        is_active: Set(new.is_active),
        valid_to: Set(new.valid_to),
        one_use_per_user: Set(new.one_use_per_user),
        ..Default::default()
    }
    .insert(db)
    .await;

    match inserted {
        Ok(coupon) => {
            info!(coupon_id = coupon.id, code = %coupon.code, "Coupon created");
            Ok(coupon)
        }
        Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            Err(Error::DuplicateCoupon { code })
        }
        Err(e) => Err(e.into()),
    }
}

/// Activates or deactivates a coupon. Carts holding it stop or resume discounting
/// on their next recomputation.
pub async fn set_coupon_active<C>(db: &C, code: &str, is_active: bool) -> Result<coupon::Model>
where
    C: ConnectionTrait,
{
    let mut coupon: coupon::ActiveModel = find_coupon_by_code(db, code)
        .await?
        .ok_or_else(|| Error::CouponNotFound {
            code: code.to_string(),
        })?
        .into();

    coupon.is_active = Set(is_active);
    let updated = coupon.update(db).await?;

    info!(code = %updated.code, is_active, "Coupon status changed");
    Ok(updated)
}
