//! Order pricing - Recomputes an order's total from its lines and coupon.
//!
//! `total = Σ price_at_order × quantity`, then, if the attached coupon is still valid,
//! `total × (1 − discount/100)` rounded to cents with midpoints away from zero. The
//! coupon is re-checked on every recomputation; a coupon that stopped being valid
//! stays attached but no longer discounts.

use crate::{
    entities::{Coupon, Order, OrderItem, OrderStatus, coupon, order, order_item},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::{Set, prelude::*};
use tracing::debug;

const MONEY_DECIMAL_PLACES: u32 = 2;

/// Rounds to cents, half away from zero.
#[must_use]
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Sum of line totals before any discount.
#[must_use]
pub fn subtotal(items: &[order_item::Model]) -> Decimal {
    items.iter().map(order_item::Model::line_total).sum()
}

/// Applies a percentage discount and rounds the result.
#[must_use]
pub fn apply_discount(amount: Decimal, discount_percent: i32) -> Decimal {
    let hundred = Decimal::ONE_HUNDRED;
    round_money(amount * (hundred - Decimal::from(discount_percent)) / hundred)
}

/// Total for `items` with `coupon` evaluated at `now`.
#[must_use]
pub fn compute_total(
    items: &[order_item::Model],
    coupon: Option<&coupon::Model>,
    now: DateTime<Utc>,
) -> Decimal {
    let base = subtotal(items);
    match coupon {
        Some(coupon) if coupon.is_valid_at(now) => apply_discount(base, coupon.discount_percent),
        _ => round_money(base),
    }
}

/// Recomputes and stores the total of a pending order, returning the new total.
///
/// # Errors
/// - [`Error::NoActiveCart`] if the order does not exist
/// - [`Error::OrderNotPending`] if the order was already completed or cancelled
pub async fn recalculate_total<C>(db: &C, order_id: i64, now: DateTime<Utc>) -> Result<Decimal>
where
    C: ConnectionTrait,
{
    let existing = Order::find_by_id(order_id)
        .one(db)
        .await?
        .ok_or(Error::NoActiveCart)?;

    if existing.status != OrderStatus::Pending {
        return Err(Error::OrderNotPending { id: order_id });
    }

    let items = OrderItem::find()
        .filter(order_item::Column::OrderId.eq(order_id))
        .all(db)
        .await?;

    let coupon = match existing.coupon_id {
        Some(coupon_id) => Coupon::find_by_id(coupon_id).one(db).await?,
        None => None,
    };

    let total = compute_total(&items, coupon.as_ref(), now);

    let mut active: order::ActiveModel = existing.into();
    active.total_price = Set(total);
    active.update(db).await?;

    debug!(order_id, %total, lines = items.len(), "Order total recalculated");
    Ok(total)
}
