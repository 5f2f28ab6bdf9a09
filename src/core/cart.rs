//! Cart operations - The user's pending order, its lines and checkout.
//!
//! Every mutation takes the user's cart lock and runs in one transaction that ends
//! with a recomputed total, so readers never see lines and total out of step.
//! Storage still guards the single-cart rule on its own through the unique
//! `orders.pending_owner` column.

use crate::{
    context::{AppContext, Customer},
    core::{notify, pricing},
    entities::{Coupon, Dish, Order, OrderItem, OrderStatus, coupon, dish, order, order_item},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    DatabaseTransaction, PaginatorTrait, QueryOrder, Set, SqlErr, TransactionTrait, prelude::*,
};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::Write as _;
use tracing::{debug, info, instrument, warn};

/// An order together with its lines and attached coupon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderView {
    /// The order row, including the cached total
    pub order: order::Model,
    /// Lines in insertion order
    pub items: Vec<order_item::Model>,
    /// Attached coupon, whether or not it still discounts
    pub coupon: Option<coupon::Model>,
}

impl OrderView {
    /// Cached total of the order.
    #[must_use]
    pub fn total_price(&self) -> Decimal {
        self.order.total_price
    }

    /// Total number of portions across all lines.
    #[must_use]
    pub fn item_count(&self) -> i32 {
        self.items.iter().map(|i| i.quantity).sum()
    }
}

/// The pending order of `user_id`, if any.
pub async fn find_cart<C>(db: &C, user_id: &str) -> Result<Option<order::Model>>
where
    C: ConnectionTrait,
{
    Order::find()
        .filter(order::Column::PendingOwner.eq(user_id))
        .filter(order::Column::Status.eq(OrderStatus::Pending))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Returns the pending order of `user_id`, creating an empty one if needed.
///
/// The insert runs under a savepoint. Losing the race on the unique
/// `pending_owner` index rolls back only that savepoint and reads the winner's cart.
pub async fn get_or_create_cart<C>(db: &C, user_id: &str, now: DateTime<Utc>) -> Result<order::Model>
where
    C: ConnectionTrait + TransactionTrait,
{
    if let Some(existing) = find_cart(db, user_id).await? {
        return Ok(existing);
    }

    let savepoint = db.begin().await?;
    let inserted = order::ActiveModel {
        user_id: Set(user_id.to_string()),
        pending_owner: Set(Some(user_id.to_string())),
        status: Set(OrderStatus::Pending),
        coupon_id: Set(None),
        total_price: Set(Decimal::ZERO),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(&savepoint)
    .await;

    match inserted {
        Ok(cart) => {
            savepoint.commit().await?;
            debug!(order_id = cart.id, user_id, "Cart created");
            Ok(cart)
        }
        Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            savepoint.rollback().await?;
            warn!(user_id, "Concurrent cart creation detected, reusing existing cart");
            find_cart(db, user_id).await?.ok_or(Error::NoActiveCart)
        }
        Err(e) => Err(e.into()),
    }
}

/// Loads the lines and coupon of `order`.
pub async fn load_view<C>(db: &C, order: order::Model) -> Result<OrderView>
where
    C: ConnectionTrait,
{
    let items = OrderItem::find()
        .filter(order_item::Column::OrderId.eq(order.id))
        .order_by_asc(order_item::Column::Id)
        .all(db)
        .await?;

    let coupon = match order.coupon_id {
        Some(coupon_id) => Coupon::find_by_id(coupon_id).one(db).await?,
        None => None,
    };

    Ok(OrderView {
        order,
        items,
        coupon,
    })
}

/// Recomputes the total of `order_id` and returns the refreshed view.
pub(crate) async fn recalculate_view(
    txn: &DatabaseTransaction,
    order_id: i64,
    now: DateTime<Utc>,
) -> Result<OrderView> {
    pricing::recalculate_total(txn, order_id, now).await?;
    let order = Order::find_by_id(order_id)
        .one(txn)
        .await?
        .ok_or(Error::NoActiveCart)?;
    load_view(txn, order).await
}

async fn find_cart_item(
    txn: &DatabaseTransaction,
    cart: &order::Model,
    item_id: i64,
) -> Result<order_item::Model> {
    OrderItem::find_by_id(item_id)
        .filter(order_item::Column::OrderId.eq(cart.id))
        .one(txn)
        .await?
        .ok_or(Error::CartItemNotFound { id: item_id })
}

/// The caller's cart with a freshly recomputed total, created if missing.
#[instrument(skip(ctx, customer), fields(user_id = %customer.id))]
pub async fn get_cart(ctx: &AppContext, customer: &Customer) -> Result<OrderView> {
    let _guard = ctx.cart_locks.lock(customer.id.clone()).await;
    let now = ctx.now();

    let txn = ctx.database.begin().await?;
    let cart = get_or_create_cart(&txn, &customer.id, now).await?;
    let view = recalculate_view(&txn, cart.id, now).await?;
    txn.commit().await?;

    Ok(view)
}

/// Adds `quantity` portions of a dish to the cart.
///
/// A dish already in the cart has its line incremented and keeps the price captured
/// when the line was first created.
///
/// # Errors
/// - [`Error::Validation`] if `quantity` is below 1
/// - [`Error::DishNotFound`] if the dish does not exist
#[instrument(skip(ctx, customer), fields(user_id = %customer.id))]
pub async fn add_item(
    ctx: &AppContext,
    customer: &Customer,
    dish_id: i64,
    quantity: i32,
) -> Result<OrderView> {
    if quantity < 1 {
        return Err(Error::validation(
            "quantity",
            format!("Quantity must be at least 1, got {quantity}"),
        ));
    }

    let _guard = ctx.cart_locks.lock(customer.id.clone()).await;
    let now = ctx.now();
    let txn = ctx.database.begin().await?;

    let dish = Dish::find_by_id(dish_id)
        .one(&txn)
        .await?
        .ok_or(Error::DishNotFound { id: dish_id })?;

    let cart = get_or_create_cart(&txn, &customer.id, now).await?;

    let existing = OrderItem::find()
        .filter(order_item::Column::OrderId.eq(cart.id))
        .filter(order_item::Column::DishId.eq(dish_id))
        .one(&txn)
        .await?;

    let line = if let Some(existing) = existing {
        let new_quantity = existing.quantity.saturating_add(quantity);
        let mut active: order_item::ActiveModel = existing.into();
        active.quantity = Set(new_quantity);
        active.update(&txn).await?
    } else {
        order_item::ActiveModel {
            order_id: Set(cart.id),
            dish_id: Set(Some(dish.id)),
            quantity: Set(quantity),
            price_at_order: Set(dish.price),
            ..Default::default()
        }
        .insert(&txn)
        .await?
    };

    let view = recalculate_view(&txn, cart.id, now).await?;
    txn.commit().await?;

    info!(
        order_id = cart.id,
        item_id = line.id,
        dish_id,
        quantity = line.quantity,
        total = %view.total_price(),
        "Cart item added"
    );
    Ok(view)
}

/// Sets the quantity of one cart line.
///
/// # Errors
/// - [`Error::Validation`] if `quantity` is not positive
/// - [`Error::CartItemNotFound`] if the line is not in the caller's cart
#[instrument(skip(ctx, customer), fields(user_id = %customer.id))]
pub async fn update_item(
    ctx: &AppContext,
    customer: &Customer,
    item_id: i64,
    quantity: i32,
) -> Result<OrderView> {
    if quantity <= 0 {
        return Err(Error::validation(
            "quantity",
            format!("Quantity must be positive, got {quantity}"),
        ));
    }

    let _guard = ctx.cart_locks.lock(customer.id.clone()).await;
    let now = ctx.now();
    let txn = ctx.database.begin().await?;

    let cart = find_cart(&txn, &customer.id)
        .await?
        .ok_or(Error::CartItemNotFound { id: item_id })?;
    let item = find_cart_item(&txn, &cart, item_id).await?;

    let mut active: order_item::ActiveModel = item.into();
    active.quantity = Set(quantity);
    active.update(&txn).await?;

    let view = recalculate_view(&txn, cart.id, now).await?;
    txn.commit().await?;

    info!(order_id = cart.id, item_id, quantity, "Cart item updated");
    Ok(view)
}

/// Removes one line from the cart.
///
/// # Errors
/// - [`Error::NoActiveCart`] if the caller has no cart
/// - [`Error::CartItemNotFound`] if the line is not in the cart
#[instrument(skip(ctx, customer), fields(user_id = %customer.id))]
pub async fn remove_item(ctx: &AppContext, customer: &Customer, item_id: i64) -> Result<OrderView> {
    let _guard = ctx.cart_locks.lock(customer.id.clone()).await;
    let now = ctx.now();
    let txn = ctx.database.begin().await?;

    let cart = find_cart(&txn, &customer.id)
        .await?
        .ok_or(Error::NoActiveCart)?;
    let item = find_cart_item(&txn, &cart, item_id).await?;
    item.delete(&txn).await?;

    let view = recalculate_view(&txn, cart.id, now).await?;
    txn.commit().await?;

    info!(order_id = cart.id, item_id, "Cart item removed");
    Ok(view)
}

/// Removes every line from the cart. An attached coupon stays attached.
///
/// # Errors
/// - [`Error::NoActiveCart`] if the caller has no cart
#[instrument(skip(ctx, customer), fields(user_id = %customer.id))]
pub async fn clear_cart(ctx: &AppContext, customer: &Customer) -> Result<OrderView> {
    let _guard = ctx.cart_locks.lock(customer.id.clone()).await;
    let now = ctx.now();
    let txn = ctx.database.begin().await?;

    let cart = find_cart(&txn, &customer.id)
        .await?
        .ok_or(Error::NoActiveCart)?;

    let removed = OrderItem::delete_many()
        .filter(order_item::Column::OrderId.eq(cart.id))
        .exec(&txn)
        .await?
        .rows_affected;

    let view = recalculate_view(&txn, cart.id, now).await?;
    txn.commit().await?;

    info!(order_id = cart.id, removed, "Cart cleared");
    Ok(view)
}

/// Checks out the cart: recomputes the total and marks the order completed.
///
/// # Errors
/// - [`Error::NoActiveCart`] if the caller has no cart
/// - [`Error::EmptyCart`] if the cart has no lines
#[instrument(skip(ctx, customer), fields(user_id = %customer.id))]
pub async fn place_order(ctx: &AppContext, customer: &Customer) -> Result<OrderView> {
    let _guard = ctx.cart_locks.lock(customer.id.clone()).await;
    let now = ctx.now();
    let txn = ctx.database.begin().await?;

    let cart = find_cart(&txn, &customer.id)
        .await?
        .ok_or(Error::NoActiveCart)?;

    let line_count = OrderItem::find()
        .filter(order_item::Column::OrderId.eq(cart.id))
        .count(&txn)
        .await?;
    if line_count == 0 {
        return Err(Error::EmptyCart);
    }

    let priced = recalculate_view(&txn, cart.id, now).await?;

    let mut active: order::ActiveModel = priced.order.clone().into();
    active.status = Set(OrderStatus::Completed);
    active.pending_owner = Set(None);
    let completed = active.update(&txn).await?;

    let names = load_dish_names(&txn, &priced.items).await?;
    txn.commit().await?;

    let view = OrderView {
        order: completed,
        ..priced
    };

    info!(
        order_id = view.order.id,
        lines = view.items.len(),
        total = %view.total_price(),
        "Order placed"
    );
    send_order_confirmation(ctx, customer, &view, &names);
    Ok(view)
}

/// Completed orders of the caller, newest first.
#[instrument(skip(ctx, customer), fields(user_id = %customer.id))]
pub async fn order_history(ctx: &AppContext, customer: &Customer) -> Result<Vec<OrderView>> {
    let orders = Order::find()
        .filter(order::Column::UserId.eq(customer.id.as_str()))
        .filter(order::Column::Status.eq(OrderStatus::Completed))
        .order_by_desc(order::Column::CreatedAt)
        .order_by_desc(order::Column::Id)
        .all(&ctx.database)
        .await?;

    let mut views = Vec::with_capacity(orders.len());
    for order in orders {
        views.push(load_view(&ctx.database, order).await?);
    }
    Ok(views)
}

async fn load_dish_names<C>(db: &C, items: &[order_item::Model]) -> Result<HashMap<i64, String>>
where
    C: ConnectionTrait,
{
    let ids: Vec<i64> = items.iter().filter_map(|i| i.dish_id).collect();
    let dishes = Dish::find()
        .filter(dish::Column::Id.is_in(ids))
        .all(db)
        .await?;
    Ok(dishes.into_iter().map(|d| (d.id, d.name)).collect())
}

fn order_summary(view: &OrderView, dish_names: &HashMap<i64, String>) -> String {
    let mut details = String::new();
    for item in &view.items {
        let name = item
            .dish_id
            .and_then(|id| dish_names.get(&id))
            .map_or("Unavailable dish", String::as_str);
        let _ = writeln!(
            details,
            "- {name} (x{}) - ${:.2}",
            item.quantity,
            pricing::round_money(item.line_total())
        );
    }
    if let Some(coupon) = &view.coupon {
        let _ = writeln!(
            details,
            "\nCoupon Applied: {} (-{}%)",
            coupon.code, coupon.discount_percent
        );
    }
    details
}

fn send_order_confirmation(
    ctx: &AppContext,
    customer: &Customer,
    view: &OrderView,
    dish_names: &HashMap<i64, String>,
) {
    let subject = format!("Your Step Ordering Order #{} is Confirmed!", view.order.id);
    let body = format!(
        "Hi {},\n\nYour order has been successfully placed.\n\n\
         Order Summary:\n{}\nTotal Price: ${:.2}\n\nThank you for your purchase!",
        customer.username,
        order_summary(view, dish_names),
        view.total_price(),
    );

    notify::dispatch_to(&ctx.notifier, customer.email.as_deref(), subject, body);
}
