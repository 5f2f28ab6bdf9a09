//! Dish reviews - Ratings from customers who bought the dish.

use crate::{
    context::{AppContext, Customer},
    core::catalog,
    entities::{OrderItem, OrderStatus, Review, order, order_item, review},
    errors::{Error, Result},
};
use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::{
    JoinType, PaginatorTrait, QueryOrder, QuerySelect, RelationTrait, Set, SqlErr, prelude::*,
};
use serde::Serialize;
use tracing::{info, instrument};

/// Count and mean rating of a dish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RatingSummary {
    pub count: u64,
    /// Mean rating to one decimal place, `None` without reviews
    pub average: Option<Decimal>,
}

impl RatingSummary {
    #[must_use]
    pub fn from_ratings(ratings: &[i32]) -> Self {
        let count = ratings.len() as u64;
        let average = (count > 0).then(|| {
            let sum: i64 = ratings.iter().map(|&r| i64::from(r)).sum();
            (Decimal::from(sum) / Decimal::from(count))
                .round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
        });
        Self { count, average }
    }
}

/// Whether `user_id` has a completed order containing `dish_id`.
pub async fn has_purchased<C>(db: &C, user_id: &str, dish_id: i64) -> Result<bool>
where
    C: ConnectionTrait,
{
    let lines = OrderItem::find()
        .join(JoinType::InnerJoin, order_item::Relation::Order.def())
        .filter(order::Column::UserId.eq(user_id))
        .filter(order::Column::Status.eq(OrderStatus::Completed))
        .filter(order_item::Column::DishId.eq(dish_id))
        .count(db)
        .await?;
    Ok(lines > 0)
}

/// Records the caller's review of a dish they bought.
///
/// # Errors
/// - [`Error::Validation`] if the rating is outside 1..=5
/// - [`Error::DishNotFound`] if the dish does not exist
/// - [`Error::NotPurchased`] if no completed order of the caller contains the dish
/// - [`Error::DuplicateReview`] if the caller already reviewed the dish
#[instrument(skip(ctx, customer, comment), fields(user_id = %customer.id))]
pub async fn create_review(
    ctx: &AppContext,
    customer: &Customer,
    dish_id: i64,
    rating: i32,
    comment: Option<String>,
) -> Result<review::Model> {
    if !(1..=5).contains(&rating) {
        return Err(Error::validation(
            "rating",
            format!("Rating must be between 1 and 5, got {rating}"),
        ));
    }

    let db = &ctx.database;
    catalog::get_dish(db, dish_id).await?;

    if !has_purchased(db, &customer.id, dish_id).await? {
        return Err(Error::NotPurchased { dish_id });
    }

    let already = Review::find()
        .filter(review::Column::UserId.eq(customer.id.as_str()))
        .filter(review::Column::DishId.eq(dish_id))
        .count(db)
        .await?;
    if already > 0 {
        return Err(Error::DuplicateReview { dish_id });
    }

    let comment = comment
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());

    let inserted = review::ActiveModel {
        dish_id: Set(dish_id),
        user_id: Set(customer.id.clone()),
        rating: Set(rating),
        comment: Set(comment),
        created_at: Set(ctx.now()),
        ..Default::default()
    }
    .insert(db)
    .await;

    match inserted {
        Ok(review) => {
            info!(review_id = review.id, dish_id, rating, "Review created");
            Ok(review)
        }
        Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            Err(Error::DuplicateReview { dish_id })
        }
        Err(e) => Err(e.into()),
    }
}

/// Reviews of a dish, newest first.
pub async fn list_reviews<C>(db: &C, dish_id: i64) -> Result<Vec<review::Model>>
where
    C: ConnectionTrait,
{
    catalog::get_dish(db, dish_id).await?;

    Review::find()
        .filter(review::Column::DishId.eq(dish_id))
        .order_by_desc(review::Column::CreatedAt)
        .order_by_desc(review::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Rating count and average of a dish.
pub async fn rating_summary<C>(db: &C, dish_id: i64) -> Result<RatingSummary>
where
    C: ConnectionTrait,
{
    catalog::get_dish(db, dish_id).await?;

    let ratings: Vec<i32> = Review::find()
        .select_only()
        .column(review::Column::Rating)
        .filter(review::Column::DishId.eq(dish_id))
        .into_tuple()
        .all(db)
        .await?;

    Ok(RatingSummary::from_ratings(&ratings))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::cart::{add_item, place_order};
    use crate::test_utils::*;
    use chrono::Duration;

    async fn buy(ctx: &AppContext, customer: &Customer, dish_id: i64) -> Result<()> {
        add_item(ctx, customer, dish_id, 1).await?;
        place_order(ctx, customer).await?;
        Ok(())
    }

    #[test]
    fn test_rating_summary_rounds_to_one_place() {
        let summary = RatingSummary::from_ratings(&[5, 4, 4]);
        assert_eq!(summary.count, 3);
        // 13 / 3 = 4.333...
        assert_eq!(summary.average, Some(Decimal::new(43, 1)));

        let summary = RatingSummary::from_ratings(&[4, 5]);
        assert_eq!(summary.average, Some(Decimal::new(45, 1)));

        assert_eq!(
            RatingSummary::from_ratings(&[]),
            RatingSummary {
                count: 0,
                average: None
            }
        );
    }

    #[tokio::test]
    async fn test_create_review_requires_purchase() -> Result<()> {
        let (ctx, _clock) = setup_context().await?;
        let customer = test_customer();
        let soup = create_test_dish(&ctx.database, "Soup", money(800)).await?;

        let result = create_review(&ctx, &customer, soup.id, 5, None).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::NotPurchased { dish_id } if dish_id == soup.id
        ));

        // A dish sitting in the open cart does not count as purchased
        add_item(&ctx, &customer, soup.id, 1).await?;
        let result = create_review(&ctx, &customer, soup.id, 5, None).await;
        assert!(matches!(result.unwrap_err(), Error::NotPurchased { .. }));

        place_order(&ctx, &customer).await?;
        let review = create_review(&ctx, &customer, soup.id, 5, Some("  Great  ".into())).await?;
        assert_eq!(review.rating, 5);
        assert_eq!(review.comment.as_deref(), Some("Great"));
        assert_eq!(review.created_at, test_now());
        Ok(())
    }

    #[tokio::test]
    async fn test_create_review_rejects_bad_input() -> Result<()> {
        let (ctx, _clock) = setup_context().await?;
        let customer = test_customer();
        let soup = create_test_dish(&ctx.database, "Soup", money(800)).await?;
        buy(&ctx, &customer, soup.id).await?;

        let result = create_review(&ctx, &customer, soup.id, 6, None).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::Validation {
                field: "rating",
                ..
            }
        ));

        let result = create_review(&ctx, &customer, 404, 3, None).await;
        assert!(matches!(result.unwrap_err(), Error::DishNotFound { id: 404 }));

        create_review(&ctx, &customer, soup.id, 3, None).await?;
        let result = create_review(&ctx, &customer, soup.id, 4, None).await;
        assert!(matches!(result.unwrap_err(), Error::DuplicateReview { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_list_reviews_and_summary() -> Result<()> {
        let (ctx, clock) = setup_context().await?;
        let soup = create_test_dish(&ctx.database, "Soup", money(800)).await?;
        let alice = Customer::new("alice", "Alice");
        let bob = Customer::new("bob", "Bob");

        buy(&ctx, &alice, soup.id).await?;
        buy(&ctx, &bob, soup.id).await?;

        let first = create_review(&ctx, &alice, soup.id, 4, None).await?;
        clock.advance(Duration::minutes(5));
        let second = create_review(&ctx, &bob, soup.id, 5, None).await?;

        let reviews = list_reviews(&ctx.database, soup.id).await?;
        let ids: Vec<i64> = reviews.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);

        let summary = rating_summary(&ctx.database, soup.id).await?;
        assert_eq!(summary.count, 2);
        assert_eq!(summary.average, Some(Decimal::new(45, 1)));

        assert!(matches!(
            rating_summary(&ctx.database, 404).await.unwrap_err(),
            Error::DishNotFound { .. }
        ));
        Ok(())
    }
}
