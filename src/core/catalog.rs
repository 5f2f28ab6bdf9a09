//! Menu catalog - Categories and dishes, with filtered and paginated listing.

use crate::{
    entities::{Dish, DishCategory, OrderItem, Review, dish, dish_category, order_item, review},
    errors::{Error, Result},
};
use rust_decimal::Decimal;
use sea_orm::{
    Condition, JoinType, PaginatorTrait, QueryOrder, QuerySelect, RelationTrait, Set,
    TransactionTrait, prelude::*, sea_query::Expr,
};
use serde::Serialize;
use tracing::info;

/// Dishes per page when the caller does not ask for a size.
pub const DEFAULT_PAGE_SIZE: u64 = 9;
/// Largest page a caller may request.
pub const MAX_PAGE_SIZE: u64 = 100;

const SPICINESS_LABELS: [&str; 5] = ["Not Spicy", "Mild", "Medium", "Hot", "Very Hot"];

/// Display name of a spiciness level.
#[must_use]
pub fn spiciness_label(level: i32) -> Option<&'static str> {
    usize::try_from(level)
        .ok()
        .and_then(|i| SPICINESS_LABELS.get(i).copied())
}

/// URL-safe slug: lowercase ASCII words joined by single hyphens.
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_separator = false;

    for c in name.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() || c == '_' {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(c);
        } else if c.is_whitespace() || c == '-' {
            pending_separator = true;
        }
    }

    slug.trim_matches('_').to_string()
}

/// Menu filters. `None` fields do not constrain the listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DishFilter {
    pub category: Option<String>,
    pub spiciness: Option<i32>,
    pub has_nuts: Option<bool>,
    pub is_vegetarian: Option<bool>,
}

impl DishFilter {
    fn condition(&self) -> Condition {
        Condition::all()
            .add_option(
                self.category
                    .as_deref()
                    .map(|slug| dish_category::Column::Slug.eq(slug)),
            )
            .add_option(self.spiciness.map(|level| dish::Column::Spiciness.eq(level)))
            .add_option(self.has_nuts.map(|flag| dish::Column::HasNuts.eq(flag)))
            .add_option(
                self.is_vegetarian
                    .map(|flag| dish::Column::IsVegetarian.eq(flag)),
            )
    }
}

/// Sort order of a dish listing. Ties fall back to id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DishOrdering {
    /// Insertion order
    #[default]
    Id,
    NameAsc,
    NameDesc,
    PriceAsc,
    PriceDesc,
}

/// Which page of a listing to fetch, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub page_size: u64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    /// Page `page` with the given size; a size of 0 means the default, larger than
    /// [`MAX_PAGE_SIZE`] is capped.
    #[must_use]
    pub fn new(page: u64, page_size: u64) -> Self {
        let page_size = match page_size {
            0 => DEFAULT_PAGE_SIZE,
            n => n.min(MAX_PAGE_SIZE),
        };
        Self { page, page_size }
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    /// Records on this page
    pub items: Vec<T>,
    /// 1-based page number
    pub page: u64,
    /// Requested page size after clamping
    pub page_size: u64,
    /// Matching records across all pages
    pub total_items: u64,
    /// Number of pages at this size
    pub total_pages: u64,
}

/// All categories ordered by name.
pub async fn list_categories<C>(db: &C) -> Result<Vec<dish_category::Model>>
where
    C: ConnectionTrait,
{
    DishCategory::find()
        .order_by_asc(dish_category::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds a category by slug.
pub async fn get_category_by_slug<C>(db: &C, slug: &str) -> Result<Option<dish_category::Model>>
where
    C: ConnectionTrait,
{
    DishCategory::find()
        .filter(dish_category::Column::Slug.eq(slug))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Creates a category. The slug is derived from the name when not given.
pub async fn create_category<C>(
    db: &C,
    name: &str,
    slug: Option<&str>,
) -> Result<dish_category::Model>
where
    C: ConnectionTrait,
{
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::validation("name", "Category name cannot be empty"));
    }
    let slug = slug
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map_or_else(|| slugify(name), slugify);
    if slug.is_empty() {
        return Err(Error::validation(
            "slug",
            format!("Cannot derive a slug from '{name}'"),
        ));
    }

    let taken = DishCategory::find()
        .filter(
            Condition::any()
                .add(dish_category::Column::Name.eq(name))
                .add(dish_category::Column::Slug.eq(slug.as_str())),
        )
        .one(db)
        .await?;
    if let Some(existing) = taken {
        return Err(Error::validation(
            "name",
            format!("Category '{}' ({}) already exists", existing.name, existing.slug),
        ));
    }

    let category = dish_category::ActiveModel {
        name: Set(name.to_string()),
        slug: Set(slug),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(category_id = category.id, slug = %category.slug, "Category created");
    Ok(category)
}

/// Fields of a new dish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDish {
    pub category_slug: String,
    pub name: String,
    pub price: Decimal,
    pub spiciness: i32,
    pub has_nuts: bool,
    pub is_vegetarian: bool,
    pub is_featured: bool,
    pub description: Option<String>,
}

impl NewDish {
    /// A plain dish: not spicy, no nuts, not vegetarian, not featured.
    #[must_use]
    pub fn new(category_slug: impl Into<String>, name: impl Into<String>, price: Decimal) -> Self {
        Self {
            category_slug: category_slug.into(),
            name: name.into(),
            price,
            spiciness: 0,
            has_nuts: false,
            is_vegetarian: false,
            is_featured: false,
            description: None,
        }
    }
}

/// Adds a dish to a category.
///
/// # Errors
/// - [`Error::Validation`] for a blank name, negative price or spiciness outside 0..=4
/// - [`Error::CategoryNotFound`] if the slug matches no category
pub async fn create_dish<C>(db: &C, new: NewDish) -> Result<dish::Model>
where
    C: ConnectionTrait,
{
    let name = new.name.trim();
    if name.is_empty() {
        return Err(Error::validation("name", "Dish name cannot be empty"));
    }
    if new.price.is_sign_negative() {
        return Err(Error::validation(
            "price",
            format!("Price cannot be negative, got {}", new.price),
        ));
    }
    if spiciness_label(new.spiciness).is_none() {
        return Err(Error::validation(
            "spiciness",
            format!("Spiciness must be between 0 and 4, got {}", new.spiciness),
        ));
    }

    let category = get_category_by_slug(db, &new.category_slug)
        .await?
        .ok_or_else(|| Error::CategoryNotFound {
            slug: new.category_slug.clone(),
        })?;

    let dish = dish::ActiveModel {
        category_id: Set(category.id),
        name: Set(name.to_string()),
        price: Set(new.price),
        spiciness: Set(new.spiciness),
        has_nuts: Set(new.has_nuts),
        is_vegetarian: Set(new.is_vegetarian),
        is_featured: Set(new.is_featured),
        description: Set(new.description),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(dish_id = dish.id, category = %category.slug, price = %dish.price, "Dish created");
    Ok(dish)
}

/// Finds a dish by id.
pub async fn get_dish<C>(db: &C, dish_id: i64) -> Result<dish::Model>
where
    C: ConnectionTrait,
{
    Dish::find_by_id(dish_id)
        .one(db)
        .await?
        .ok_or(Error::DishNotFound { id: dish_id })
}

/// Lists dishes matching `filter`, sorted and paginated.
///
/// Pages past the end come back empty.
pub async fn list_dishes<C>(
    db: &C,
    filter: &DishFilter,
    ordering: DishOrdering,
    page: PageRequest,
) -> Result<Page<dish::Model>>
where
    C: ConnectionTrait,
{
    if page.page == 0 {
        return Err(Error::validation("page", "Pages are numbered from 1"));
    }

    let query = Dish::find()
        .join(JoinType::InnerJoin, dish::Relation::Category.def())
        .filter(filter.condition());

    let query = match ordering {
        DishOrdering::Id => query,
        DishOrdering::NameAsc => query.order_by_asc(dish::Column::Name),
        DishOrdering::NameDesc => query.order_by_desc(dish::Column::Name),
        DishOrdering::PriceAsc => query.order_by_asc(dish::Column::Price),
        DishOrdering::PriceDesc => query.order_by_desc(dish::Column::Price),
    }
    .order_by_asc(dish::Column::Id);

    let paginator = query.paginate(db, page.page_size);
    let counts = paginator.num_items_and_pages().await?;
    let items = paginator.fetch_page(page.page - 1).await?;

    Ok(Page {
        items,
        page: page.page,
        page_size: page.page_size,
        total_items: counts.number_of_items,
        total_pages: counts.number_of_pages,
    })
}

/// Dishes flagged as featured, by id.
pub async fn list_featured_dishes<C>(db: &C) -> Result<Vec<dish::Model>>
where
    C: ConnectionTrait,
{
    Dish::find()
        .filter(dish::Column::IsFeatured.eq(true))
        .order_by_asc(dish::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Removes a dish from the menu. Order lines that referenced it are kept without
/// a dish; its reviews are removed.
pub async fn delete_dish<C>(db: &C, dish_id: i64) -> Result<()>
where
    C: ConnectionTrait + TransactionTrait,
{
    let txn = db.begin().await?;

    let dish = get_dish(&txn, dish_id).await?;

    let detached = OrderItem::update_many()
        .col_expr(order_item::Column::DishId, Expr::value(Option::<i64>::None))
        .filter(order_item::Column::DishId.eq(dish_id))
        .exec(&txn)
        .await?
        .rows_affected;

    Review::delete_many()
        .filter(review::Column::DishId.eq(dish_id))
        .exec(&txn)
        .await?;

    dish.delete(&txn).await?;
    txn.commit().await?;

    info!(dish_id, detached, "Dish deleted");
    Ok(())
}
