//! Catalog product repository.
//!
//! Lives in the catalog database. Stock decrements are recorded in
//! `catalog.stock_ledger` under the order line they came from, so replaying
//! the same outbox event is harmless.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;

use oncemore_core::order::remaining_stock;
use oncemore_core::{OrderId, Price, ProductCondition, ProductDraft, ProductId, StockAdjustment};

use super::RepositoryError;
use crate::models::Product;

const PRODUCT_COLUMNS: &str = r"
    id, name, description, price, original_price, images, category, condition,
    vintage, stock, is_active, rating, reviews, badge, created_at, updated_at
";

/// Shared `WHERE` clause for listing and counting.
const FILTER_CLAUSE: &str = r"
    WHERE ($1::BOOLEAN OR is_active)
      AND ($2::TEXT IS NULL OR lower(category) = lower($2))
      AND ($3::product_condition IS NULL OR condition = $3)
      AND ($4::TEXT IS NULL OR name ILIKE $4 OR description ILIKE $4)
";

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: i32,
    name: String,
    description: String,
    price: Price,
    original_price: Price,
    images: Vec<String>,
    category: String,
    condition: ProductCondition,
    vintage: bool,
    stock: i32,
    is_active: bool,
    rating: Decimal,
    reviews: i32,
    badge: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: ProductId::new(row.id),
            name: row.name,
            description: row.description,
            price: row.price,
            original_price: row.original_price,
            images: row.images,
            category: row.category,
            condition: row.condition,
            vintage: row.vintage,
            stock: row.stock,
            is_active: row.is_active,
            rating: row.rating,
            reviews: row.reviews,
            badge: row.badge,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Listing order. Unrecognised values (the storefront links `trending`,
/// for one) fall back to newest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(from = "String")]
pub enum ProductSort {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
}

impl From<String> for ProductSort {
    fn from(value: String) -> Self {
        match value.trim().to_lowercase().as_str() {
            "price_asc" => Self::PriceAsc,
            "price_desc" => Self::PriceDesc,
            _ => Self::Newest,
        }
    }
}

impl ProductSort {
    const fn order_by(self) -> &'static str {
        match self {
            Self::Newest => "created_at DESC, id DESC",
            Self::PriceAsc => "price ASC, id ASC",
            Self::PriceDesc => "price DESC, id DESC",
        }
    }
}

/// Catalog listing filters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ProductFilter {
    /// Case-insensitive exact category match.
    pub category: Option<String>,
    pub condition: Option<ProductCondition>,
    /// Case-insensitive substring of name or description.
    pub search: Option<String>,
    pub include_inactive: bool,
    pub sort: ProductSort,
    pub limit: Option<i64>,
}

/// A page of products plus the number of matches before the limit.
#[derive(Debug, Clone)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub total: i64,
}

/// Result of applying one stock adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockOutcome {
    /// Stock was decremented; holds the new count.
    Applied { stock_after: i32 },
    /// This order line was already applied.
    AlreadyApplied,
    /// The product no longer exists.
    ProductMissing,
}

/// `ILIKE` pattern matching `search` literally anywhere in the text.
fn like_pattern(search: &str) -> String {
    let mut pattern = String::with_capacity(search.len() + 2);
    pattern.push('%');
    for c in search.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Repository for catalog products.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List products matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(&self, filter: &ProductFilter) -> Result<ProductPage, RepositoryError> {
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(like_pattern);

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM catalog.product {FILTER_CLAUSE}"
        ))
        .bind(filter.include_inactive)
        .bind(filter.category.as_deref())
        .bind(filter.condition)
        .bind(search.as_deref())
        .fetch_one(self.pool)
        .await?;

        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM catalog.product {FILTER_CLAUSE} ORDER BY {} LIMIT $5",
            filter.sort.order_by()
        ))
        .bind(filter.include_inactive)
        .bind(filter.category.as_deref())
        .bind(filter.condition)
        .bind(search.as_deref())
        .bind(filter.limit)
        .fetch_all(self.pool)
        .await?;

        Ok(ProductPage {
            products: rows.into_iter().map(Product::from).collect(),
            total,
        })
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM catalog.product WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Product::from))
    }

    /// Insert a product, returning its ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, draft: &ProductDraft) -> Result<ProductId, RepositoryError> {
        let id = sqlx::query_scalar::<_, ProductId>(
            r"
            INSERT INTO catalog.product (
                name, description, price, original_price, images, category,
                condition, vintage, stock, is_active, badge
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id
            ",
        )
        .bind(&draft.name)
        .bind(&draft.description)
        .bind(draft.price)
        .bind(draft.original_price)
        .bind(&draft.images)
        .bind(&draft.category)
        .bind(draft.condition)
        .bind(draft.vintage)
        .bind(draft.stock)
        .bind(draft.is_active)
        .bind(&draft.badge)
        .fetch_one(self.pool)
        .await?;

        Ok(id)
    }

    /// Replace a product's editable fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn update(&self, id: ProductId, draft: &ProductDraft) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE catalog.product
            SET name = $2, description = $3, price = $4, original_price = $5,
                images = $6, category = $7, condition = $8, vintage = $9,
                stock = $10, is_active = $11, badge = $12, updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(&draft.name)
        .bind(&draft.description)
        .bind(draft.price)
        .bind(draft.original_price)
        .bind(&draft.images)
        .bind(&draft.category)
        .bind(draft.condition)
        .bind(draft.vintage)
        .bind(draft.stock)
        .bind(draft.is_active)
        .bind(&draft.badge)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Hard-delete a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM catalog.product WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Take one order line's quantity off a product's stock, at most once.
    ///
    /// The product row is locked while the ledger is checked, so concurrent
    /// replays of the same line serialize and only the first one writes.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails; nothing is
    /// changed in that case.
    pub async fn apply_stock_adjustment(
        &self,
        order_id: OrderId,
        adjustment: &StockAdjustment,
    ) -> Result<StockOutcome, RepositoryError> {
        let line = i32::try_from(adjustment.line).map_err(|_| {
            RepositoryError::DataCorruption(format!(
                "order {order_id} has line index {}",
                adjustment.line
            ))
        })?;
        let quantity = i32::try_from(adjustment.quantity).unwrap_or(i32::MAX);

        let mut tx = self.pool.begin().await?;

        let Some(stock) = sqlx::query_scalar::<_, i32>(
            "SELECT stock FROM catalog.product WHERE id = $1 FOR UPDATE",
        )
        .bind(adjustment.product_id)
        .fetch_optional(&mut *tx)
        .await?
        else {
            return Ok(StockOutcome::ProductMissing);
        };

        let applied = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM catalog.stock_ledger WHERE order_id = $1 AND line = $2)",
        )
        .bind(order_id)
        .bind(line)
        .fetch_one(&mut *tx)
        .await?;
        if applied {
            return Ok(StockOutcome::AlreadyApplied);
        }

        let stock_after = remaining_stock(stock, adjustment.quantity);

        sqlx::query("UPDATE catalog.product SET stock = $2, updated_at = NOW() WHERE id = $1")
            .bind(adjustment.product_id)
            .bind(stock_after)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r"
            INSERT INTO catalog.stock_ledger (order_id, line, product_id, quantity, stock_after)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(order_id)
        .bind(line)
        .bind(adjustment.product_id)
        .bind(quantity)
        .bind(stock_after)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(StockOutcome::Applied { stock_after })
    }
}
