//! Catalog reads and writes with an in-memory product cache.
//!
//! Listings and single products are cached via `moka` (5-minute TTL). Any
//! write, including a stock decrement from the outbox, drops the whole cache.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sqlx::PgPool;
use tracing::{debug, instrument};

use oncemore_core::{OrderId, ProductDraft, ProductId, StockAdjustment};

use crate::db::RepositoryError;
use crate::db::products::{ProductFilter, ProductPage, ProductRepository, StockOutcome};
use crate::models::Product;

/// Cache key for products and listings.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
enum CacheKey {
    Product(ProductId),
    Products(ProductFilter),
}

/// Cached value types.
#[derive(Debug, Clone)]
enum CacheValue {
    Product(Box<Product>),
    Products(ProductPage),
}

/// Catalog access for handlers and the outbox dispatcher.
///
/// Cheap to clone; clones share the pool and the cache.
#[derive(Clone)]
pub struct CatalogService {
    inner: Arc<CatalogServiceInner>,
}

struct CatalogServiceInner {
    pool: PgPool,
    cache: Cache<CacheKey, CacheValue>,
}

impl CatalogService {
    /// Create a catalog service over the catalog pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Self {
            inner: Arc::new(CatalogServiceInner { pool, cache }),
        }
    }

    /// The catalog database pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    fn products(&self) -> ProductRepository<'_> {
        ProductRepository::new(&self.inner.pool)
    }

    /// List products.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the query fails.
    #[instrument(skip(self))]
    pub async fn list(&self, filter: &ProductFilter) -> Result<ProductPage, RepositoryError> {
        let cache_key = CacheKey::Products(filter.clone());

        if let Some(CacheValue::Products(page)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product listing");
            return Ok(page);
        }

        let page = self.products().list(filter).await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Products(page.clone()))
            .await;

        Ok(page)
    }

    /// Get one product. Misses are not cached.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the query fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let cache_key = CacheKey::Product(id);

        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(Some(*product));
        }

        let product = self.products().get(id).await?;

        if let Some(product) = &product {
            self.inner
                .cache
                .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
                .await;
        }

        Ok(product)
    }

    /// Create a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the insert fails.
    pub async fn create(&self, draft: &ProductDraft) -> Result<ProductId, RepositoryError> {
        let id = self.products().create(draft).await?;
        self.invalidate_all().await;
        Ok(id)
    }

    /// Replace a product's fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown product.
    pub async fn update(&self, id: ProductId, draft: &ProductDraft) -> Result<(), RepositoryError> {
        self.products().update(id, draft).await?;
        self.invalidate_all().await;
        Ok(())
    }

    /// Delete a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown product.
    pub async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        self.products().delete(id).await?;
        self.invalidate_all().await;
        Ok(())
    }

    /// Apply one order line's stock decrement.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the catalog transaction fails.
    pub async fn apply_stock_adjustment(
        &self,
        order_id: OrderId,
        adjustment: &StockAdjustment,
    ) -> Result<StockOutcome, RepositoryError> {
        let outcome = self
            .products()
            .apply_stock_adjustment(order_id, adjustment)
            .await?;
        if matches!(outcome, StockOutcome::Applied { .. }) {
            self.invalidate_all().await;
        }
        Ok(outcome)
    }

    /// Drop every cached entry.
    pub async fn invalidate_all(&self) {
        self.inner.cache.invalidate_all();
        self.inner.cache.run_pending_tasks().await;
    }
}
