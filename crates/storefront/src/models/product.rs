//! Catalog product type.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use oncemore_core::{Price, ProductCondition, ProductId};

/// A product as stored in the catalog database.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Price,
    pub original_price: Price,
    pub images: Vec<String>,
    pub category: String,
    pub condition: ProductCondition,
    pub vintage: bool,
    pub stock: i32,
    pub is_active: bool,
    pub rating: Decimal,
    pub reviews: i32,
    pub badge: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// First image, used as the cart thumbnail.
    #[must_use]
    pub fn primary_image(&self) -> &str {
        self.images.first().map_or("", String::as_str)
    }
}
