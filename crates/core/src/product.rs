//! Catalog product input validation.

use serde::{Deserialize, Serialize};

use crate::types::{Price, ProductCondition};

/// Badge shown on products that do not set one.
pub const DEFAULT_BADGE: &str = "New Arrival";

/// Stock given to products created without a stock count.
pub const DEFAULT_STOCK: i32 = 1;

/// Errors from validating product input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProductError {
    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
    #[error("invalid condition: {0}")]
    InvalidCondition(String),
    #[error("stock cannot be negative")]
    NegativeStock,
}

/// Product fields as sent by the admin UI. Everything is optional so that
/// missing fields can be reported together instead of as a parse failure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Price>,
    pub original_price: Option<Price>,
    pub images: Option<Vec<String>>,
    pub category: Option<String>,
    pub condition: Option<String>,
    pub vintage: Option<bool>,
    pub stock: Option<i32>,
    pub is_active: Option<bool>,
    pub badge: Option<String>,
}

/// A validated product, ready to insert or to overwrite an existing one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDraft {
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
    pub badge: String,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn required<T>(value: Option<T>, field: &'static str, missing: &mut Vec<&'static str>) -> Option<T> {
    if value.is_none() {
        missing.push(field);
    }
    value
}

impl ProductInput {
    /// Validate the input, filling defaults for optional fields.
    ///
    /// # Errors
    ///
    /// Returns `ProductError::MissingFields` listing every absent required
    /// field (a price of zero counts as absent), `InvalidCondition` for an
    /// unknown grade and `NegativeStock` for a stock below zero.
    pub fn validate(self) -> Result<ProductDraft, ProductError> {
        let mut missing = Vec::new();
        let name = required(non_blank(self.name), "name", &mut missing);
        let description = required(non_blank(self.description), "description", &mut missing);
        let price = required(self.price.filter(Price::is_positive), "price", &mut missing);
        let original_price = required(
            self.original_price.filter(Price::is_positive),
            "originalPrice",
            &mut missing,
        );
        let images = self.images.map(|images| {
            images
                .into_iter()
                .map(|url| url.trim().to_owned())
                .filter(|url| !url.is_empty())
                .collect::<Vec<_>>()
        });
        let images = required(images.filter(|i| !i.is_empty()), "images", &mut missing);
        let category = required(non_blank(self.category), "category", &mut missing);
        let condition = required(non_blank(self.condition), "condition", &mut missing);

        let (
            Some(name),
            Some(description),
            Some(price),
            Some(original_price),
            Some(images),
            Some(category),
            Some(condition),
        ) = (name, description, price, original_price, images, category, condition)
        else {
            return Err(ProductError::MissingFields(missing));
        };

        let condition = condition
            .parse::<ProductCondition>()
            .map_err(|e| ProductError::InvalidCondition(e.value))?;

        let stock = self.stock.unwrap_or(DEFAULT_STOCK);
        if stock < 0 {
            return Err(ProductError::NegativeStock);
        }

        Ok(ProductDraft {
            name,
            description,
            price,
            original_price,
            images,
            category,
            condition,
            vintage: self.vintage.unwrap_or(false),
            stock,
            is_active: self.is_active.unwrap_or(true),
            badge: non_blank(self.badge).unwrap_or_else(|| DEFAULT_BADGE.to_owned()),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn input() -> ProductInput {
        ProductInput {
            name: Some("Levi's 501 ".to_owned()),
            description: Some("Classic straight fit, lightly faded.".to_owned()),
            price: Some(Price::from_rupees(899)),
            original_price: Some(Price::from_rupees(3499)),
            images: Some(vec!["https://cdn.example.com/501.jpg".to_owned()]),
            category: Some("Denim".to_owned()),
            condition: Some("good".to_owned()),
            ..ProductInput::default()
        }
    }

    #[test]
    fn test_validate_fills_defaults() {
        let draft = input().validate().unwrap();
        assert_eq!(draft.name, "Levi's 501");
        assert_eq!(draft.condition, ProductCondition::Good);
        assert_eq!(draft.stock, DEFAULT_STOCK);
        assert!(draft.is_active);
        assert!(!draft.vintage);
        assert_eq!(draft.badge, DEFAULT_BADGE);
    }

    #[test]
    fn test_validate_lists_missing_fields() {
        let mut bad = input();
        bad.images = Some(vec![String::new()]);
        bad.price = Some(Price::ZERO);
        bad.category = None;

        let err = bad.validate().unwrap_err();
        assert_eq!(
            err,
            ProductError::MissingFields(vec!["price", "images", "category"])
        );
        assert_eq!(
            err.to_string(),
            "missing required fields: price, images, category"
        );
    }

    #[test]
    fn test_validate_rejects_unknown_condition() {
        let mut bad = input();
        bad.condition = Some("Mint".to_owned());
        assert_eq!(
            bad.validate(),
            Err(ProductError::InvalidCondition("Mint".to_owned()))
        );
    }

    #[test]
    fn test_validate_keeps_explicit_zero_stock() {
        let mut sold_out = input();
        sold_out.stock = Some(0);
        assert_eq!(sold_out.validate().unwrap().stock, 0);

        let mut negative = input();
        negative.stock = Some(-1);
        assert_eq!(negative.validate(), Err(ProductError::NegativeStock));
    }

    #[test]
    fn test_deserialize_camel_case() {
        let json = r#"{"name":"Scarf","description":"Silk","price":"250","originalPrice":900,
                       "images":["a.jpg"],"category":"Accessories","condition":"Vintage",
                       "vintage":true,"isActive":false}"#;
        let draft = serde_json::from_str::<ProductInput>(json)
            .unwrap()
            .validate()
            .unwrap();
        assert!(draft.vintage);
        assert!(!draft.is_active);
        assert_eq!(draft.original_price, Price::from_rupees(900));
    }
}
