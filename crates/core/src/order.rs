//! Order snapshots, shipping addresses and stock planning.
//!
//! An order freezes the cart lines, the computed totals and the shipping
//! address at the moment of checkout. After creation only the status and the
//! assignment fields change.

use serde::{Deserialize, Serialize};

use crate::cart::{Cart, CartItem};
use crate::checkout::{CheckoutSummary, CouponError};
use crate::types::{Email, PaymentMethod, Price, ProductId, UserId};

fn default_country() -> String {
    "India".to_owned()
}

/// Where an order is shipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub full_name: String,
    pub mobile_number: String,
    pub street: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub landmark: Option<String>,
    pub city: String,
    pub state: String,
    /// Six-digit PIN code.
    pub zip: String,
    #[serde(default = "default_country")]
    pub country: String,
}

/// A shipping address field that failed validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("full name must be at least 2 characters")]
    FullName,
    #[error("please enter a valid 10-digit mobile number")]
    MobileNumber,
    #[error("street address must be at least 5 characters")]
    Street,
    #[error("city must be at least 2 characters")]
    City,
    #[error("state must be at least 2 characters")]
    State,
    #[error("please enter a valid 6-digit PIN code")]
    Zip,
    #[error("country is required")]
    Country,
}

fn has_min_chars(value: &str, min: usize) -> bool {
    value.trim().chars().count() >= min
}

fn is_digits(value: &str, len: usize) -> bool {
    value.len() == len && value.bytes().all(|b| b.is_ascii_digit())
}

impl ShippingAddress {
    /// Check every field, reporting the first one that is invalid.
    ///
    /// # Errors
    ///
    /// Returns the `AddressError` variant naming the offending field.
    pub fn validate(&self) -> Result<(), AddressError> {
        if !has_min_chars(&self.full_name, 2) {
            return Err(AddressError::FullName);
        }
        if !is_digits(self.mobile_number.trim(), 10) {
            return Err(AddressError::MobileNumber);
        }
        if !has_min_chars(&self.street, 5) {
            return Err(AddressError::Street);
        }
        if !has_min_chars(&self.city, 2) {
            return Err(AddressError::City);
        }
        if !has_min_chars(&self.state, 2) {
            return Err(AddressError::State);
        }
        if !is_digits(self.zip.trim(), 6) {
            return Err(AddressError::Zip);
        }
        if !has_min_chars(&self.country, 2) {
            return Err(AddressError::Country);
        }
        Ok(())
    }
}

/// A frozen cart line on an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: ProductId,
    pub name: String,
    pub price: Price,
    pub image: String,
    pub quantity: u32,
}

impl From<&CartItem> for OrderItem {
    fn from(item: &CartItem) -> Self {
        Self {
            product_id: item.product_id,
            name: item.name.clone(),
            price: item.price,
            image: item.image.clone(),
            quantity: item.quantity,
        }
    }
}

/// Stock to take off one product for one order line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockAdjustment {
    pub product_id: ProductId,
    /// Index of the order line this adjustment comes from.
    pub line: u32,
    pub quantity: u32,
}

/// Stock left after selling `quantity` units, floored at zero.
#[must_use]
pub fn remaining_stock(current: i32, quantity: u32) -> i32 {
    let sold = i32::try_from(quantity).unwrap_or(i32::MAX);
    current.saturating_sub(sold).max(0)
}

/// Errors from building an order out of a cart.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderError {
    #[error("cart is empty")]
    EmptyCart,
    #[error("invalid shipping address: {0}")]
    Address(#[from] AddressError),
    #[error(transparent)]
    Coupon(#[from] CouponError),
    #[error("a UPI id is required for UPI payments")]
    MissingUpiId,
}

/// Everything needed to insert an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub user_id: UserId,
    pub user_email: Email,
    pub items: Vec<OrderItem>,
    pub summary: CheckoutSummary,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub upi_id: Option<String>,
}

impl NewOrder {
    /// Snapshot a cart into an order, pricing it server-side.
    ///
    /// # Errors
    ///
    /// Returns `OrderError` if the cart is empty, the address is invalid,
    /// the coupon is unknown, or a UPI payment has no UPI id.
    pub fn from_cart(
        user_id: UserId,
        user_email: Email,
        cart: &Cart,
        coupon_code: Option<&str>,
        shipping_address: ShippingAddress,
        payment_method: PaymentMethod,
        upi_id: Option<String>,
    ) -> Result<Self, OrderError> {
        if cart.is_empty() {
            return Err(OrderError::EmptyCart);
        }
        shipping_address.validate()?;

        let upi_id = upi_id
            .map(|id| id.trim().to_owned())
            .filter(|id| !id.is_empty());
        if payment_method == PaymentMethod::Upi && upi_id.is_none() {
            return Err(OrderError::MissingUpiId);
        }

        let summary = CheckoutSummary::quote(cart, coupon_code)?;

        Ok(Self {
            user_id,
            user_email,
            items: cart.items().iter().map(OrderItem::from).collect(),
            summary,
            shipping_address,
            payment_method,
            upi_id,
        })
    }

    /// One stock adjustment per order line, in line order.
    ///
    /// Lines are never combined, so two lines for the same product each
    /// produce their own adjustment.
    #[must_use]
    pub fn stock_adjustments(&self) -> Vec<StockAdjustment> {
        stock_adjustments(&self.items)
    }
}

/// One stock adjustment per order line, in line order.
#[must_use]
pub fn stock_adjustments(items: &[OrderItem]) -> Vec<StockAdjustment> {
    items
        .iter()
        .zip(0_u32..)
        .map(|(item, line)| StockAdjustment {
            product_id: item.product_id,
            line,
            quantity: item.quantity,
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn address() -> ShippingAddress {
        ShippingAddress {
            full_name: "Asha Rao".to_owned(),
            mobile_number: "9876543210".to_owned(),
            street: "12 MG Road".to_owned(),
            landmark: None,
            city: "Pune".to_owned(),
            state: "Maharashtra".to_owned(),
            zip: "411001".to_owned(),
            country: "India".to_owned(),
        }
    }

    fn line(id: i32, rupees: i64, quantity: u32) -> CartItem {
        CartItem {
            product_id: ProductId::new(id),
            name: format!("Piece {id}"),
            price: Price::from_rupees(rupees),
            image: String::new(),
            quantity,
        }
    }

    fn email() -> Email {
        Email::parse("asha@example.com").unwrap()
    }

    #[test]
    fn test_valid_address() {
        assert_eq!(address().validate(), Ok(()));
    }

    #[test]
    fn test_address_field_errors() {
        let mut bad = address();
        bad.mobile_number = "98765".to_owned();
        assert_eq!(bad.validate(), Err(AddressError::MobileNumber));

        let mut bad = address();
        bad.zip = "41100A".to_owned();
        assert_eq!(bad.validate(), Err(AddressError::Zip));

        let mut bad = address();
        bad.street = "MG".to_owned();
        assert_eq!(bad.validate(), Err(AddressError::Street));

        let mut bad = address();
        bad.full_name = " A ".to_owned();
        assert_eq!(bad.validate(), Err(AddressError::FullName));
    }

    #[test]
    fn test_country_defaults_to_india() {
        let json = r#"{"fullName":"Asha Rao","mobileNumber":"9876543210","street":"12 MG Road",
                       "city":"Pune","state":"Maharashtra","zip":"411001"}"#;
        let parsed: ShippingAddress = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.country, "India");
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn test_from_cart_snapshots_lines_and_totals() {
        let cart = Cart::from_items([line(1, 300, 1), line(2, 150, 2)]);
        let order = NewOrder::from_cart(
            UserId::new(1),
            email(),
            &cart,
            Some("1ncemore"),
            address(),
            PaymentMethod::Cod,
            None,
        )
        .unwrap();

        assert_eq!(order.items.len(), 2);
        assert_eq!(order.items[1].quantity, 2);
        assert_eq!(order.summary.total_price, Price::from_rupees(600));
        assert_eq!(order.summary.final_total, Price::from_rupees(580));
        assert_eq!(order.summary.shipping_cost, Price::ZERO);
        assert_eq!(order.summary.total_amount, Price::from_rupees(580));
    }

    #[test]
    fn test_from_cart_rejects_empty_cart() {
        let err = NewOrder::from_cart(
            UserId::new(1),
            email(),
            &Cart::new(),
            None,
            address(),
            PaymentMethod::Cod,
            None,
        )
        .unwrap_err();
        assert_eq!(err, OrderError::EmptyCart);
    }

    #[test]
    fn test_upi_requires_upi_id() {
        let cart = Cart::from_items([line(1, 300, 1)]);
        let err = NewOrder::from_cart(
            UserId::new(1),
            email(),
            &cart,
            None,
            address(),
            PaymentMethod::Upi,
            Some("  ".to_owned()),
        )
        .unwrap_err();
        assert_eq!(err, OrderError::MissingUpiId);
    }

    #[test]
    fn test_stock_adjustments_are_per_line() {
        let items = vec![
            OrderItem::from(&line(7, 100, 1)),
            OrderItem::from(&line(7, 100, 3)),
        ];
        let adjustments = stock_adjustments(&items);
        assert_eq!(adjustments.len(), 2);
        assert_eq!(adjustments[0].line, 0);
        assert_eq!(adjustments[1].line, 1);

        // Each line applied against a fresh stock of 10 lands independently
        assert_eq!(remaining_stock(10, adjustments[0].quantity), 9);
        assert_eq!(remaining_stock(10, adjustments[1].quantity), 7);
    }

    #[test]
    fn test_remaining_stock_floors_at_zero() {
        assert_eq!(remaining_stock(2, 5), 0);
        assert_eq!(remaining_stock(0, u32::MAX), 0);
    }
}
