//! Coupon, shipping and checkout total rules.
//!
//! ```text
//! subtotal     = Σ price × quantity
//! final_total  = max(0, subtotal − coupon discount)
//! shipping     = ₹60 if final_total ≤ ₹500, else ₹0
//! total_amount = final_total + shipping
//! ```

use serde::{Deserialize, Serialize};

use crate::cart::Cart;
use crate::types::Price;

/// The only coupon the store issues.
pub const ONCEMORE_COUPON_CODE: &str = "1NCEMORE";

/// Flat discount granted by [`ONCEMORE_COUPON_CODE`], in rupees.
pub const ONCEMORE_DISCOUNT_RUPEES: i64 = 20;

/// Flat shipping fee for small orders, in rupees.
pub const SHIPPING_FEE_RUPEES: i64 = 60;

/// Orders whose final total is strictly above this ship free, in rupees.
pub const FREE_SHIPPING_ABOVE_RUPEES: i64 = 500;

/// Errors from applying a coupon.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CouponError {
    /// The code does not name a coupon.
    #[error("invalid coupon code")]
    Invalid,
    /// A coupon is already applied to this checkout.
    #[error("coupon already applied")]
    AlreadyApplied,
}

/// A recognized coupon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coupon {
    /// Canonical (uppercase) code.
    pub code: String,
    /// Flat amount taken off the subtotal.
    pub discount: Price,
}

impl Coupon {
    /// Look up a coupon code. Case and surrounding whitespace are ignored.
    ///
    /// # Errors
    ///
    /// Returns `CouponError::Invalid` for unknown codes.
    pub fn lookup(code: &str) -> Result<Self, CouponError> {
        let code = code.trim().to_uppercase();
        if code == ONCEMORE_COUPON_CODE {
            Ok(Self {
                code,
                discount: Price::from_rupees(ONCEMORE_DISCOUNT_RUPEES),
            })
        } else {
            Err(CouponError::Invalid)
        }
    }
}

/// Coupon slot of a checkout. At most one coupon applies, once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CouponState {
    applied: Option<Coupon>,
}

impl CouponState {
    /// Apply a coupon code.
    ///
    /// # Errors
    ///
    /// Returns `CouponError::AlreadyApplied` when a coupon is already in
    /// place (the existing discount is kept) and `CouponError::Invalid` for
    /// unknown codes.
    pub fn apply(&mut self, code: &str) -> Result<&Coupon, CouponError> {
        if self.applied.is_some() {
            return Err(CouponError::AlreadyApplied);
        }
        Ok(self.applied.insert(Coupon::lookup(code)?))
    }

    /// Drop the applied coupon, if any.
    pub fn remove(&mut self) {
        self.applied = None;
    }

    /// Whether a coupon is applied.
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        self.applied.is_some()
    }

    /// Applied coupon code.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.applied.as_ref().map(|c| c.code.as_str())
    }

    /// Discount of the applied coupon, zero if none.
    #[must_use]
    pub fn discount(&self) -> Price {
        self.applied.as_ref().map_or(Price::ZERO, |c| c.discount)
    }
}

/// Shipping fee for an order with the given post-discount total.
#[must_use]
pub fn shipping_cost(final_total: Price) -> Price {
    if final_total > Price::from_rupees(FREE_SHIPPING_ABOVE_RUPEES) {
        Price::ZERO
    } else {
        Price::from_rupees(SHIPPING_FEE_RUPEES)
    }
}

/// Priced breakdown of a cart at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSummary {
    pub total_items: u64,
    /// Sum of line totals before discount.
    pub total_price: Price,
    pub coupon_code: Option<String>,
    pub coupon_discount: Price,
    /// `max(0, total_price − coupon_discount)`.
    pub final_total: Price,
    pub shipping_cost: Price,
    /// Amount charged: `final_total + shipping_cost`.
    pub total_amount: Price,
}

impl CheckoutSummary {
    /// Price a cart with the given coupon slot.
    #[must_use]
    pub fn compute(cart: &Cart, coupon: &CouponState) -> Self {
        let total_price = cart.total_price();
        let coupon_discount = coupon.discount();
        let final_total = total_price.saturating_sub(coupon_discount);
        let shipping_cost = shipping_cost(final_total);

        Self {
            total_items: cart.total_items(),
            total_price,
            coupon_code: coupon.code().map(str::to_owned),
            coupon_discount,
            final_total,
            shipping_cost,
            total_amount: final_total + shipping_cost,
        }
    }

    /// Price a cart, applying `coupon_code` if one is given.
    ///
    /// # Errors
    ///
    /// Returns `CouponError::Invalid` if the code is not recognized.
    pub fn quote(cart: &Cart, coupon_code: Option<&str>) -> Result<Self, CouponError> {
        let mut coupon = CouponState::default();
        if let Some(code) = coupon_code.filter(|c| !c.trim().is_empty()) {
            coupon.apply(code)?;
        }
        Ok(Self::compute(cart, &coupon))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cart::CartItem;
    use crate::types::ProductId;

    fn cart_worth(paise: i64) -> Cart {
        Cart::from_items([CartItem {
            product_id: ProductId::new(1),
            name: "Corduroy jacket".to_owned(),
            price: Price::from_paise(paise),
            image: "jacket.jpg".to_owned(),
            quantity: 1,
        }])
    }

    #[test]
    fn test_coupon_lookup_normalizes() {
        let coupon = Coupon::lookup("  1nceMore ").unwrap();
        assert_eq!(coupon.code, "1NCEMORE");
        assert_eq!(coupon.discount, Price::from_rupees(20));
        assert_eq!(Coupon::lookup("SAVE50"), Err(CouponError::Invalid));
    }

    #[test]
    fn test_coupon_applies_once() {
        let mut state = CouponState::default();
        state.apply("1NCEMORE").unwrap();
        assert_eq!(state.apply("1NCEMORE"), Err(CouponError::AlreadyApplied));
        assert_eq!(state.discount(), Price::from_rupees(20));

        let summary = CheckoutSummary::compute(&cart_worth(100_000), &state);
        assert_eq!(summary.coupon_discount, Price::from_rupees(20));
        assert_eq!(summary.final_total, Price::from_rupees(980));
    }

    #[test]
    fn test_coupon_remove_allows_reapply() {
        let mut state = CouponState::default();
        state.apply("1ncemore").unwrap();
        state.remove();
        assert!(!state.is_applied());
        assert_eq!(state.discount(), Price::ZERO);
        assert!(state.apply("1NCEMORE").is_ok());
    }

    #[test]
    fn test_final_total_never_negative() {
        let summary = CheckoutSummary::quote(&cart_worth(1500), Some("1NCEMORE")).unwrap();
        assert_eq!(summary.final_total, Price::ZERO);
        assert_eq!(summary.total_amount, Price::from_rupees(60));

        let empty = CheckoutSummary::quote(&Cart::new(), Some("1NCEMORE")).unwrap();
        assert_eq!(empty.final_total, Price::ZERO);
    }

    #[test]
    fn test_shipping_threshold() {
        assert_eq!(shipping_cost(Price::from_paise(50_000)), Price::from_rupees(60));
        assert_eq!(shipping_cost(Price::from_paise(50_001)), Price::ZERO);
        assert_eq!(shipping_cost(Price::ZERO), Price::from_rupees(60));
    }

    #[test]
    fn test_threshold_uses_post_discount_total() {
        // ₹510 − ₹20 = ₹490, which pays shipping
        let summary = CheckoutSummary::quote(&cart_worth(51_000), Some("1NCEMORE")).unwrap();
        assert_eq!(summary.final_total, Price::from_rupees(490));
        assert_eq!(summary.shipping_cost, Price::from_rupees(60));
        assert_eq!(summary.total_amount, Price::from_rupees(550));
    }

    #[test]
    fn test_quote_without_coupon() {
        let summary = CheckoutSummary::quote(&cart_worth(75_000), None).unwrap();
        assert_eq!(summary.coupon_code, None);
        assert_eq!(summary.shipping_cost, Price::ZERO);
        assert_eq!(summary.total_amount, Price::from_rupees(750));
        assert_eq!(summary.total_items, 1);
    }

    #[test]
    fn test_quote_rejects_unknown_code() {
        assert_eq!(
            CheckoutSummary::quote(&cart_worth(75_000), Some("FREESTUFF")),
            Err(CouponError::Invalid)
        );
    }
}
