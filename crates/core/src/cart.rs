//! Shopping cart model.
//!
//! A cart is a list of lines keyed by product. Adding a product that is
//! already present sums the quantities; setting a quantity to zero (or below)
//! removes the line. No line ever holds a zero quantity, so `total_items` is
//! always the plain sum of line quantities.

use serde::{Deserialize, Serialize};

use crate::types::{Price, ProductId};

/// Errors from cart mutations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CartError {
    /// A line was added with quantity zero.
    #[error("quantity must be at least 1")]
    ZeroQuantity,
    /// The product is not in the cart.
    #[error("product {0} is not in the cart")]
    NotInCart(ProductId),
}

/// One cart line: a product snapshot and how many the shopper wants.
///
/// `productId` is also accepted as `id`, which is what client-side carts
/// stored before the server kept them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    #[serde(alias = "id")]
    pub product_id: ProductId,
    pub name: String,
    /// Unit price at the time the product was added.
    pub price: Price,
    pub image: String,
    pub quantity: u32,
}

impl CartItem {
    /// `price × quantity` for this line.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.price.times(self.quantity)
    }
}

/// A quantity-merged list of cart lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<CartItem>", into = "Vec<CartItem>")]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Build a cart from arbitrary lines, merging duplicates and dropping
    /// zero-quantity lines.
    #[must_use]
    pub fn from_items(items: impl IntoIterator<Item = CartItem>) -> Self {
        let mut cart = Self::new();
        cart.merge(items);
        cart
    }

    /// The cart lines in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Quantity of `product_id` in the cart, zero when absent.
    #[must_use]
    pub fn quantity_of(&self, product_id: ProductId) -> u32 {
        self.items
            .iter()
            .find(|item| item.product_id == product_id)
            .map_or(0, |item| item.quantity)
    }

    /// Add a line, summing quantities if the product is already in the cart.
    ///
    /// The existing line keeps its price snapshot.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ZeroQuantity` if `item.quantity` is zero.
    pub fn add(&mut self, item: CartItem) -> Result<(), CartError> {
        if item.quantity == 0 {
            return Err(CartError::ZeroQuantity);
        }

        match self
            .items
            .iter_mut()
            .find(|line| line.product_id == item.product_id)
        {
            Some(line) => line.quantity = line.quantity.saturating_add(item.quantity),
            None => self.items.push(item),
        }
        Ok(())
    }

    /// Set the quantity of a line. Negative quantities clamp to zero and a
    /// zero quantity removes the line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::NotInCart` if the product has no line.
    pub fn update_quantity(&mut self, product_id: ProductId, quantity: i64) -> Result<(), CartError> {
        let position = self
            .items
            .iter()
            .position(|line| line.product_id == product_id)
            .ok_or(CartError::NotInCart(product_id))?;

        let clamped = u32::try_from(quantity.max(0)).unwrap_or(u32::MAX);
        if clamped == 0 {
            self.items.remove(position);
        } else if let Some(line) = self.items.get_mut(position) {
            line.quantity = clamped;
        }
        Ok(())
    }

    /// Remove a product's line, returning it if it was present.
    pub fn remove(&mut self, product_id: ProductId) -> Option<CartItem> {
        let position = self
            .items
            .iter()
            .position(|line| line.product_id == product_id)?;
        Some(self.items.remove(position))
    }

    /// Remove every line.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Merge other lines into this cart (e.g. a guest cart on login).
    /// Zero-quantity lines are skipped.
    pub fn merge(&mut self, other: impl IntoIterator<Item = CartItem>) {
        for item in other {
            // Only ZeroQuantity can fail, and those lines are meant to be dropped.
            let _ = self.add(item);
        }
    }

    /// Sum of line quantities.
    #[must_use]
    pub fn total_items(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    /// Sum of `price × quantity` over all lines.
    #[must_use]
    pub fn total_price(&self) -> Price {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// Consume the cart, returning its lines.
    #[must_use]
    pub fn into_items(self) -> Vec<CartItem> {
        self.items
    }
}

impl From<Vec<CartItem>> for Cart {
    fn from(items: Vec<CartItem>) -> Self {
        Self::from_items(items)
    }
}

impl From<Cart> for Vec<CartItem> {
    fn from(cart: Cart) -> Self {
        cart.items
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn item(id: i32, rupees: i64, quantity: u32) -> CartItem {
        CartItem {
            product_id: ProductId::new(id),
            name: format!("Item {id}"),
            price: Price::from_rupees(rupees),
            image: format!("https://cdn.example.com/{id}.jpg"),
            quantity,
        }
    }

    fn assert_invariants(cart: &Cart) {
        let sum: u64 = cart.items().iter().map(|i| u64::from(i.quantity)).sum();
        assert_eq!(cart.total_items(), sum);
        assert!(cart.items().iter().all(|i| i.quantity > 0));
    }

    #[test]
    fn test_add_merges_by_product() {
        let mut cart = Cart::new();
        cart.add(item(1, 300, 1)).unwrap();
        cart.add(item(2, 150, 2)).unwrap();
        cart.add(item(1, 999, 2)).unwrap();

        assert_eq!(cart.items().len(), 2);
        assert_eq!(cart.quantity_of(ProductId::new(1)), 3);
        // first snapshot wins
        assert_eq!(cart.items()[0].price, Price::from_rupees(300));
        assert_eq!(cart.total_items(), 5);
        assert_eq!(cart.total_price(), Price::from_rupees(1200));
    }

    #[test]
    fn test_add_rejects_zero_quantity() {
        let mut cart = Cart::new();
        assert_eq!(cart.add(item(1, 10, 0)), Err(CartError::ZeroQuantity));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_update_quantity_clamps_and_removes() {
        let mut cart = Cart::from_items([item(1, 100, 2), item(2, 50, 1)]);

        cart.update_quantity(ProductId::new(1), 5).unwrap();
        assert_eq!(cart.quantity_of(ProductId::new(1)), 5);

        cart.update_quantity(ProductId::new(2), -3).unwrap();
        assert_eq!(cart.quantity_of(ProductId::new(2)), 0);
        assert_eq!(cart.items().len(), 1);

        cart.update_quantity(ProductId::new(1), 0).unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_update_quantity_unknown_product() {
        let mut cart = Cart::new();
        assert_eq!(
            cart.update_quantity(ProductId::new(9), 1),
            Err(CartError::NotInCart(ProductId::new(9)))
        );
    }

    #[test]
    fn test_remove_and_clear() {
        let mut cart = Cart::from_items([item(1, 100, 1), item(2, 100, 1)]);
        assert_eq!(cart.remove(ProductId::new(1)).unwrap().product_id, ProductId::new(1));
        assert!(cart.remove(ProductId::new(1)).is_none());
        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.total_price(), Price::ZERO);
    }

    #[test]
    fn test_from_items_normalizes() {
        let cart = Cart::from_items([item(1, 10, 1), item(1, 10, 2), item(3, 10, 0)]);
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.quantity_of(ProductId::new(1)), 3);
    }

    #[test]
    fn test_invariants_hold_over_mixed_sequence() {
        let mut cart = Cart::new();
        // Deterministic pseudo-random walk over add/update/remove
        let mut seed: u32 = 7;
        for step in 0..500 {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let product = i32::try_from(seed % 5).unwrap();
            match step % 3 {
                0 => {
                    let _ = cart.add(item(product, 100, seed % 4));
                }
                1 => {
                    let quantity = i64::from(seed % 7) - 2;
                    let _ = cart.update_quantity(ProductId::new(product), quantity);
                }
                _ => {
                    if seed % 2 == 0 {
                        cart.remove(ProductId::new(product));
                    }
                }
            }
            assert_invariants(&cart);
        }
    }

    #[test]
    fn test_deserialize_accepts_legacy_id_field() {
        let json = r#"[{"id": 4, "name": "Denim", "price": 799, "image": "x.jpg", "quantity": 1},
                       {"productId": 4, "name": "Denim", "price": 799, "image": "x.jpg", "quantity": 2}]"#;
        let cart: Cart = serde_json::from_str(json).unwrap();
        assert_eq!(cart.quantity_of(ProductId::new(4)), 3);
    }
}
