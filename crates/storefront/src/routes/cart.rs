//! Cart route handlers.
//!
//! The cart is stored per `(user, product)` line. Clients send product ids
//! and quantities only; the name, price and image on each line are copied
//! from the catalog when the line is written.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use oncemore_core::{Cart, CartItem, CheckoutSummary, Price, ProductId};

use crate::db::CartRepository;
use crate::error::{AppError, Result, not_found};
use crate::extract::ApiJson;
use crate::middleware::RequireAuth;
use crate::state::AppState;

// =============================================================================
// Request / Response Types
// =============================================================================

/// A cart line as sent by the client. Any snapshot fields it carries are
/// ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineRequest {
    #[serde(alias = "id")]
    pub product_id: Option<ProductId>,
    pub quantity: Option<i64>,
}

/// `PATCH /api/cart` action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CartAction {
    Add,
    Update,
    Remove,
}

/// `PATCH /api/cart` payload.
#[derive(Debug, Deserialize)]
pub struct PatchCartRequest {
    pub item: Option<CartLineRequest>,
    pub action: CartAction,
}

/// Payload for replacing or merging the cart.
#[derive(Debug, Deserialize)]
pub struct CartLinesRequest {
    #[serde(default)]
    pub cart: Vec<CartLineRequest>,
}

/// `POST /api/cart/quote` payload.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    pub coupon_code: Option<String>,
}

/// The stored cart with its running totals.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartResponse {
    pub cart: Cart,
    pub total_items: u64,
    pub total_price: Price,
}

impl From<Cart> for CartResponse {
    fn from(cart: Cart) -> Self {
        Self {
            total_items: cart.total_items(),
            total_price: cart.total_price(),
            cart,
        }
    }
}

/// Clamp a client quantity into the stored range; negatives become zero.
fn clamp_quantity(quantity: i64) -> u32 {
    u32::try_from(quantity.max(0)).unwrap_or(u32::MAX)
}

fn invalid_item() -> AppError {
    AppError::BadRequest("Invalid item.".to_string())
}

/// Build a cart line from the catalog's current copy of the product.
///
/// Returns `None` for products that no longer exist or are hidden.
async fn snapshot(
    state: &AppState,
    product_id: ProductId,
    quantity: u32,
) -> Result<Option<CartItem>> {
    let product = state.catalog().get(product_id).await?;
    Ok(product.filter(|p| p.is_active).map(|p| CartItem {
        product_id: p.id,
        image: p.primary_image().to_owned(),
        name: p.name,
        price: p.price,
        quantity,
    }))
}

/// Snapshot every usable line, merging duplicates. Unknown products and
/// zero quantities are dropped.
async fn snapshot_lines(state: &AppState, lines: Vec<CartLineRequest>) -> Result<Cart> {
    let mut cart = Cart::new();
    for line in lines {
        let Some(product_id) = line.product_id else {
            continue;
        };
        let quantity = clamp_quantity(line.quantity.unwrap_or(1));
        if quantity == 0 {
            continue;
        }
        match snapshot(state, product_id, quantity).await? {
            Some(item) => cart.merge([item]),
            None => debug!(%product_id, "Dropping unavailable product from cart"),
        }
    }
    Ok(cart)
}

async fn stored_cart(state: &AppState, user_id: oncemore_core::UserId) -> Result<Json<CartResponse>> {
    let cart = CartRepository::new(state.accounts()).get(user_id).await?;
    Ok(Json(cart.into()))
}

// =============================================================================
// Handlers
// =============================================================================

/// `GET /api/cart`
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<CartResponse>> {
    stored_cart(&state, user.id).await
}

/// `POST /api/cart`: replace the whole cart.
#[instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn replace(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(body): ApiJson<CartLinesRequest>,
) -> Result<Json<CartResponse>> {
    let cart = snapshot_lines(&state, body.cart).await?;
    CartRepository::new(state.accounts())
        .replace(user.id, &cart)
        .await?;
    Ok(Json(cart.into()))
}

/// `PATCH /api/cart`: add, update or remove one line.
#[instrument(skip(state, user, body), fields(user_id = %user.id, action = ?body.action))]
pub async fn patch(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(body): ApiJson<PatchCartRequest>,
) -> Result<Json<CartResponse>> {
    let item = body.item.ok_or_else(invalid_item)?;
    let product_id = item.product_id.ok_or_else(invalid_item)?;
    let carts = CartRepository::new(state.accounts());

    match body.action {
        CartAction::Add => {
            let quantity = clamp_quantity(item.quantity.unwrap_or(1));
            if quantity == 0 {
                return Err(oncemore_core::CartError::ZeroQuantity.into());
            }
            let line = snapshot(&state, product_id, quantity)
                .await?
                .ok_or_else(|| AppError::NotFound("Product not found.".to_string()))?;
            carts.add(user.id, &line).await?;
        }
        CartAction::Update => {
            let quantity = item.quantity.ok_or_else(invalid_item)?;
            carts
                .set_quantity(user.id, product_id, clamp_quantity(quantity))
                .await
                .map_err(not_found("Item is not in the cart."))?;
        }
        CartAction::Remove => carts.remove(user.id, product_id).await?,
    }

    stored_cart(&state, user.id).await
}

/// `POST /api/cart/merge`: fold a guest cart into the stored one.
#[instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn merge(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(body): ApiJson<CartLinesRequest>,
) -> Result<Json<CartResponse>> {
    let incoming = snapshot_lines(&state, body.cart).await?;
    CartRepository::new(state.accounts())
        .merge(user.id, incoming.items())
        .await?;
    stored_cart(&state, user.id).await
}

/// `POST /api/cart/quote`: price the stored cart.
#[instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn quote(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(body): ApiJson<QuoteRequest>,
) -> Result<Json<CheckoutSummary>> {
    let cart = CartRepository::new(state.accounts()).get(user.id).await?;
    let summary = CheckoutSummary::quote(&cart, body.coupon_code.as_deref())?;
    Ok(Json(summary))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_quantity() {
        assert_eq!(clamp_quantity(-3), 0);
        assert_eq!(clamp_quantity(0), 0);
        assert_eq!(clamp_quantity(4), 4);
        assert_eq!(clamp_quantity(i64::MAX), u32::MAX);
    }

    #[test]
    fn test_line_accepts_id_alias_and_ignores_snapshot_fields() {
        let line: CartLineRequest = serde_json::from_str(
            r#"{"id": 12, "name": "Denim Jacket", "price": 999, "quantity": 2}"#,
        )
        .unwrap();
        assert_eq!(line.product_id, Some(ProductId::new(12)));
        assert_eq!(line.quantity, Some(2));
    }

    #[test]
    fn test_patch_actions_parse_lowercase() {
        let body: PatchCartRequest =
            serde_json::from_str(r#"{"item": {"productId": 3}, "action": "remove"}"#).unwrap();
        assert_eq!(body.action, CartAction::Remove);
        assert!(serde_json::from_str::<PatchCartRequest>(r#"{"action": "explode"}"#).is_err());
    }

    #[test]
    fn test_cart_response_totals() {
        let cart = Cart::from_items([CartItem {
            product_id: ProductId::new(1),
            name: "Shirt".to_string(),
            price: Price::from_rupees(250),
            image: String::new(),
            quantity: 2,
        }]);
        let response = CartResponse::from(cart);
        assert_eq!(response.total_items, 2);
        assert_eq!(response.total_price, Price::from_rupees(500));

        let json = serde_json::to_value(&response).unwrap();
        assert!(json["cart"].is_array());
        assert_eq!(json["totalItems"], 2);
    }
}
