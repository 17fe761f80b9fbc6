//! Checkout and order history route handlers.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use oncemore_core::{OrderId, PaymentMethod, ShippingAddress};

use crate::db::{OrderRepository, UserRepository};
use crate::error::{AppError, Result};
use crate::extract::{ApiJson, ApiPath};
use crate::middleware::RequireAuth;
use crate::services::orders::{self, Checkout};
use crate::state::AppState;

/// `POST /api/orders` payload.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub upi_id: Option<String>,
    pub coupon_code: Option<String>,
}

impl From<CreateOrderRequest> for Checkout {
    fn from(request: CreateOrderRequest) -> Self {
        Self {
            shipping_address: request.shipping_address,
            payment_method: request.payment_method,
            upi_id: request.upi_id.map(|id| id.trim().to_owned()).filter(|id| !id.is_empty()),
            coupon_code: request.coupon_code,
        }
    }
}

/// `POST /api/orders`: place an order from the stored cart.
#[instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(body): ApiJson<CreateOrderRequest>,
) -> Result<impl IntoResponse> {
    let order = orders::place_order(&state, &user, body.into()).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Order placed successfully.", "order": order })),
    ))
}

/// `GET /api/orders`: the caller's orders, newest first.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse> {
    let orders = OrderRepository::new(state.accounts())
        .list_for_user(user.id)
        .await?;
    Ok(Json(json!({ "orders": orders })))
}

/// `GET /api/orders/{id}`
///
/// Visible to the buyer and to admins. Anyone else gets the same 404 as for
/// a missing order.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<OrderId>,
) -> Result<impl IntoResponse> {
    let not_found = || AppError::NotFound("Order not found.".to_string());

    let order = OrderRepository::new(state.accounts())
        .get(id)
        .await?
        .ok_or_else(not_found)?;

    if order.user_id != user.id {
        let role = UserRepository::new(state.accounts())
            .get_role(user.id)
            .await?;
        if !role.is_some_and(|r| r.is_admin()) {
            return Err(not_found());
        }
    }

    Ok(Json(json!({ "order": order })))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_create_order_request_parses() {
        let body: CreateOrderRequest = serde_json::from_str(
            r#"{
                "shippingAddress": {
                    "fullName": "Asha Rao",
                    "mobileNumber": "9876543210",
                    "street": "12 MG Road",
                    "city": "Pune",
                    "state": "Maharashtra",
                    "zip": "411001"
                },
                "paymentMethod": "upi",
                "upiId": "  asha@upi ",
                "couponCode": "1nceMore"
            }"#,
        )
        .unwrap();

        let checkout = Checkout::from(body);
        assert_eq!(checkout.payment_method, PaymentMethod::Upi);
        assert_eq!(checkout.upi_id.as_deref(), Some("asha@upi"));
        assert_eq!(checkout.shipping_address.country, "India");
    }

    #[test]
    fn test_blank_upi_id_is_dropped() {
        let body: CreateOrderRequest = serde_json::from_str(
            r#"{
                "shippingAddress": {
                    "fullName": "Asha Rao",
                    "mobileNumber": "9876543210",
                    "street": "12 MG Road",
                    "city": "Pune",
                    "state": "Maharashtra",
                    "zip": "411001"
                },
                "paymentMethod": "cod",
                "upiId": " "
            }"#,
        )
        .unwrap();
        assert_eq!(Checkout::from(body).upi_id, None);
    }
}
