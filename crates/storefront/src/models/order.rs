//! Order domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use oncemore_core::{
    Email, OrderId, OrderItem, OrderStatus, PaymentMethod, Price, ShippingAddress, UserId,
};

/// A placed order.
///
/// Items, prices and the address are fixed at creation; only `status` and
/// the `assigned_*` fields change afterwards.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub user_email: Email,
    pub items: Vec<OrderItem>,
    pub total_price: Price,
    pub coupon_code: Option<String>,
    pub coupon_discount: Price,
    pub shipping_cost: Price,
    pub total_amount: Price,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub upi_id: Option<String>,
    pub status: OrderStatus,
    pub assigned_to: Option<UserId>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub assigned_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

/// New-order event pushed to admins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderNotification {
    pub order_id: OrderId,
    pub user_email: Email,
    pub total_amount: Price,
    pub created_at: DateTime<Utc>,
}

impl From<&Order> for OrderNotification {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.id,
            user_email: order.user_email.clone(),
            total_amount: order.total_amount,
            created_at: order.created_at,
        }
    }
}
