//! Checkout and order management.

use tracing::{info, instrument, warn};

use oncemore_core::{NewOrder, OrderId, OrderStatus, PaymentMethod, ShippingAddress, UserId};

use crate::db::orders::{CreatedOrder, OrderRepository};
use crate::db::{CartRepository, UserRepository};
use crate::error::{AppError, Result, not_found};
use crate::models::{CurrentUser, Order};
use crate::services::outbox;
use crate::state::AppState;

/// What the buyer submits at checkout.
#[derive(Debug, Clone)]
pub struct Checkout {
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub upi_id: Option<String>,
    pub coupon_code: Option<String>,
}

/// Turn the buyer's stored cart into an order.
///
/// The order is returned as soon as its transaction commits; stock, admin
/// email and dashboard broadcast run afterwards on a background task.
///
/// # Errors
///
/// Returns `AppError::Order` if the cart is empty, the address is invalid,
/// the coupon is unknown or a UPI payment has no UPI id.
#[instrument(skip(state, user, checkout), fields(user_id = %user.id))]
pub async fn place_order(state: &AppState, user: &CurrentUser, checkout: Checkout) -> Result<Order> {
    let cart = CartRepository::new(state.accounts()).get(user.id).await?;

    let new_order = NewOrder::from_cart(
        user.id,
        user.email.clone(),
        &cart,
        checkout.coupon_code.as_deref(),
        checkout.shipping_address,
        checkout.payment_method,
        checkout.upi_id,
    )?;

    let CreatedOrder { order, events } = OrderRepository::new(state.accounts())
        .create(&new_order)
        .await?;

    info!(
        order_id = %order.id,
        total_amount = %order.total_amount,
        items = order.items.len(),
        "Order placed"
    );

    let background = state.clone();
    let dispatched = order.clone();
    tokio::spawn(async move {
        outbox::dispatch(&background, &dispatched, &events).await;
    });

    Ok(order)
}

/// Set an order's status under the configured policy.
///
/// # Errors
///
/// Returns `AppError::InvalidValue` for an unknown status, `NotFound` for an
/// unknown order and `Conflict` when the strict policy refuses the move.
#[instrument(skip(state))]
pub async fn update_status(
    state: &AppState,
    actor: UserId,
    order_id: OrderId,
    status: &str,
) -> Result<Order> {
    let next: OrderStatus = status.parse()?;
    let policy = state.config().orders.status_policy;

    let change = OrderRepository::new(state.accounts())
        .update_status(order_id, next, policy)
        .await
        .map_err(not_found("Order not found."))?;

    if change.previous.can_transition_to(next) {
        info!(%order_id, %actor, from = %change.previous, to = %next, "Order status updated");
    } else {
        warn!(
            %order_id,
            %actor,
            from = %change.previous,
            to = %next,
            "Order status moved outside the forward lifecycle"
        );
    }

    Ok(change.order)
}

/// Assign an order to an admin.
///
/// # Errors
///
/// Returns `AppError::BadRequest` if the assignee is not an admin and
/// `NotFound` for an unknown order.
#[instrument(skip(state))]
pub async fn assign(
    state: &AppState,
    order_id: OrderId,
    admin_id: UserId,
    assigned_by: UserId,
) -> Result<Order> {
    let role = UserRepository::new(state.accounts())
        .get_role(admin_id)
        .await?;
    if !role.is_some_and(|role| role.is_admin()) {
        return Err(AppError::BadRequest(
            "Orders can only be assigned to admins.".to_string(),
        ));
    }

    let order = OrderRepository::new(state.accounts())
        .assign(order_id, admin_id, assigned_by)
        .await
        .map_err(not_found("Order not found."))?;

    info!(%order_id, %admin_id, "Order assigned");
    Ok(order)
}
