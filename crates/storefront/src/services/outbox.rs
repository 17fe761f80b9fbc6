//! Order outbox dispatcher.
//!
//! Applies the side effects committed alongside each order. Fresh events are
//! dispatched right after the order commits; anything that fails stays
//! pending and is retried by [`spawn_sweeper`] until it runs out of attempts.
//! An event is only applied by the holder of its lease.

use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use oncemore_core::order::stock_adjustments;
use oncemore_core::OrderId;

use crate::db::outbox::{OutboxEvent, OutboxKind};
use crate::db::products::StockOutcome;
use crate::db::{OrderRepository, OutboxRepository, RepositoryError, UserRepository};
use crate::models::{Order, OrderNotification};
use crate::services::email::EmailError;
use crate::state::AppState;

/// Events fetched per sweep.
const SWEEP_BATCH: i64 = 100;

/// Why applying an outbox event failed.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Email(#[from] EmailError),

    #[error("order {0} no longer exists")]
    OrderMissing(OrderId),
}

/// Apply freshly committed events for `order`, recording each outcome.
pub async fn dispatch(state: &AppState, order: &Order, events: &[OutboxEvent]) {
    for event in events {
        run_and_record(state, event, Some(order)).await;
    }
}

/// Claim and retry pending events once. Returns how many were attempted.
///
/// Events still leased to a post-commit dispatch are left alone.
///
/// # Errors
///
/// Returns `RepositoryError` if the pending events cannot be loaded.
#[instrument(skip(state))]
pub async fn sweep(state: &AppState) -> Result<usize, RepositoryError> {
    let max_attempts = state.config().orders.outbox_max_attempts;
    let events = OutboxRepository::new(state.accounts())
        .claim_pending(max_attempts, SWEEP_BATCH)
        .await?;

    if !events.is_empty() {
        info!(count = events.len(), "Retrying pending outbox events");
    }
    for event in &events {
        run_and_record(state, event, None).await;
    }
    Ok(events.len())
}

/// Spawn the periodic sweep.
pub fn spawn_sweeper(state: AppState) -> JoinHandle<()> {
    let period = state.config().orders.outbox_sweep_interval;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period.max(Duration::from_secs(1)));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            if let Err(e) = sweep(&state).await {
                warn!(error = %e, "Outbox sweep failed");
            }
        }
    })
}

async fn run_and_record(state: &AppState, event: &OutboxEvent, order: Option<&Order>) {
    if !event.lease_held_at(Utc::now()) {
        debug!(event_id = %event.id, kind = ?event.kind, "Outbox lease expired; leaving event to the sweep");
        return;
    }

    let outbox = OutboxRepository::new(state.accounts());

    let recorded = match apply(state, event, order).await {
        Ok(()) => {
            debug!(event_id = %event.id, kind = ?event.kind, "Outbox event applied");
            outbox.mark_processed(event.id).await
        }
        Err(e) => {
            warn!(
                event_id = %event.id,
                order_id = %event.order_id,
                kind = ?event.kind,
                attempt = event.attempts + 1,
                error = %e,
                "Outbox event failed"
            );
            outbox.mark_failed(event.id, &e.to_string()).await
        }
    };

    if let Err(e) = recorded {
        warn!(event_id = %event.id, error = %e, "Failed to record outbox event outcome");
    }
}

async fn apply(
    state: &AppState,
    event: &OutboxEvent,
    order: Option<&Order>,
) -> Result<(), DispatchError> {
    let loaded;
    let order = match order {
        Some(order) => order,
        None => {
            loaded = OrderRepository::new(state.accounts())
                .get(event.order_id)
                .await?
                .ok_or(DispatchError::OrderMissing(event.order_id))?;
            &loaded
        }
    };

    match event.kind {
        OutboxKind::DecrementStock => decrement_stock(state, order).await,
        OutboxKind::NotifyAdminsEmail => email_admins(state, order).await,
        OutboxKind::BroadcastNewOrder => {
            let receivers = state.notify_admins(OrderNotification::from(order));
            debug!(order_id = %order.id, receivers, "Broadcast new order");
            Ok(())
        }
    }
}

async fn decrement_stock(state: &AppState, order: &Order) -> Result<(), DispatchError> {
    for adjustment in stock_adjustments(&order.items) {
        match state
            .catalog()
            .apply_stock_adjustment(order.id, &adjustment)
            .await?
        {
            StockOutcome::Applied { stock_after } => {
                debug!(
                    order_id = %order.id,
                    product_id = %adjustment.product_id,
                    stock_after,
                    "Stock decremented"
                );
            }
            StockOutcome::AlreadyApplied => {
                debug!(order_id = %order.id, line = adjustment.line, "Stock line already applied");
            }
            StockOutcome::ProductMissing => {
                warn!(
                    order_id = %order.id,
                    product_id = %adjustment.product_id,
                    "Ordered product no longer in catalog; skipping stock decrement"
                );
            }
        }
    }
    Ok(())
}

async fn email_admins(state: &AppState, order: &Order) -> Result<(), DispatchError> {
    let Some(email) = state.email() else {
        info!(order_id = %order.id, "SMTP not configured; skipping admin order email");
        return Ok(());
    };

    let admins = UserRepository::new(state.accounts()).admin_emails().await?;
    if admins.is_empty() {
        warn!(order_id = %order.id, "No admin accounts to notify");
        return Ok(());
    }

    let mut delivered = 0_usize;
    let mut last_error = None;
    for admin in &admins {
        match email.send_new_order(admin.as_str(), order).await {
            Ok(()) => delivered += 1,
            Err(e) => {
                warn!(order_id = %order.id, admin = %admin, error = %e, "Admin order email failed");
                last_error = Some(e);
            }
        }
    }

    Ok(retry_only_if_none_delivered(delivered, last_error)?)
}

/// A retry resends to every admin, so a partial delivery counts as done.
fn retry_only_if_none_delivered<E>(delivered: usize, last_error: Option<E>) -> Result<(), E> {
    match last_error {
        Some(e) if delivered == 0 => Err(e),
        _ => Ok(()),
    }
}
