//! New-order notifications for the back office.

use std::convert::Infallible;

use axum::{
    Json,
    extract::State,
    response::{
        IntoResponse, Sse,
        sse::{Event, KeepAlive},
    },
};
use futures::Stream;
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;
use tracing::{instrument, warn};

use crate::db::OrderRepository;
use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::state::AppState;

/// How many recent orders the notification list shows.
const RECENT_LIMIT: i64 = 20;

/// SSE event name for a placed order.
const NEW_ORDER_EVENT: &str = "new-order";

/// `GET /api/admin/notifications`: the latest orders, newest first.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> Result<impl IntoResponse> {
    let notifications = OrderRepository::new(state.accounts())
        .recent_notifications(RECENT_LIMIT)
        .await?;
    Ok(Json(json!({ "notifications": notifications })))
}

/// `GET /api/admin/notifications/stream`
///
/// Pushes one `new-order` event per placed order for as long as the client
/// stays connected. Events missed while the client lagged are dropped; the
/// client can refetch the list.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn stream(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let mut receiver = state.subscribe();
    let admin_id = admin.id;

    let events = async_stream::stream! {
        loop {
            match receiver.recv().await {
                Ok(notification) => {
                    match Event::default().event(NEW_ORDER_EVENT).json_data(&notification) {
                        Ok(event) => yield Ok::<_, Infallible>(event),
                        Err(e) => warn!(%admin_id, error = %e, "Failed to encode order notification"),
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(%admin_id, skipped, "Notification stream lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    };

    Sse::new(events).keep_alive(KeepAlive::default())
}
