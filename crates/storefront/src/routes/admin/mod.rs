//! `/api/admin` route handlers.
//!
//! The whole tree sits behind [`require_admin_session`], and every handler
//! also takes [`RequireAdmin`](crate::middleware::RequireAdmin).

pub mod notifications;
pub mod orders;
pub mod users;

use axum::{
    Router,
    middleware::from_fn,
    routing::{get, patch, post, put},
};

use crate::middleware::require_admin_session;
use crate::state::AppState;

/// Create the admin routes router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(users::index).post(users::create))
        .route("/users/{id}", put(users::update_role).delete(users::delete))
        .route("/orders", get(orders::index))
        .route("/orders/{id}/status", patch(orders::update_status))
        .route("/orders/{id}/assign", post(orders::assign))
        .route("/notifications", get(notifications::index))
        .route("/notifications/stream", get(notifications::stream))
        .route_layer(from_fn(require_admin_session))
}
