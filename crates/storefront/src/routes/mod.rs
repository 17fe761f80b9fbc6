//! HTTP route handlers for the storefront API.
//!
//! # Route Structure
//!
//! ```text
//! # Auth (rate limited)
//! POST   /api/auth/register            - Register, emails a one-time code
//! POST   /api/auth/verify-otp          - Verify the code
//! POST   /api/auth/login               - Start a session
//! POST   /api/auth/logout              - End the session
//! GET    /api/auth/me                  - Current user
//! PATCH  /api/auth/me                  - Update own profile
//!
//! # Catalog
//! GET    /api/products                 - Product listing
//! POST   /api/products                 - Create product (admin)
//! GET    /api/products/:id             - Product detail
//! PUT    /api/products/:id             - Update product (admin)
//! DELETE /api/products/:id             - Delete product (admin)
//!
//! # Cart (requires auth)
//! GET    /api/cart                     - Stored cart
//! POST   /api/cart                     - Replace cart
//! PATCH  /api/cart                     - Add, update or remove one line
//! POST   /api/cart/merge               - Merge a guest cart
//! POST   /api/cart/quote               - Checkout totals
//!
//! # Orders (requires auth)
//! POST   /api/orders                   - Place order
//! GET    /api/orders                   - Own orders
//! GET    /api/orders/:id               - Order detail (owner or admin)
//!
//! # Admin (requires admin)
//! GET    /api/admin/users              - List users
//! POST   /api/admin/users              - Create user
//! PUT    /api/admin/users/:id          - Change role
//! DELETE /api/admin/users/:id          - Delete user
//! GET    /api/admin/orders             - Orders (?assignedTo= / ?unassigned=true)
//! PATCH  /api/admin/orders/:id/status  - Set status
//! POST   /api/admin/orders/:id/assign  - Assign to an admin
//! GET    /api/admin/notifications      - Latest orders
//! GET    /api/admin/notifications/stream - New orders (SSE)
//! ```

pub mod admin;
pub mod auth;
pub mod cart;
pub mod orders;
pub mod products;

use axum::{
    Router,
    routing::{get, post},
};

use crate::config::StorefrontConfig;
use crate::middleware::auth_rate_limiter;
use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes(trust_proxy_headers: bool) -> Router<AppState> {
    let limited = Router::new()
        .route("/register", post(auth::register))
        .route("/verify-otp", post(auth::verify_otp))
        .route("/login", post(auth::login))
        .layer(auth_rate_limiter(trust_proxy_headers));

    Router::new()
        .merge(limited)
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me).patch(auth::update_me))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index).post(products::create))
        .route(
            "/{id}",
            get(products::show)
                .put(products::update)
                .delete(products::delete),
        )
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).post(cart::replace).patch(cart::patch))
        .route("/merge", post(cart::merge))
        .route("/quote", post(cart::quote))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index).post(orders::create))
        .route("/{id}", get(orders::show))
}

/// Create all API routes.
pub fn routes(config: &StorefrontConfig) -> Router<AppState> {
    Router::new()
        .nest("/api/auth", auth_routes(config.trust_proxy_headers))
        .nest("/api/products", product_routes())
        .nest("/api/cart", cart_routes())
        .nest("/api/orders", order_routes())
        .nest("/api/admin", admin::routes())
}
