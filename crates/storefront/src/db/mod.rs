//! Database operations for the two storefront `PostgreSQL` databases.
//!
//! # Database: accounts
//!
//! - `accounts.user` - Shopper and staff accounts
//! - `accounts.cart_item` - Server-side cart lines keyed by (user, product)
//! - `accounts.order` - Immutable order snapshots plus status/assignment
//! - `accounts.order_outbox` - Side effects committed with each order
//! - `tower_sessions.session` - Tower-sessions storage
//!
//! # Database: catalog
//!
//! - `catalog.product` - Product records
//! - `catalog.stock_ledger` - Applied stock decrements, one row per order line
//!
//! The two databases share no transaction boundary; the order outbox is what
//! carries stock changes from one to the other.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/{accounts,catalog}`
//! and run via:
//! ```bash
//! cargo run -p oncemore-cli -- migrate all
//! ```

pub mod carts;
pub mod orders;
pub mod outbox;
pub mod products;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

pub use carts::CartRepository;
pub use orders::OrderRepository;
pub use outbox::OutboxRepository;
pub use products::ProductRepository;
pub use users::UserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map a unique-constraint violation to `Conflict`, anything else to `Database`.
    pub(crate) fn conflict_on_unique(e: sqlx::Error, message: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_unique_violation()
        {
            return Self::Conflict(message.to_owned());
        }
        Self::Database(e)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    pool_options().connect(database_url.expose_secret()).await
}

/// Create a pool that connects on first use.
///
/// # Errors
///
/// Returns `sqlx::Error` if the URL cannot be parsed.
pub fn create_lazy_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    pool_options()
        .min_connections(0)
        .connect_lazy(database_url.expose_secret())
}

fn pool_options() -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
}
