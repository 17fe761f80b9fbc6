//! Database migration commands.
//!
//! # Environment Variables
//!
//! - `ACCOUNTS_DATABASE_URL` - accounts database (users, carts, orders, sessions)
//! - `CATALOG_DATABASE_URL` - catalog database (products, stock ledger)
//!
//! Both fall back to `DATABASE_URL`.
//!
//! # Migration Files
//!
//! Accounts migrations: `crates/storefront/migrations/accounts/`
//! Catalog migrations: `crates/storefront/migrations/catalog/`
//!
//! The two sets use disjoint version ranges and each migrator ignores the
//! other's applied versions, so both can share one `_sqlx_migrations` table
//! when the URLs point at the same database.

use sqlx::migrate::Migrator;

use super::{ConnectError, accounts_pool, catalog_pool};

fn accounts_migrator() -> Migrator {
    let mut migrator = sqlx::migrate!("../storefront/migrations/accounts");
    migrator.set_ignore_missing(true);
    migrator
}

fn catalog_migrator() -> Migrator {
    let mut migrator = sqlx::migrate!("../storefront/migrations/catalog");
    migrator.set_ignore_missing(true);
    migrator
}

/// Errors that can occur while migrating.
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run accounts database migrations.
///
/// # Errors
///
/// Returns `MigrationError` if the database is unreachable or a migration fails.
pub async fn accounts() -> Result<(), MigrationError> {
    let pool = accounts_pool().await?;

    tracing::info!("Running accounts migrations...");
    accounts_migrator().run(&pool).await?;

    tracing::info!("Accounts migrations complete!");
    Ok(())
}

/// Run catalog database migrations.
///
/// # Errors
///
/// Returns `MigrationError` if the database is unreachable or a migration fails.
pub async fn catalog() -> Result<(), MigrationError> {
    let pool = catalog_pool().await?;

    tracing::info!("Running catalog migrations...");
    catalog_migrator().run(&pool).await?;

    tracing::info!("Catalog migrations complete!");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_migrators_can_share_a_database() {
        let accounts = accounts_migrator();
        let catalog = catalog_migrator();

        let accounts_versions: HashSet<i64> = accounts.iter().map(|m| m.version).collect();
        let catalog_versions: HashSet<i64> = catalog.iter().map(|m| m.version).collect();

        assert!(!accounts_versions.is_empty());
        assert!(!catalog_versions.is_empty());
        assert!(accounts_versions.is_disjoint(&catalog_versions));
        assert!(accounts.ignore_missing);
        assert!(catalog.ignore_missing);
    }
}
