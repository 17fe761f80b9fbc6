//! Subcommand implementations.

pub mod admin;
pub mod migrate;
pub mod seed;

use secrecy::SecretString;
use sqlx::PgPool;

/// Read a database URL, falling back to `DATABASE_URL` like the server does.
fn database_url(key: &'static str) -> Result<SecretString, MissingEnvVar> {
    dotenvy::dotenv().ok();

    std::env::var(key)
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| MissingEnvVar(key))
}

/// Required environment variable is missing.
#[derive(Debug, thiserror::Error)]
#[error("Missing environment variable: {0} (or DATABASE_URL)")]
pub struct MissingEnvVar(pub &'static str);

/// Connect to the accounts database.
async fn accounts_pool() -> Result<PgPool, ConnectError> {
    let url = database_url("ACCOUNTS_DATABASE_URL")?;
    tracing::info!("Connecting to accounts database...");
    Ok(oncemore_storefront::db::create_pool(&url).await?)
}

/// Connect to the catalog database.
async fn catalog_pool() -> Result<PgPool, ConnectError> {
    let url = database_url("CATALOG_DATABASE_URL")?;
    tracing::info!("Connecting to catalog database...");
    Ok(oncemore_storefront::db::create_pool(&url).await?)
}

/// Errors opening a database connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error(transparent)]
    MissingEnvVar(#[from] MissingEnvVar),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),
}
