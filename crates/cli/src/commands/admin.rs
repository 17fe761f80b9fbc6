//! Admin user management commands.
//!
//! # Usage
//!
//! ```bash
//! oncemore-cli admin create -e admin@example.com -n "Admin Name" -p 'a-strong-password'
//! ```
//!
//! # Environment Variables
//!
//! - `ACCOUNTS_DATABASE_URL` - `PostgreSQL` connection string for the accounts database

use oncemore_core::{UserId, UserRole};
use oncemore_storefront::services::auth::{AccountSpec, AuthError, AuthService};
use thiserror::Error;

use super::{ConnectError, accounts_pool};

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// User already exists.
    #[error("A user already exists with email: {0}")]
    UserExists(String),

    #[error(transparent)]
    Auth(AuthError),
}

/// Create a verified admin account that can log in straight away.
///
/// # Returns
///
/// The ID of the created user.
///
/// # Errors
///
/// Returns `AdminError` if the email is taken, the email or password is
/// invalid, or the database is unreachable.
pub async fn create_user(email: &str, name: &str, password: &str) -> Result<UserId, AdminError> {
    let pool = accounts_pool().await?;

    tracing::info!("Creating admin user: {}", email);

    let user = AuthService::new(&pool)
        .create_verified(&AccountSpec {
            email,
            password,
            full_name: name,
            phone: None,
            address: None,
            role: UserRole::Admin,
        })
        .await
        .map_err(|e| match e {
            AuthError::UserAlreadyExists => AdminError::UserExists(email.to_owned()),
            other => AdminError::Auth(other),
        })?;

    tracing::info!(
        "Admin user created successfully! ID: {}, Email: {}",
        user.id,
        user.email
    );

    Ok(user.id)
}
