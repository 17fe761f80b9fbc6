//! Authentication service.
//!
//! Password login for verified accounts, with a six-digit emailed code
//! confirming each new registration.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sqlx::PgPool;

use oncemore_core::{Email, UserRole};

use crate::db::RepositoryError;
use crate::db::users::{NewUser, UserRepository};
use crate::models::user::User;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 6;

/// Fields accepted when a shopper signs up.
#[derive(Debug, Clone)]
pub struct Registration<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub full_name: &'a str,
    pub phone: Option<&'a str>,
    pub address: Option<&'a str>,
}

/// Fields accepted when an admin creates an account directly.
#[derive(Debug, Clone)]
pub struct AccountSpec<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub full_name: &'a str,
    pub phone: Option<&'a str>,
    pub address: Option<&'a str>,
    pub role: UserRole,
}

/// A newly registered, unverified user and the code that verifies them.
#[derive(Debug)]
pub struct PendingVerification {
    pub user: User,
    pub otp: String,
}

/// Authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service over the accounts pool.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    /// Register an unverified user with a fresh verification code.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    pub async fn register(
        &self,
        registration: &Registration<'_>,
    ) -> Result<PendingVerification, AuthError> {
        let email = Email::parse(registration.email)?;
        validate_password(registration.password)?;
        let password_hash = hash_password(registration.password)?;
        let otp = generate_otp();

        let user = self
            .users
            .create(&NewUser {
                email: &email,
                password_hash: &password_hash,
                full_name: registration.full_name.trim(),
                phone: registration.phone,
                address: registration.address,
                role: UserRole::User,
                is_verified: false,
                otp: Some(&otp),
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        Ok(PendingVerification { user, otp })
    }

    /// Create an already-verified account with the given role.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    pub async fn create_verified(&self, spec: &AccountSpec<'_>) -> Result<User, AuthError> {
        let email = Email::parse(spec.email)?;
        validate_password(spec.password)?;
        let password_hash = hash_password(spec.password)?;

        self.users
            .create(&NewUser {
                email: &email,
                password_hash: &password_hash,
                full_name: spec.full_name.trim(),
                phone: spec.phone,
                address: spec.address,
                role: spec.role,
                is_verified: true,
                otp: None,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })
    }

    /// Confirm a registration code. The code is cleared on success.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if no account has this email.
    /// Returns `AuthError::InvalidOtp` if the code does not match.
    pub async fn verify_otp(&self, email: &str, otp: &str) -> Result<User, AuthError> {
        let email = Email::parse(email)?;

        if self.users.get_by_email(&email).await?.is_none() {
            return Err(AuthError::UserNotFound);
        }

        self.users
            .consume_otp(&email, otp.trim())
            .await?
            .ok_or(AuthError::InvalidOtp)
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    /// Returns `AuthError::Unverified` if the account was never verified.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let credentials = self
            .users
            .get_credentials(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !credentials.is_verified {
            return Err(AuthError::Unverified);
        }

        verify_password(password, &credentials.password_hash)?;

        self.users
            .get_by_id(credentials.id)
            .await?
            .ok_or(AuthError::InvalidCredentials)
    }
}

/// Generate a 6-digit verification code.
#[must_use]
pub fn generate_otp() -> String {
    use rand::Rng;
    let code: u32 = rand::rng().random_range(100_000..1_000_000);
    code.to_string()
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_otp_format() {
        for _ in 0..100 {
            let otp = generate_otp();
            assert_eq!(otp.len(), 6);
            let code: u32 = otp.parse().unwrap();
            assert!((100_000..1_000_000).contains(&code));
        }
    }

    #[test]
    fn test_password_hash_round_trip() {
        let hash = hash_password("thrift-store").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("thrift-store", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong-password", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_verify_password_rejects_garbage_hash() {
        assert!(matches!(
            verify_password("anything", "not-a-hash"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_validate_password_length() {
        assert!(matches!(
            validate_password("short"),
            Err(AuthError::WeakPassword(_))
        ));
        assert!(validate_password("sixsix").is_ok());
    }
}
