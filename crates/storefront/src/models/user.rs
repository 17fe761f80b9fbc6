//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use oncemore_core::{Email, UserId, UserRole};

/// A shopper or staff account.
///
/// Never carries the password hash or the registration code, so it is safe
/// to serialize into any response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub full_name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub role: UserRole,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What login needs to know about an account.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub id: UserId,
    pub email: Email,
    pub password_hash: String,
    pub role: UserRole,
    pub is_verified: bool,
}
