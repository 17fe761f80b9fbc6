//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - Registration, OTP verification and password login
//! - `catalog` - Product reads and writes behind a `moka` cache
//! - `email` - Registration codes and new-order alerts over SMTP
//! - `orders` - Checkout, status updates and assignment
//! - `outbox` - Applies order side effects and retries failures
//! - `admin_users` - Guards on admins managing accounts

pub mod admin_users;
pub mod auth;
pub mod catalog;
pub mod email;
pub mod orders;
pub mod outbox;
