//! 1nceMore Core - shared types and business rules.
//!
//! This crate provides the types and pure rules used by every 1nceMore
//! component:
//! - `storefront` - Shop API plus the `/api/admin` back office
//! - `cli` - Command-line tools for migrations, admin accounts and seeding
//!
//! # Architecture
//!
//! The core crate contains only types and rules - no I/O, no database access,
//! no HTTP clients. Cart arithmetic, coupon and shipping rules, address
//! validation and order status transitions all live here so they can be
//! tested without a database.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, prices, emails, and statuses
//! - [`cart`] - Quantity-merged cart lines
//! - [`checkout`] - Coupon, shipping and total rules
//! - [`order`] - Shipping address validation and order snapshots
//! - [`product`] - Catalog product input validation

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod checkout;
pub mod order;
pub mod product;
pub mod types;

pub use cart::{Cart, CartError, CartItem};
pub use checkout::{CheckoutSummary, Coupon, CouponError, CouponState};
pub use order::{AddressError, NewOrder, OrderError, OrderItem, ShippingAddress, StockAdjustment};
pub use product::{ProductDraft, ProductError, ProductInput};
pub use types::*;
