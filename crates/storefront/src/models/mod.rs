//! Domain models for the storefront.
//!
//! These are validated domain objects, separate from the private row types
//! in [`crate::db`].

pub mod order;
pub mod product;
pub mod session;
pub mod user;

pub use order::{Order, OrderNotification};
pub use product::Product;
pub use session::CurrentUser;
pub use user::User;
