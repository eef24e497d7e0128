//! Domain models for the storefront.
//!
//! These are the validated shapes handed to route handlers and serialized
//! in API responses. Row types used only for decoding live next to their
//! repositories in [`crate::db`].

pub mod category;
pub mod product;
pub mod session;
pub mod user;

pub use category::Category;
pub use product::{Product, ProductInput, ProductWithCategory, Review};
pub use session::{CurrentUser, keys as session_keys};
pub use user::User;
