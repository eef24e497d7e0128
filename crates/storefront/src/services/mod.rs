//! Business logic services for the storefront.
//!
//! - `auth` - Password registration, login and profile changes
//! - `checkout` - Order placement and status changes over the database

pub mod auth;
pub mod checkout;
