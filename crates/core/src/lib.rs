//! Bazaar Core - Domain logic shared by the storefront API and tools.
//!
//! This crate provides the pieces of the shop that do not depend on HTTP or
//! a database:
//! - [`types`] - Newtype wrappers for IDs, money, emails and order status
//! - [`pricing`] - Order/cart total computation
//! - [`cart`] - Cart state transitions and the persisting cart reconciler
//! - [`favorites`] - Favorite product list
//! - [`order`] - Order record builder and status transitions
//! - [`store`] - Snapshot persistence seam used by cart and favorites
//!
//! # Architecture
//!
//! The core crate contains only types, pure functions and collaborator
//! traits - no I/O, no database access, no HTTP clients. Persistence and
//! catalog lookups are injected through [`store::SnapshotStore`],
//! [`order::Catalog`] and [`order::OrderStore`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod favorites;
pub mod order;
pub mod pricing;
pub mod store;
pub mod types;

pub use types::*;
