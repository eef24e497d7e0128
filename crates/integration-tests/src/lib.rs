//! Integration tests for Bazaar.
//!
//! # Running Tests
//!
//! ```bash
//! # In-process tests (no services needed)
//! cargo test -p bazaar-integration-tests
//!
//! # HTTP tests against a running storefront and database
//! cargo test -p bazaar-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `checkout_flow` - Cart to order, priced from an in-memory catalog
//! - `cart_persistence` - Cart snapshots across reopen and reset
//! - `storefront_api` - JSON API over HTTP (ignored by default)

use bazaar_core::order::memory::{MemoryCatalog, MemoryOrders};
use bazaar_core::order::{CatalogEntry, OrderService};
use bazaar_core::{Money, ProductId, ShippingAddress};

/// Base URL for the storefront API (configurable via environment).
#[must_use]
pub fn storefront_base_url() -> String {
    std::env::var("BAZAAR_BASE_URL").unwrap_or_else(|_| "http://localhost:5000".to_string())
}

/// Catalog entry with a generated name and image.
#[must_use]
pub fn entry(id: i32, cents: i64) -> CatalogEntry {
    CatalogEntry {
        product_id: ProductId::new(id),
        name: format!("Product {id}"),
        image: format!("/uploads/product-{id}.png"),
        unit_price: Money::from_cents(cents),
    }
}

/// Two-product catalog: #1 at 60.00 and #2 at 25.50.
#[must_use]
pub fn catalog() -> MemoryCatalog {
    MemoryCatalog::new([entry(1, 6_000), entry(2, 2_550)])
}

/// Order service over in-memory collaborators, plus handles to both.
#[must_use]
pub fn order_service() -> (
    OrderService<MemoryCatalog, MemoryOrders>,
    MemoryCatalog,
    MemoryOrders,
) {
    let catalog = catalog();
    let orders = MemoryOrders::new();
    let service = OrderService::new(catalog.clone(), orders.clone());
    (service, catalog, orders)
}

/// A complete shipping address.
#[must_use]
pub fn address() -> ShippingAddress {
    ShippingAddress {
        address: "1 Market St".to_string(),
        city: "Springfield".to_string(),
        postal_code: "12345".to_string(),
        country: "US".to_string(),
    }
}
