//! Order service wired to the database.

use sqlx::PgPool;

use bazaar_core::order::OrderService;

use crate::db::{OrderRepository, ProductRepository};

/// Order service backed by the product catalog and order tables.
pub type DbOrderService<'a> = OrderService<ProductRepository<'a>, OrderRepository<'a>>;

/// Build the order service for one request.
#[must_use]
pub const fn order_service(pool: &PgPool) -> DbOrderService<'_> {
    OrderService::new(ProductRepository::new(pool), OrderRepository::new(pool))
}
