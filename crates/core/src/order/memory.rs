//! In-process catalog and order store.
//!
//! Used by tests and by anything that wants to run checkout without a
//! database.

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;

use super::{Catalog, CatalogEntry, NewOrder, Order, OrderStore};
use crate::types::{Money, OrderId, ProductId};

/// Catalog backed by a shared map.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    entries: Arc<Mutex<BTreeMap<ProductId, CatalogEntry>>>,
}

impl MemoryCatalog {
    /// A catalog holding `entries`.
    #[must_use]
    pub fn new(entries: impl IntoIterator<Item = CatalogEntry>) -> Self {
        let entries = entries.into_iter().map(|e| (e.product_id, e)).collect();
        Self {
            entries: Arc::new(Mutex::new(entries)),
        }
    }

    /// Insert or replace an entry.
    pub fn upsert(&self, entry: CatalogEntry) {
        self.lock().insert(entry.product_id, entry);
    }

    /// Change a product's price. Returns `false` if it is unknown.
    pub fn set_price(&self, product_id: ProductId, price: Money) -> bool {
        self.lock()
            .get_mut(&product_id)
            .map(|entry| entry.unit_price = price)
            .is_some()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<ProductId, CatalogEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Catalog for MemoryCatalog {
    type Error = Infallible;

    async fn find_many(&self, ids: &[ProductId]) -> Result<Vec<CatalogEntry>, Self::Error> {
        let entries = self.lock();
        Ok(ids.iter().filter_map(|id| entries.get(id).cloned()).collect())
    }
}

#[derive(Debug, Default)]
struct OrderTable {
    next_id: i32,
    rows: BTreeMap<OrderId, Order>,
}

/// Order store backed by a shared map. Clones share the same table.
#[derive(Debug, Clone, Default)]
pub struct MemoryOrders {
    table: Arc<Mutex<OrderTable>>,
}

impl MemoryOrders {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored orders.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().rows.len()
    }

    /// Whether no orders are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().rows.is_empty()
    }

    /// Copy of a stored order.
    #[must_use]
    pub fn get(&self, id: OrderId) -> Option<Order> {
        self.lock().rows.get(&id).cloned()
    }

    /// Delete a stored order, returning it.
    #[must_use]
    pub fn remove(&self, id: OrderId) -> Option<Order> {
        self.lock().rows.remove(&id)
    }

    fn lock(&self) -> MutexGuard<'_, OrderTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl OrderStore for MemoryOrders {
    type Error = Infallible;

    async fn insert(&self, order: &NewOrder) -> Result<Order, Self::Error> {
        let mut table = self.lock();
        table.next_id += 1;
        let now = Utc::now();
        let stored = Order {
            id: OrderId::new(table.next_id),
            customer_id: order.customer_id,
            lines: order.lines.clone(),
            shipping_address: order.shipping_address.clone(),
            payment_method: order.payment_method.clone(),
            payment_result: None,
            totals: order.totals,
            is_paid: false,
            paid_at: None,
            is_delivered: false,
            delivered_at: None,
            created_at: now,
            updated_at: now,
        };
        table.rows.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn find(&self, id: OrderId) -> Result<Option<Order>, Self::Error> {
        Ok(self.get(id))
    }

    async fn record_payment(&self, order: &Order) -> Result<bool, Self::Error> {
        let mut table = self.lock();
        let Some(row) = table.rows.get_mut(&order.id) else {
            return Ok(false);
        };
        if row.is_paid {
            return Ok(false);
        }
        row.is_paid = true;
        row.paid_at = order.paid_at;
        row.payment_result.clone_from(&order.payment_result);
        row.updated_at = order.updated_at;
        Ok(true)
    }

    async fn record_delivery(&self, order: &Order) -> Result<bool, Self::Error> {
        let mut table = self.lock();
        let Some(row) = table.rows.get_mut(&order.id) else {
            return Ok(false);
        };
        if row.is_delivered {
            return Ok(false);
        }
        row.is_delivered = true;
        row.delivered_at = order.delivered_at;
        row.updated_at = order.updated_at;
        Ok(true)
    }
}
