//! Order record builder and order status transitions.
//!
//! Checkout turns client-submitted product references into an immutable
//! [`Order`]. Prices always come from the [`Catalog`]: the client only says
//! which products and how many. Once created, an order changes only through
//! [`Order::mark_paid`] and [`Order::mark_delivered`].
//!
//! ```text
//! CheckoutRequest ──► Catalog::find_many ──► build_order ──► OrderStore::insert
//!                                               │
//!                                               └─► compute_totals
//! ```

pub mod memory;

use std::collections::HashMap;
use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument};

use crate::pricing::{LineItem, PricingError, Totals, compute_totals};
use crate::types::{Money, OrderId, OrderStatus, ProductId, ShippingAddress, UserId};

/// Boxed collaborator error carried by [`OrderError::Store`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A status change that is not allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransitionError {
    /// The order was already marked paid.
    #[error("order {0} is already paid")]
    AlreadyPaid(OrderId),
    /// The order was already marked delivered.
    #[error("order {0} is already delivered")]
    AlreadyDelivered(OrderId),
}

/// Errors from building or updating an order.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Checkout submitted no items.
    #[error("no order items")]
    EmptyOrder,

    /// A referenced product does not exist in the catalog.
    #[error("product not found: {0}")]
    ProductNotFound(ProductId),

    /// A line failed price validation.
    #[error(transparent)]
    InvalidLineItem(#[from] PricingError),

    /// No order with this ID.
    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    /// Repeated or otherwise invalid status change.
    #[error(transparent)]
    Transition(#[from] TransitionError),

    /// Catalog or order store failed.
    #[error("order storage error: {0}")]
    Store(#[source] BoxError),
}

impl OrderError {
    fn store<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Store(Box::new(err))
    }
}

/// One product reference submitted at checkout.
///
/// There is deliberately no price field: the catalog is authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItemRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Everything the client submits to place an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub order_items: Vec<OrderItemRequest>,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
}

/// Current catalog data for one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub product_id: ProductId,
    pub name: String,
    pub image: String,
    pub unit_price: Money,
}

/// A frozen order line. Later catalog changes do not touch it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub name: String,
    pub image: String,
    pub unit_price: Money,
    pub quantity: u32,
}

impl OrderLine {
    /// Pricing view of this line.
    #[must_use]
    pub const fn line_item(&self) -> LineItem {
        LineItem::new(self.product_id, self.unit_price.amount(), self.quantity)
    }
}

/// Payment gateway confirmation stored when an order is paid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentResult {
    pub id: String,
    pub status: String,
    pub update_time: String,
    pub email_address: Option<String>,
}

/// An order ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub customer_id: UserId,
    pub lines: Vec<OrderLine>,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    pub totals: Totals,
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: UserId,
    pub lines: Vec<OrderLine>,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    pub payment_result: Option<PaymentResult>,
    #[serde(flatten)]
    pub totals: Totals,
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub is_delivered: bool,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Lifecycle position derived from the flags.
    #[must_use]
    pub const fn status(&self) -> OrderStatus {
        OrderStatus::from_flags(self.is_paid, self.is_delivered)
    }

    /// Record payment confirmation.
    ///
    /// # Errors
    ///
    /// Returns `TransitionError::AlreadyPaid` if the order is already paid;
    /// the original `paid_at` and confirmation are kept.
    pub fn mark_paid(
        &mut self,
        confirmation: PaymentResult,
        at: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        if self.is_paid {
            return Err(TransitionError::AlreadyPaid(self.id));
        }
        self.is_paid = true;
        self.paid_at = Some(at);
        self.payment_result = Some(confirmation);
        self.updated_at = at;
        Ok(())
    }

    /// Record delivery. Does not require the order to be paid.
    ///
    /// # Errors
    ///
    /// Returns `TransitionError::AlreadyDelivered` if already delivered.
    pub fn mark_delivered(&mut self, at: DateTime<Utc>) -> Result<(), TransitionError> {
        if self.is_delivered {
            return Err(TransitionError::AlreadyDelivered(self.id));
        }
        self.is_delivered = true;
        self.delivered_at = Some(at);
        self.updated_at = at;
        Ok(())
    }
}

/// Product price lookup.
pub trait Catalog {
    /// Error returned by the backing catalog.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Current entries for the given products. Unknown IDs are simply
    /// absent from the result.
    fn find_many(
        &self,
        ids: &[ProductId],
    ) -> impl Future<Output = Result<Vec<CatalogEntry>, Self::Error>> + Send;
}

/// Durable order storage.
pub trait OrderStore {
    /// Error returned by the backing store.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Persist a new order with all its lines, atomically.
    fn insert(&self, order: &NewOrder) -> impl Future<Output = Result<Order, Self::Error>> + Send;

    /// Look up an order.
    fn find(&self, id: OrderId) -> impl Future<Output = Result<Option<Order>, Self::Error>> + Send;

    /// Write the payment fields of `order`. Returns `false` if the stored
    /// order was already paid, leaving it untouched.
    fn record_payment(&self, order: &Order)
    -> impl Future<Output = Result<bool, Self::Error>> + Send;

    /// Write the delivery fields of `order`. Returns `false` if the stored
    /// order was already delivered, leaving it untouched.
    fn record_delivery(
        &self,
        order: &Order,
    ) -> impl Future<Output = Result<bool, Self::Error>> + Send;
}

/// Freeze a checkout request against catalog entries.
///
/// Each line takes the catalog price, never a client price.
///
/// # Errors
///
/// - `OrderError::EmptyOrder` if no items were submitted
/// - `OrderError::ProductNotFound` for the first item with no catalog entry
/// - `OrderError::InvalidLineItem` if a line fails pricing validation
pub fn build_order(
    customer_id: UserId,
    request: &CheckoutRequest,
    catalog: &[CatalogEntry],
) -> Result<NewOrder, OrderError> {
    if request.order_items.is_empty() {
        return Err(OrderError::EmptyOrder);
    }

    let by_id: HashMap<ProductId, &CatalogEntry> =
        catalog.iter().map(|entry| (entry.product_id, entry)).collect();

    let lines = request
        .order_items
        .iter()
        .map(|requested| {
            let entry = by_id
                .get(&requested.product_id)
                .ok_or(OrderError::ProductNotFound(requested.product_id))?;
            Ok(OrderLine {
                product_id: entry.product_id,
                name: entry.name.clone(),
                image: entry.image.clone(),
                unit_price: entry.unit_price,
                quantity: requested.quantity,
            })
        })
        .collect::<Result<Vec<_>, OrderError>>()?;

    let line_items: Vec<LineItem> = lines.iter().map(OrderLine::line_item).collect();
    let totals = compute_totals(&line_items)?;

    Ok(NewOrder {
        customer_id,
        lines,
        shipping_address: request.shipping_address.clone(),
        payment_method: request.payment_method.clone(),
        totals,
    })
}

/// Checkout and order status orchestration over injected collaborators.
#[derive(Debug, Clone)]
pub struct OrderService<C, O> {
    catalog: C,
    orders: O,
}

impl<C, O> OrderService<C, O>
where
    C: Catalog + Sync,
    O: OrderStore + Sync,
{
    /// Create a service over a catalog and an order store.
    #[must_use]
    pub const fn new(catalog: C, orders: O) -> Self {
        Self { catalog, orders }
    }

    /// Place an order: one catalog read, then one order write.
    ///
    /// Nothing is written unless every item resolves and prices cleanly.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`build_order`], or `OrderError::Store` if the
    /// catalog or order store fails.
    #[instrument(skip(self, request), fields(items = request.order_items.len()))]
    pub async fn create_order(
        &self,
        customer_id: UserId,
        request: &CheckoutRequest,
    ) -> Result<Order, OrderError> {
        if request.order_items.is_empty() {
            return Err(OrderError::EmptyOrder);
        }

        let mut ids: Vec<ProductId> = request.order_items.iter().map(|i| i.product_id).collect();
        ids.sort_unstable();
        ids.dedup();

        let entries = self
            .catalog
            .find_many(&ids)
            .await
            .map_err(OrderError::store)?;
        let new_order = build_order(customer_id, request, &entries)?;

        let order = self
            .orders
            .insert(&new_order)
            .await
            .map_err(OrderError::store)?;

        info!(
            order_id = %order.id,
            %customer_id,
            grand_total = %order.totals.grand_total,
            "Order created"
        );
        Ok(order)
    }

    /// Fetch an order.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::OrderNotFound` or `OrderError::Store`.
    pub async fn find(&self, id: OrderId) -> Result<Order, OrderError> {
        self.orders
            .find(id)
            .await
            .map_err(OrderError::store)?
            .ok_or(OrderError::OrderNotFound(id))
    }

    /// Mark an order paid with the gateway confirmation.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::OrderNotFound` (also when the order is deleted
    /// before the write), `TransitionError::AlreadyPaid` (also when a
    /// concurrent request won), or `OrderError::Store`.
    #[instrument(skip(self, confirmation))]
    pub async fn mark_paid(
        &self,
        id: OrderId,
        confirmation: PaymentResult,
    ) -> Result<Order, OrderError> {
        let mut order = self.find(id).await?;
        order.mark_paid(confirmation, Utc::now())?;

        let written = self
            .orders
            .record_payment(&order)
            .await
            .map_err(OrderError::store)?;
        if !written {
            return Err(self.rejected(id, TransitionError::AlreadyPaid(id)).await);
        }

        info!(order_id = %id, "Order marked paid");
        Ok(order)
    }

    /// Mark an order delivered.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::OrderNotFound`,
    /// `TransitionError::AlreadyDelivered`, or `OrderError::Store`.
    #[instrument(skip(self))]
    pub async fn mark_delivered(&self, id: OrderId) -> Result<Order, OrderError> {
        let mut order = self.find(id).await?;
        order.mark_delivered(Utc::now())?;

        let written = self
            .orders
            .record_delivery(&order)
            .await
            .map_err(OrderError::store)?;
        if !written {
            return Err(self.rejected(id, TransitionError::AlreadyDelivered(id)).await);
        }

        info!(order_id = %id, "Order marked delivered");
        Ok(order)
    }

    /// Why a conditional status write touched nothing: the order is gone,
    /// or another request already applied `transition`.
    async fn rejected(&self, id: OrderId, transition: TransitionError) -> OrderError {
        match self.find(id).await {
            Ok(_) => transition.into(),
            Err(err) => err,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::memory::{MemoryCatalog, MemoryOrders};
    use super::*;
    use crate::pricing::LineItemDefect;

    fn address() -> ShippingAddress {
        ShippingAddress {
            address: "1 Market St".to_owned(),
            city: "Springfield".to_owned(),
            postal_code: "12345".to_owned(),
            country: "US".to_owned(),
        }
    }

    fn entry(id: i32, cents: i64) -> CatalogEntry {
        CatalogEntry {
            product_id: ProductId::new(id),
            name: format!("Product {id}"),
            image: format!("/uploads/p{id}.png"),
            unit_price: Money::from_cents(cents),
        }
    }

    fn request(items: &[(i32, u32)]) -> CheckoutRequest {
        CheckoutRequest {
            order_items: items
                .iter()
                .map(|&(id, quantity)| OrderItemRequest {
                    product_id: ProductId::new(id),
                    quantity,
                })
                .collect(),
            shipping_address: address(),
            payment_method: "PayPal".to_owned(),
        }
    }

    fn payment() -> PaymentResult {
        PaymentResult {
            id: "PAY-1".to_owned(),
            status: "COMPLETED".to_owned(),
            update_time: "2026-01-01T00:00:00Z".to_owned(),
            email_address: Some("buyer@example.com".to_owned()),
        }
    }

    fn service() -> (OrderService<MemoryCatalog, MemoryOrders>, MemoryOrders) {
        let catalog = MemoryCatalog::new([entry(1, 6_000), entry(2, 1_550)]);
        let orders = MemoryOrders::new();
        (OrderService::new(catalog, orders.clone()), orders)
    }

    #[test]
    fn test_build_uses_catalog_price() {
        let order = build_order(UserId::new(1), &request(&[(1, 2)]), &[entry(1, 6_000)]).unwrap();
        assert_eq!(order.lines[0].unit_price.to_string(), "60.00");
        assert_eq!(order.totals.items_total.to_string(), "120.00");
        assert_eq!(order.totals.shipping_total.to_string(), "0.00");
        assert_eq!(order.totals.tax_total.to_string(), "18.00");
        assert_eq!(order.totals.grand_total.to_string(), "138.00");
    }

    #[test]
    fn test_build_empty_order() {
        let err = build_order(UserId::new(1), &request(&[]), &[entry(1, 100)]).unwrap_err();
        assert!(matches!(err, OrderError::EmptyOrder));
    }

    #[test]
    fn test_build_unknown_product() {
        let err = build_order(UserId::new(1), &request(&[(1, 1), (5, 1)]), &[entry(1, 100)])
            .unwrap_err();
        assert!(matches!(err, OrderError::ProductNotFound(id) if id == ProductId::new(5)));
    }

    #[test]
    fn test_build_zero_quantity() {
        let err = build_order(UserId::new(1), &request(&[(1, 0)]), &[entry(1, 100)]).unwrap_err();
        assert!(matches!(err, OrderError::InvalidLineItem(_)));
    }

    #[test]
    fn test_build_rejects_total_above_max_amount() {
        // 60.00 * 200,000,000 does not fit an order total
        let err = build_order(UserId::new(1), &request(&[(1, 200_000_000)]), &[entry(1, 6_000)])
            .unwrap_err();
        assert!(matches!(
            err,
            OrderError::InvalidLineItem(PricingError::InvalidLineItem {
                defect: LineItemDefect::AmountOverflow,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_create_order_oversized_quantity_writes_nothing() {
        let (service, orders) = service();
        let err = service
            .create_order(UserId::new(1), &request(&[(2, u32::MAX)]))
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::InvalidLineItem(_)));
        assert!(orders.is_empty());
    }

    #[test]
    fn test_build_keeps_duplicate_lines() {
        let order =
            build_order(UserId::new(1), &request(&[(1, 1), (1, 1)]), &[entry(1, 6_000)]).unwrap();
        assert_eq!(order.lines.len(), 2);
        assert_eq!(order.totals.grand_total.to_string(), "138.00");
    }

    #[tokio::test]
    async fn test_create_order_persists_snapshot() {
        let (service, orders) = service();
        let order = service
            .create_order(UserId::new(7), &request(&[(1, 2)]))
            .await
            .unwrap();

        assert!(!order.is_paid);
        assert!(!order.is_delivered);
        assert_eq!(order.status(), OrderStatus::Created);
        assert_eq!(orders.len(), 1);
        assert_eq!(orders.get(order.id).unwrap(), order);
    }

    #[tokio::test]
    async fn test_create_order_unknown_product_writes_nothing() {
        let (service, orders) = service();
        let err = service
            .create_order(UserId::new(7), &request(&[(1, 1), (99, 1)]))
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::ProductNotFound(_)));
        assert_eq!(orders.len(), 0);
    }

    #[tokio::test]
    async fn test_catalog_price_change_does_not_alter_order() {
        let catalog = MemoryCatalog::new([entry(1, 6_000)]);
        let orders = MemoryOrders::new();
        let service = OrderService::new(catalog.clone(), orders);

        let order = service
            .create_order(UserId::new(1), &request(&[(1, 1)]))
            .await
            .unwrap();
        catalog.set_price(ProductId::new(1), Money::from_cents(1));

        let stored = service.find(order.id).await.unwrap();
        assert_eq!(stored.lines[0].unit_price.to_string(), "60.00");
        assert_eq!(stored.totals, order.totals);
    }

    #[tokio::test]
    async fn test_mark_paid_then_delivered() {
        let (service, _) = service();
        let order = service
            .create_order(UserId::new(1), &request(&[(2, 1)]))
            .await
            .unwrap();

        let paid = service.mark_paid(order.id, payment()).await.unwrap();
        assert!(paid.is_paid);
        assert!(paid.paid_at.is_some());
        assert_eq!(paid.payment_result.as_ref().unwrap().id, "PAY-1");

        let delivered = service.mark_delivered(order.id).await.unwrap();
        assert!(delivered.is_delivered);
        assert!(delivered.delivered_at.is_some());
        assert_eq!(delivered.status(), OrderStatus::Completed);
    }

    #[tokio::test]
    async fn test_delivery_independent_of_payment() {
        let (service, _) = service();
        let order = service
            .create_order(UserId::new(1), &request(&[(2, 1)]))
            .await
            .unwrap();

        let delivered = service.mark_delivered(order.id).await.unwrap();
        assert!(delivered.is_delivered);
        assert!(!delivered.is_paid);
        assert_eq!(delivered.status(), OrderStatus::Delivered);
    }

    #[tokio::test]
    async fn test_repeated_transitions_rejected() {
        let (service, _) = service();
        let order = service
            .create_order(UserId::new(1), &request(&[(2, 1)]))
            .await
            .unwrap();

        let first = service.mark_paid(order.id, payment()).await.unwrap();
        let err = service.mark_paid(order.id, payment()).await.unwrap_err();
        assert!(matches!(
            err,
            OrderError::Transition(TransitionError::AlreadyPaid(_))
        ));
        assert_eq!(service.find(order.id).await.unwrap().paid_at, first.paid_at);

        service.mark_delivered(order.id).await.unwrap();
        let err = service.mark_delivered(order.id).await.unwrap_err();
        assert!(matches!(
            err,
            OrderError::Transition(TransitionError::AlreadyDelivered(_))
        ));
    }

    /// Store whose conditional writes find the row already deleted.
    #[derive(Clone)]
    struct DeletingOrders(MemoryOrders);

    impl OrderStore for DeletingOrders {
        type Error = std::convert::Infallible;

        async fn insert(&self, order: &NewOrder) -> Result<Order, Self::Error> {
            self.0.insert(order).await
        }

        async fn find(&self, id: OrderId) -> Result<Option<Order>, Self::Error> {
            self.0.find(id).await
        }

        async fn record_payment(&self, order: &Order) -> Result<bool, Self::Error> {
            let _ = self.0.remove(order.id);
            self.0.record_payment(order).await
        }

        async fn record_delivery(&self, order: &Order) -> Result<bool, Self::Error> {
            let _ = self.0.remove(order.id);
            self.0.record_delivery(order).await
        }
    }

    #[tokio::test]
    async fn test_order_deleted_before_write_is_not_found() {
        let catalog = MemoryCatalog::new([entry(1, 6_000)]);
        let service = OrderService::new(catalog, DeletingOrders(MemoryOrders::new()));

        let paid = service
            .create_order(UserId::new(1), &request(&[(1, 1)]))
            .await
            .unwrap();
        let err = service.mark_paid(paid.id, payment()).await.unwrap_err();
        assert!(matches!(err, OrderError::OrderNotFound(id) if id == paid.id));

        let delivered = service
            .create_order(UserId::new(1), &request(&[(1, 1)]))
            .await
            .unwrap();
        let err = service.mark_delivered(delivered.id).await.unwrap_err();
        assert!(matches!(err, OrderError::OrderNotFound(id) if id == delivered.id));
    }

    #[tokio::test]
    async fn test_unknown_order() {
        let (service, _) = service();
        let err = service.mark_delivered(OrderId::new(404)).await.unwrap_err();
        assert!(matches!(err, OrderError::OrderNotFound(_)));
    }

    #[test]
    fn test_order_json_flattens_totals() {
        let now = Utc::now();
        let order = Order {
            id: OrderId::new(1),
            customer_id: UserId::new(2),
            lines: Vec::new(),
            shipping_address: address(),
            payment_method: "PayPal".to_owned(),
            payment_result: None,
            totals: Totals::empty(),
            is_paid: false,
            paid_at: None,
            is_delivered: false,
            delivered_at: None,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["shipping_total"], "10.00");
        assert_eq!(json["is_paid"], false);
    }
}
