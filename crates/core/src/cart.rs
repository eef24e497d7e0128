//! Shopping cart state and the persisting cart reconciler.
//!
//! [`CartState`] holds the ordered cart lines plus derived totals. Its
//! transitions are pure and keep the totals in sync; nothing outside this
//! module can set a total directly.
//!
//! [`Cart`] wraps a state together with a [`SnapshotStore`] and persists the
//! whole snapshot after every mutation. It is a single logical actor: each
//! operation runs to completion before the next one can start because they
//! all take `&mut self`.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::pricing::{LineItem, PricingError, Totals, compute_totals};
use crate::store::SnapshotStore;
use crate::types::{Money, ProductId, ShippingAddress};

/// Payment method preselected for a new cart.
pub const DEFAULT_PAYMENT_METHOD: &str = "PayPal";

/// A product placed in the cart, as it was shown to the customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    pub name: String,
    pub image: String,
    #[serde(default)]
    pub brand: Option<String>,
    pub unit_price: Money,
    pub count_in_stock: i32,
    pub quantity: u32,
}

impl CartItem {
    /// Pricing view of this cart line.
    #[must_use]
    pub const fn line_item(&self) -> LineItem {
        LineItem::new(self.product_id, self.unit_price.amount(), self.quantity)
    }
}

/// Cart contents, checkout preferences and derived totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartState {
    items: Vec<CartItem>,
    shipping_address: Option<ShippingAddress>,
    payment_method: String,
    totals: Totals,
}

impl Default for CartState {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            shipping_address: None,
            payment_method: DEFAULT_PAYMENT_METHOD.to_owned(),
            totals: Totals::empty(),
        }
    }
}

impl CartState {
    /// The empty initial cart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cart lines in display order.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Saved shipping address, if any.
    #[must_use]
    pub const fn shipping_address(&self) -> Option<&ShippingAddress> {
        self.shipping_address.as_ref()
    }

    /// Selected payment method.
    #[must_use]
    pub fn payment_method(&self) -> &str {
        &self.payment_method
    }

    /// Totals derived from the current lines.
    #[must_use]
    pub const fn totals(&self) -> &Totals {
        &self.totals
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of quantities across all lines (the badge count).
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    /// Pricing view of every line.
    pub fn line_items(&self) -> impl Iterator<Item = LineItem> + '_ {
        self.items.iter().map(CartItem::line_item)
    }

    /// Insert or replace a line.
    ///
    /// A line for a product already in the cart is replaced where it stands;
    /// a new product is appended.
    ///
    /// # Errors
    ///
    /// Returns `PricingError::InvalidLineItem` if the item (or any existing
    /// line) violates the pricing rules. The state is left unchanged.
    pub fn add_item(&mut self, item: CartItem) -> Result<(), PricingError> {
        item.line_item().validate()?;

        let mut items = self.items.clone();
        match items.iter_mut().find(|x| x.product_id == item.product_id) {
            Some(existing) => *existing = item,
            None => items.push(item),
        }
        self.replace_items(items)
    }

    /// Drop the line for `product_id`; returns whether one was removed.
    ///
    /// Removing a product that is not in the cart is not an error.
    ///
    /// # Errors
    ///
    /// Returns `PricingError::InvalidLineItem` if a remaining line is invalid.
    pub fn remove_item(&mut self, product_id: ProductId) -> Result<bool, PricingError> {
        let before = self.items.len();
        let items: Vec<CartItem> = self
            .items
            .iter()
            .filter(|x| x.product_id != product_id)
            .cloned()
            .collect();
        let removed = items.len() != before;
        self.replace_items(items)?;
        Ok(removed)
    }

    /// Remove every line, keeping address and payment method.
    pub fn clear(&mut self) {
        self.items.clear();
        self.totals = Totals::empty();
    }

    /// Remember the shipping address for checkout.
    pub fn set_shipping_address(&mut self, address: ShippingAddress) {
        self.shipping_address = Some(address);
    }

    /// Remember the payment method for checkout.
    pub fn set_payment_method(&mut self, method: impl Into<String>) {
        self.payment_method = method.into();
    }

    /// Recompute totals from the lines, e.g. after reading a stored snapshot.
    ///
    /// # Errors
    ///
    /// Returns `PricingError::InvalidLineItem` if any line is invalid.
    pub fn recompute(&mut self) -> Result<(), PricingError> {
        self.totals = compute_totals(&self.line_items().collect::<Vec<_>>())?;
        Ok(())
    }

    fn replace_items(&mut self, items: Vec<CartItem>) -> Result<(), PricingError> {
        let lines: Vec<LineItem> = items.iter().map(CartItem::line_item).collect();
        self.totals = compute_totals(&lines)?;
        self.items = items;
        Ok(())
    }
}

/// Errors from [`Cart`] operations.
#[derive(Debug, Error)]
pub enum CartError<E> {
    /// An item failed price validation.
    #[error(transparent)]
    Pricing(#[from] PricingError),

    /// The snapshot store failed.
    #[error("cart storage error: {0}")]
    Store(#[source] E),
}

/// A cart bound to its persistence.
///
/// Every mutating operation recomputes totals and then overwrites the
/// stored snapshot before returning.
#[derive(Debug)]
pub struct Cart<S> {
    state: CartState,
    store: S,
}

impl<S> Cart<S>
where
    S: SnapshotStore<CartState>,
{
    /// Open the cart persisted in `store`, or a fresh one if none exists.
    ///
    /// Totals of a stored snapshot are recomputed rather than trusted.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Store` if the snapshot cannot be read and
    /// `CartError::Pricing` if it contains an invalid line.
    pub async fn open(store: S) -> Result<Self, CartError<S::Error>> {
        let state = match store.load().await.map_err(CartError::Store)? {
            Some(mut state) => {
                state.recompute()?;
                state
            }
            None => CartState::new(),
        };
        Ok(Self { state, store })
    }

    /// A fresh initial cart over `store`, discarding whatever it held.
    ///
    /// Unlike `open` followed by [`Cart::reset`], the stored snapshot is
    /// never loaded, so an unreadable or invalid snapshot cannot fail it.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Store` if the snapshot cannot be discarded.
    pub async fn reset_store(store: S) -> Result<Self, CartError<S::Error>> {
        store.discard().await.map_err(CartError::Store)?;
        Ok(Self {
            state: CartState::new(),
            store,
        })
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> &CartState {
        &self.state
    }

    /// Consume the cart, returning its state.
    #[must_use]
    pub fn into_state(self) -> CartState {
        self.state
    }

    /// Add or replace a line and persist.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Pricing` for an invalid item (nothing is
    /// persisted) or `CartError::Store` if the write fails.
    pub async fn add(&mut self, item: CartItem) -> Result<&CartState, CartError<S::Error>> {
        debug!(product_id = %item.product_id, quantity = item.quantity, "cart add");
        self.state.add_item(item)?;
        self.persist().await
    }

    /// Remove a line (absent is a no-op) and persist.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Store` if the write fails.
    pub async fn remove(
        &mut self,
        product_id: ProductId,
    ) -> Result<&CartState, CartError<S::Error>> {
        let removed = self.state.remove_item(product_id)?;
        debug!(%product_id, removed, "cart remove");
        self.persist().await
    }

    /// Empty the cart and persist.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Store` if the write fails.
    pub async fn clear(&mut self) -> Result<&CartState, CartError<S::Error>> {
        self.state.clear();
        self.persist().await
    }

    /// Save the shipping address and persist.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Store` if the write fails.
    pub async fn save_shipping_address(
        &mut self,
        address: ShippingAddress,
    ) -> Result<&CartState, CartError<S::Error>> {
        self.state.set_shipping_address(address);
        self.persist().await
    }

    /// Save the payment method and persist.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Store` if the write fails.
    pub async fn save_payment_method(
        &mut self,
        method: impl Into<String>,
    ) -> Result<&CartState, CartError<S::Error>> {
        self.state.set_payment_method(method);
        self.persist().await
    }

    /// Restore the hard-coded initial state and drop the stored snapshot.
    ///
    /// The store is never read back, so a reset cart is empty even if the
    /// store still held lines.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Store` if the snapshot cannot be discarded.
    pub async fn reset(&mut self) -> Result<&CartState, CartError<S::Error>> {
        self.state = CartState::new();
        self.store.discard().await.map_err(CartError::Store)?;
        Ok(&self.state)
    }

    async fn persist(&self) -> Result<&CartState, CartError<S::Error>> {
        self.store
            .save(&self.state)
            .await
            .map_err(CartError::Store)?;
        Ok(&self.state)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn item(id: i32, cents: i64, quantity: u32) -> CartItem {
        CartItem {
            product_id: ProductId::new(id),
            name: format!("Product {id}"),
            image: format!("/uploads/image-{id}.png"),
            brand: None,
            unit_price: Money::from_cents(cents),
            count_in_stock: 10,
            quantity,
        }
    }

    fn ids(state: &CartState) -> Vec<i32> {
        state.items().iter().map(|i| i.product_id.as_i32()).collect()
    }

    #[test]
    fn test_new_cart_has_empty_totals() {
        let state = CartState::new();
        assert!(state.is_empty());
        assert_eq!(state.totals(), &Totals::empty());
        assert_eq!(state.payment_method(), "PayPal");
    }

    #[test]
    fn test_add_appends_in_order() {
        let mut state = CartState::new();
        state.add_item(item(1, 1_000, 1)).unwrap();
        state.add_item(item(2, 500, 2)).unwrap();
        assert_eq!(ids(&state), [1, 2]);
        assert_eq!(state.totals().items_total.to_string(), "20.00");
        assert_eq!(state.item_count(), 3);
    }

    #[test]
    fn test_add_existing_replaces_in_place() {
        let mut state = CartState::new();
        state.add_item(item(1, 1_000, 1)).unwrap();
        state.add_item(item(2, 500, 1)).unwrap();
        state.add_item(item(3, 100, 1)).unwrap();

        state.add_item(item(2, 500, 4)).unwrap();

        assert_eq!(ids(&state), [1, 2, 3]);
        assert_eq!(state.items()[1].quantity, 4);
        assert_eq!(state.totals().items_total.to_string(), "31.00");
    }

    #[test]
    fn test_invalid_item_leaves_state_unchanged() {
        let mut state = CartState::new();
        state.add_item(item(1, 1_000, 1)).unwrap();
        let before = state.clone();

        assert!(state.add_item(item(1, 1_000, 0)).is_err());
        assert!(state.add_item(item(2, -5, 1)).is_err());
        assert_eq!(state, before);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut state = CartState::new();
        state.add_item(item(1, 1_000, 1)).unwrap();
        assert!(!state.remove_item(ProductId::new(9)).unwrap());
        assert_eq!(ids(&state), [1]);
        assert!(state.remove_item(ProductId::new(1)).unwrap());
        assert!(state.is_empty());
        assert_eq!(state.totals(), &Totals::empty());
    }

    #[test]
    fn test_clear_keeps_checkout_preferences() {
        let mut state = CartState::new();
        state.add_item(item(1, 20_000, 1)).unwrap();
        state.set_payment_method("Stripe");
        state.clear();
        assert!(state.is_empty());
        assert_eq!(state.totals().grand_total.to_string(), "10.00");
        assert_eq!(state.payment_method(), "Stripe");
    }

    #[tokio::test]
    async fn test_every_mutation_persists_full_snapshot() {
        let store = MemoryStore::new();
        let mut cart = Cart::open(store.clone()).await.unwrap();

        cart.add(item(1, 6_000, 2)).await.unwrap();
        assert_eq!(store.snapshot().unwrap(), *cart.state());

        cart.remove(ProductId::new(42)).await.unwrap();
        cart.clear().await.unwrap();
        assert_eq!(store.save_count(), 3);
        assert!(store.snapshot().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_open_reads_back_and_recomputes() {
        let mut stale = CartState::new();
        stale.add_item(item(1, 6_000, 2)).unwrap();
        let json = serde_json::to_value(&stale).unwrap();
        let mut tampered = json;
        tampered["totals"]["grand_total"] = "0.01".into();
        let tampered: CartState = serde_json::from_value(tampered).unwrap();

        let cart = Cart::open(MemoryStore::with_value(tampered)).await.unwrap();
        assert_eq!(cart.state().totals().grand_total.to_string(), "138.00");
    }

    #[tokio::test]
    async fn test_failed_add_does_not_persist() {
        let store = MemoryStore::new();
        let mut cart = Cart::open(store.clone()).await.unwrap();
        let err = cart.add(item(1, 100, 0)).await.unwrap_err();
        assert!(matches!(err, CartError::Pricing(_)));
        assert_eq!(store.save_count(), 0);
    }

    #[tokio::test]
    async fn test_reset_discards_without_reading_back() {
        let store = MemoryStore::new();
        let mut cart = Cart::open(store.clone()).await.unwrap();
        cart.add(item(1, 1_000, 1)).await.unwrap();
        cart.save_payment_method("Stripe").await.unwrap();

        let state = cart.reset().await.unwrap();
        assert_eq!(state, &CartState::new());
        assert_eq!(store.snapshot(), None);
    }

    #[tokio::test]
    async fn test_reset_store_ignores_invalid_snapshot() {
        let mut stored = CartState::new();
        stored.add_item(item(1, 1_000, 1)).unwrap();
        let mut json = serde_json::to_value(&stored).unwrap();
        json["items"][0]["quantity"] = 0.into();
        let invalid: CartState = serde_json::from_value(json).unwrap();

        let store = MemoryStore::with_value(invalid);
        assert!(matches!(
            Cart::open(store.clone()).await.unwrap_err(),
            CartError::Pricing(_)
        ));

        let cart = Cart::reset_store(store.clone()).await.unwrap();
        assert_eq!(cart.state(), &CartState::new());
        assert_eq!(store.snapshot(), None);
        assert_eq!(store.save_count(), 0);
    }
}
