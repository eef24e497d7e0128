//! Cart snapshots survive reopening and are dropped by reset.

#![allow(clippy::unwrap_used)]

use bazaar_core::cart::{Cart, CartItem, CartState, DEFAULT_PAYMENT_METHOD};
use bazaar_core::store::MemoryStore;
use bazaar_core::{Money, ProductId};
use bazaar_integration_tests::address;

fn item(id: i32, cents: i64, quantity: u32) -> CartItem {
    CartItem {
        product_id: ProductId::new(id),
        name: format!("Product {id}"),
        image: String::new(),
        brand: Some("Acme".to_string()),
        unit_price: Money::from_cents(cents),
        count_in_stock: 5,
        quantity,
    }
}

#[tokio::test]
async fn test_reopen_restores_every_mutation() {
    let store = MemoryStore::<CartState>::new();

    let mut cart = Cart::open(store.clone()).await.unwrap();
    cart.add(item(1, 1_000, 1)).await.unwrap();
    cart.add(item(2, 500, 4)).await.unwrap();
    cart.remove(ProductId::new(1)).await.unwrap();
    cart.save_shipping_address(address()).await.unwrap();
    cart.save_payment_method("Card").await.unwrap();
    assert_eq!(store.save_count(), 5);

    let reopened = Cart::open(store).await.unwrap();
    let state = reopened.state();
    assert_eq!(state, cart.state());
    assert_eq!(state.items().len(), 1);
    assert_eq!(state.item_count(), 4);
    assert_eq!(state.payment_method(), "Card");
    assert_eq!(state.totals().items_total, Money::from_cents(2_000));
}

#[tokio::test]
async fn test_reset_discards_snapshot() {
    let store = MemoryStore::<CartState>::new();
    let mut cart = Cart::open(store.clone()).await.unwrap();
    cart.add(item(1, 1_000, 2)).await.unwrap();
    cart.save_shipping_address(address()).await.unwrap();

    let state = cart.reset().await.unwrap();
    assert!(state.is_empty());
    assert_eq!(state.payment_method(), DEFAULT_PAYMENT_METHOD);
    assert!(state.shipping_address().is_none());
    assert!(store.snapshot().is_none());

    let reopened = Cart::open(store).await.unwrap();
    assert_eq!(reopened.into_state(), CartState::new());
}

#[tokio::test]
async fn test_stored_totals_are_recomputed() {
    let mut state = CartState::new();
    state.add_item(item(1, 4_000, 3)).unwrap();

    let mut json = serde_json::to_value(&state).unwrap();
    json["totals"]["grand_total"] = serde_json::json!("0.01");
    let tampered: CartState = serde_json::from_value(json).unwrap();
    assert_ne!(tampered.totals(), state.totals());

    let cart = Cart::open(MemoryStore::with_value(tampered)).await.unwrap();
    assert_eq!(cart.state().totals(), state.totals());
    assert_eq!(cart.state().totals().grand_total, Money::from_cents(13_800));
}

#[tokio::test]
async fn test_invalid_item_is_not_persisted() {
    let store = MemoryStore::<CartState>::new();
    let mut cart = Cart::open(store.clone()).await.unwrap();

    assert!(cart.add(item(1, 1_000, 0)).await.is_err());
    assert!(cart.add(item(2, -100, 1)).await.is_err());

    assert_eq!(store.save_count(), 0);
    assert!(cart.state().is_empty());
}
