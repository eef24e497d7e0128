//! Cart route handlers.
//!
//! The cart lives in the visitor's session. Every handler opens the stored
//! snapshot, applies one operation and returns the new state with totals.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use bazaar_core::cart::{Cart, CartItem, CartState};
use bazaar_core::{ProductId, ShippingAddress};

use crate::db::ProductRepository;
use crate::error::{AppError, Result};
use crate::state::AppState;
use crate::store::SessionSnapshotStore;

type SessionCart = Cart<SessionSnapshotStore<CartState>>;

/// Body of `POST /api/cart/items`.
#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Body of `PUT /api/cart/payment-method`.
#[derive(Debug, Deserialize)]
pub struct PaymentMethodRequest {
    pub payment_method: String,
}

async fn open(session: Session) -> Result<SessionCart> {
    Ok(Cart::open(SessionSnapshotStore::cart(session)).await?)
}

/// `GET /api/cart`.
pub async fn show(session: Session) -> Result<Json<CartState>> {
    let cart = open(session).await?;
    Ok(Json(cart.into_state()))
}

/// `POST /api/cart/items` - add a product or replace its quantity.
///
/// Name, price, image and stock come from the catalog, never the client.
#[instrument(skip(state, session))]
pub async fn add_item(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<AddItemRequest>,
) -> Result<Json<CartState>> {
    if body.quantity == 0 {
        return Err(AppError::BadRequest(
            "Quantity must be at least 1".to_string(),
        ));
    }

    let product = ProductRepository::new(state.pool())
        .get(body.product_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

    let item = CartItem {
        product_id: product.id,
        name: product.name,
        image: product.image,
        brand: Some(product.brand),
        unit_price: product.price,
        count_in_stock: product.count_in_stock,
        quantity: body.quantity,
    };

    let mut cart = open(session).await?;
    cart.add(item).await?;
    Ok(Json(cart.into_state()))
}

/// `DELETE /api/cart/items/{product_id}`.
pub async fn remove_item(
    session: Session,
    Path(product_id): Path<ProductId>,
) -> Result<Json<CartState>> {
    let mut cart = open(session).await?;
    cart.remove(product_id).await?;
    Ok(Json(cart.into_state()))
}

/// `DELETE /api/cart` - remove every line, keep address and payment method.
pub async fn clear(session: Session) -> Result<Json<CartState>> {
    let mut cart = open(session).await?;
    cart.clear().await?;
    Ok(Json(cart.into_state()))
}

/// `PUT /api/cart/shipping-address`.
pub async fn save_shipping_address(
    session: Session,
    Json(address): Json<ShippingAddress>,
) -> Result<Json<CartState>> {
    address
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let mut cart = open(session).await?;
    cart.save_shipping_address(address).await?;
    Ok(Json(cart.into_state()))
}

/// `PUT /api/cart/payment-method`.
pub async fn save_payment_method(
    session: Session,
    Json(body): Json<PaymentMethodRequest>,
) -> Result<Json<CartState>> {
    let method = body.payment_method.trim();
    if method.is_empty() {
        return Err(AppError::BadRequest(
            "Payment method is required".to_string(),
        ));
    }

    let mut cart = open(session).await?;
    cart.save_payment_method(method).await?;
    Ok(Json(cart.into_state()))
}

/// `POST /api/cart/reset` - back to the empty initial cart.
///
/// The stored snapshot is dropped without being read.
pub async fn reset(session: Session) -> Result<Json<CartState>> {
    let cart = Cart::reset_store(SessionSnapshotStore::cart(session)).await?;
    Ok(Json(cart.into_state()))
}
