//! Order route handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_sessions::Session;
use tracing::{instrument, warn};

use bazaar_core::OrderId;
use bazaar_core::cart::Cart;
use bazaar_core::order::{CheckoutRequest, Order, PaymentResult};

use crate::db::{DailySales, OrderRepository};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::{RequireAdmin, RequireAuth};
use crate::models::CurrentUser;
use crate::services::checkout::order_service;
use crate::state::AppState;
use crate::store::SessionSnapshotStore;

/// Payer block of a gateway confirmation.
#[derive(Debug, Default, Deserialize)]
pub struct Payer {
    pub email_address: Option<String>,
}

/// Body of `PUT /api/orders/{id}/pay`, as posted back by the payment widget.
#[derive(Debug, Deserialize)]
pub struct PaymentRequest {
    pub id: String,
    pub status: String,
    pub update_time: String,
    #[serde(default)]
    pub payer: Payer,
}

impl From<PaymentRequest> for PaymentResult {
    fn from(req: PaymentRequest) -> Self {
        Self {
            id: req.id,
            status: req.status,
            update_time: req.update_time,
            email_address: req.payer.email_address,
        }
    }
}

fn ensure_owner_or_admin(order: &Order, user: &CurrentUser) -> Result<()> {
    if user.is_admin || order.customer_id == user.id {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Not authorized to access this order".to_string(),
        ))
    }
}

/// `POST /api/orders` - place an order from the submitted items.
///
/// Prices are read from the catalog. The session cart is reset once the
/// order is stored.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn create(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Json(body): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<Order>)> {
    body.shipping_address
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    if body.payment_method.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Payment method is required".to_string(),
        ));
    }

    let order = order_service(state.pool())
        .create_order(user.id, &body)
        .await?;

    add_breadcrumb(
        "checkout",
        "Order placed",
        &[
            ("order_id", order.id.to_string()),
            ("grand_total", order.totals.grand_total.to_string()),
        ],
    );

    // The order is committed; a cart that fails to clear must not turn
    // it into an error the client would retry.
    if let Err(err) = Cart::reset_store(SessionSnapshotStore::cart(session)).await {
        warn!(order_id = %order.id, error = %err, "Failed to reset cart after checkout");
    }

    Ok((StatusCode::CREATED, Json(order)))
}

/// `GET /api/orders` (admin).
pub async fn list(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
) -> Result<Json<Vec<Order>>> {
    let orders = OrderRepository::new(state.pool()).list_all().await?;
    Ok(Json(orders))
}

/// `GET /api/orders/mine`.
pub async fn mine(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<Order>>> {
    let orders = OrderRepository::new(state.pool())
        .list_for_user(user.id)
        .await?;
    Ok(Json(orders))
}

/// `GET /api/orders/{id}` (owner or admin).
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    let order = order_service(state.pool()).find(id).await?;
    ensure_owner_or_admin(&order, &user)?;
    Ok(Json(order))
}

/// `GET /api/orders/total-orders` (admin).
pub async fn total_orders(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
) -> Result<Json<Value>> {
    let total = OrderRepository::new(state.pool()).count().await?;
    Ok(Json(json!({ "total_orders": total })))
}

/// `GET /api/orders/total-sales` (admin).
pub async fn total_sales(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
) -> Result<Json<Value>> {
    let total = OrderRepository::new(state.pool()).total_sales().await?;
    Ok(Json(json!({ "total_sales": total })))
}

/// `GET /api/orders/total-sales-by-date` (admin).
pub async fn total_sales_by_date(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
) -> Result<Json<Vec<DailySales>>> {
    let sales = OrderRepository::new(state.pool()).sales_by_date().await?;
    Ok(Json(sales))
}

/// `PUT /api/orders/{id}/pay` (owner or admin).
#[instrument(skip_all, fields(%id, user_id = %user.id))]
pub async fn pay(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
    Json(body): Json<PaymentRequest>,
) -> Result<Json<Order>> {
    let service = order_service(state.pool());
    let order = service.find(id).await?;
    ensure_owner_or_admin(&order, &user)?;

    let order = service.mark_paid(id, body.into()).await?;
    add_breadcrumb("checkout", "Order paid", &[("order_id", id.to_string())]);
    Ok(Json(order))
}

/// `PUT /api/orders/{id}/deliver` (admin).
#[instrument(skip_all, fields(%id))]
pub async fn deliver(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    let order = order_service(state.pool()).mark_delivered(id).await?;
    Ok(Json(order))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_request_maps_payer_email() {
        let body: PaymentRequest = serde_json::from_str(
            r#"{
                "id": "PAY-1",
                "status": "COMPLETED",
                "update_time": "2024-03-01T10:00:00Z",
                "payer": {"email_address": "buyer@example.com"}
            }"#,
        )
        .unwrap();
        let result = PaymentResult::from(body);
        assert_eq!(result.id, "PAY-1");
        assert_eq!(result.email_address.as_deref(), Some("buyer@example.com"));
    }

    #[test]
    fn test_payment_request_without_payer() {
        let body: PaymentRequest =
            serde_json::from_str(r#"{"id": "PAY-2", "status": "COMPLETED", "update_time": ""}"#)
                .unwrap();
        assert_eq!(PaymentResult::from(body).email_address, None);
    }
}
