//! Bazaar Storefront library.
//!
//! The JSON API of the shop: accounts, catalog, session cart and
//! favorites, checkout and order management. The binary in `main.rs`
//! only wires configuration, tracing and the listener around [`app`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;

use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Router, routing::get};
use tower_http::services::ServeDir;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use state::AppState;

/// Build the full application router with its session, request ID and
/// tracing layers. Sentry layers are added by the caller.
pub fn app(state: AppState) -> Router {
    let session_layer = middleware::create_session_layer(state.pool(), state.config());

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes::routes(state.config()))
        .nest_service("/uploads", ServeDir::new(&state.config().upload_dir))
        .layer(session_layer)
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>, latency: Duration, span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};
    use std::path::PathBuf;

    use axum::body::Body;
    use axum::http::Request;
    use secrecy::SecretString;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use super::*;
    use crate::config::StorefrontConfig;
    use crate::middleware::request_id::REQUEST_ID_HEADER;

    /// App over a pool that never connects; only routes that stay away
    /// from the database can be exercised.
    fn offline_app() -> Router {
        let config = StorefrontConfig {
            database_url: SecretString::from("postgres://localhost/bazaar_test"),
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 5000,
            base_url: "http://localhost:5000".to_string(),
            upload_dir: PathBuf::from("uploads"),
            max_upload_bytes: 1024,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        };
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/bazaar_test")
            .unwrap();
        app(AppState::new(config, pool))
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = offline_app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));
    }

    #[tokio::test]
    async fn test_inbound_request_id_is_echoed() {
        let response = offline_app()
            .oneshot(
                Request::get("/health")
                    .header(REQUEST_ID_HEADER, "edge-42")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.headers()[REQUEST_ID_HEADER], "edge-42");
    }

    #[tokio::test]
    async fn test_profile_requires_login() {
        let response = offline_app()
            .oneshot(Request::get("/api/users/profile").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = json_body(response).await;
        assert_eq!(body["error"], "Not authorized, please log in");
    }

    #[tokio::test]
    async fn test_admin_routes_require_login() {
        for (method, uri) in [
            ("GET", "/api/orders"),
            ("GET", "/api/orders/total-orders"),
            ("GET", "/api/orders/total-sales"),
            ("GET", "/api/orders/total-sales-by-date"),
            ("PUT", "/api/orders/1/deliver"),
            ("DELETE", "/api/products/1"),
            ("GET", "/api/users"),
        ] {
            let response = offline_app()
                .oneshot(Request::builder().method(method).uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{method} {uri}");
        }
    }

    #[tokio::test]
    async fn test_new_visitor_gets_initial_cart() {
        let response = offline_app()
            .oneshot(Request::get("/api/cart").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["items"], serde_json::json!([]));
        assert_eq!(body["payment_method"], "PayPal");
        assert_eq!(body["totals"]["shipping_total"], "10.00");
        assert_eq!(body["totals"]["grand_total"], "10.00");
    }

    #[tokio::test]
    async fn test_cart_reset_returns_initial_cart() {
        let response = offline_app()
            .oneshot(Request::post("/api/cart/reset").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["items"], serde_json::json!([]));
        assert_eq!(body["shipping_address"], serde_json::Value::Null);
        assert_eq!(body["totals"]["grand_total"], "10.00");
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let response = offline_app()
            .oneshot(Request::get("/api/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
