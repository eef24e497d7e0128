//! HTTP route handlers for the storefront API.
//!
//! Every endpoint speaks JSON; errors are `{"error": "<message>"}`.
//!
//! # Route Structure
//!
//! ```text
//! # Users
//! POST   /api/users                     - Register (rate limited)
//! POST   /api/users/auth                - Log in (rate limited)
//! POST   /api/users/logout              - Log out
//! GET    /api/users/profile             - Own profile (auth)
//! PUT    /api/users/profile             - Update own profile (auth)
//! GET    /api/users                     - List users (admin)
//! GET    /api/users/{id}                - User detail (admin)
//! PUT    /api/users/{id}                - Update user (admin)
//! DELETE /api/users/{id}                - Delete non-admin user (admin)
//!
//! # Categories
//! POST   /api/category                  - Create (admin)
//! GET    /api/category/categories       - List
//! GET    /api/category/{id}             - Detail
//! PUT    /api/category/{id}             - Rename (admin)
//! DELETE /api/category/{id}             - Delete (admin)
//!
//! # Products
//! GET    /api/products?keyword=&page=   - Search, 6 per page
//! POST   /api/products                  - Create (admin)
//! GET    /api/products/allproducts      - 12 newest with category name
//! GET    /api/products/top              - 4 best rated
//! GET    /api/products/new              - 5 newest
//! POST   /api/products/filtered-products - Filter by categories and price
//! GET    /api/products/{id}             - Detail with reviews
//! PUT    /api/products/{id}             - Update (admin)
//! DELETE /api/products/{id}             - Delete (admin)
//! POST   /api/products/{id}/reviews     - Review (auth, once per user)
//!
//! # Cart (session)
//! GET    /api/cart                      - Cart state with totals
//! DELETE /api/cart                      - Remove all lines
//! POST   /api/cart/items                - Add or replace a line
//! DELETE /api/cart/items/{product_id}   - Remove a line
//! PUT    /api/cart/shipping-address     - Save shipping address
//! PUT    /api/cart/payment-method       - Save payment method
//! POST   /api/cart/reset                - Back to the initial cart
//!
//! # Favorites (session)
//! GET    /api/favorites                 - List
//! POST   /api/favorites                 - Add
//! DELETE /api/favorites/{product_id}    - Remove
//!
//! # Orders
//! POST   /api/orders                    - Place order (auth)
//! GET    /api/orders                    - All orders (admin)
//! GET    /api/orders/mine               - Own orders (auth)
//! GET    /api/orders/total-orders       - Order count (admin)
//! GET    /api/orders/total-sales        - Sum of order totals (admin)
//! GET    /api/orders/total-sales-by-date - Paid sales per day (admin)
//! GET    /api/orders/{id}               - Detail (owner or admin)
//! PUT    /api/orders/{id}/pay           - Mark paid (owner or admin)
//! PUT    /api/orders/{id}/deliver       - Mark delivered (admin)
//!
//! # Upload
//! POST   /api/upload                    - Product image (admin)
//! ```
//!
//! The order statistics (`total-orders`, `total-sales`,
//! `total-sales-by-date`) are admin-only; anonymous callers get 401 and
//! signed-in customers 403.

pub mod cart;
pub mod categories;
pub mod favorites;
pub mod orders;
pub mod products;
pub mod upload;
pub mod users;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
};

use crate::config::StorefrontConfig;
use crate::middleware::{api_rate_limiter, auth_rate_limiter};
use crate::state::AppState;

/// Create the user routes router.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            post(users::register)
                .layer(auth_rate_limiter())
                .get(users::list),
        )
        .route("/auth", post(users::login).layer(auth_rate_limiter()))
        .route("/logout", post(users::logout))
        .route(
            "/profile",
            get(users::profile).put(users::update_profile),
        )
        .route(
            "/{id}",
            get(users::show).put(users::update).delete(users::delete),
        )
}

/// Create the category routes router.
pub fn category_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(categories::create))
        .route("/categories", get(categories::list))
        .route(
            "/{id}",
            get(categories::show)
                .put(categories::update)
                .delete(categories::delete),
        )
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::search).post(products::create))
        .route("/allproducts", get(products::all))
        .route("/top", get(products::top))
        .route("/new", get(products::newest))
        .route("/filtered-products", post(products::filtered))
        .route(
            "/{id}",
            get(products::show)
                .put(products::update)
                .delete(products::delete),
        )
        .route("/{id}/reviews", post(products::add_review))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).delete(cart::clear))
        .route("/items", post(cart::add_item))
        .route("/items/{product_id}", delete(cart::remove_item))
        .route("/shipping-address", put(cart::save_shipping_address))
        .route("/payment-method", put(cart::save_payment_method))
        .route("/reset", post(cart::reset))
}

/// Create the favorites routes router.
pub fn favorite_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(favorites::list).post(favorites::add))
        .route("/{product_id}", delete(favorites::remove))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(orders::create).get(orders::list))
        .route("/mine", get(orders::mine))
        .route("/total-orders", get(orders::total_orders))
        .route("/total-sales", get(orders::total_sales))
        .route("/total-sales-by-date", get(orders::total_sales_by_date))
        .route("/{id}", get(orders::show))
        .route("/{id}/pay", put(orders::pay))
        .route("/{id}/deliver", put(orders::deliver))
}

/// Create the upload routes router.
///
/// The body limit leaves room for multipart framing around the image.
pub fn upload_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/", post(upload::upload_image))
        .layer(DefaultBodyLimit::max(max_upload_bytes.saturating_add(64 * 1024)))
        .layer(api_rate_limiter())
}

/// Create all API routes for the storefront.
pub fn routes(config: &StorefrontConfig) -> Router<AppState> {
    Router::new()
        .nest("/api/users", user_routes())
        .nest("/api/category", category_routes())
        .nest("/api/products", product_routes())
        .nest("/api/cart", cart_routes())
        .nest("/api/favorites", favorite_routes())
        .nest("/api/orders", order_routes())
        .nest("/api/upload", upload_routes(config.max_upload_bytes))
}
