//! Product and review route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::instrument;

use bazaar_core::{CategoryId, ProductId};

use crate::db::{ProductRepository, RepositoryError};
use crate::error::{AppError, Result};
use crate::middleware::{RequireAdmin, RequireAuth};
use crate::models::{Product, ProductInput, ProductWithCategory, Review};
use crate::state::AppState;

/// Search results per page.
pub const SEARCH_PAGE_SIZE: i64 = 6;
const ALL_PRODUCTS_LIMIT: i64 = 12;
const TOP_PRODUCTS_LIMIT: i64 = 4;
const NEW_PRODUCTS_LIMIT: i64 = 5;

/// Query string for `GET /api/products`.
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub keyword: Option<String>,
    pub page: Option<i64>,
}

/// One page of search results.
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub products: Vec<Product>,
    pub page: i64,
    pub pages: i64,
    pub has_more: bool,
}

/// Body of `POST /api/products/filtered-products`.
#[derive(Debug, Default, Deserialize)]
pub struct FilterRequest {
    /// Category IDs; empty means any category.
    #[serde(default)]
    pub checked: Vec<CategoryId>,
    /// `[min, max]` inclusive price range; empty means any price.
    #[serde(default)]
    pub radio: Vec<Decimal>,
}

impl FilterRequest {
    fn price_range(&self) -> Result<Option<(Decimal, Decimal)>> {
        match self.radio.as_slice() {
            [] => Ok(None),
            [min, max] if min <= max => Ok(Some((*min, *max))),
            _ => Err(AppError::BadRequest(
                "radio must be [min, max] with min <= max".to_string(),
            )),
        }
    }
}

/// A product with its reviews.
#[derive(Debug, Serialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub reviews: Vec<Review>,
}

/// Body of `POST /api/products/{id}/reviews`.
#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub rating: i16,
    pub comment: String,
}

fn not_found() -> AppError {
    AppError::NotFound("Product not found".to_string())
}

fn map_not_found(err: RepositoryError) -> AppError {
    match err {
        RepositoryError::NotFound => not_found(),
        other => other.into(),
    }
}

/// Page count for `total` results; at least one page.
const fn page_count(total: i64) -> i64 {
    let pages = (total + SEARCH_PAGE_SIZE - 1) / SEARCH_PAGE_SIZE;
    if pages < 1 { 1 } else { pages }
}

// =============================================================================
// Public
// =============================================================================

/// `GET /api/products?keyword=&page=`.
#[instrument(skip(state))]
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResponse>> {
    let page = query.page.unwrap_or(1).max(1);
    let offset = (page - 1).saturating_mul(SEARCH_PAGE_SIZE);

    let result = ProductRepository::new(state.pool())
        .search(query.keyword.as_deref(), SEARCH_PAGE_SIZE, offset)
        .await?;

    let pages = page_count(result.total);
    Ok(Json(SearchResponse {
        products: result.products,
        page,
        pages,
        has_more: page < pages,
    }))
}

/// `GET /api/products/allproducts`.
pub async fn all(State(state): State<AppState>) -> Result<Json<Vec<ProductWithCategory>>> {
    let products = ProductRepository::new(state.pool())
        .list_with_category(ALL_PRODUCTS_LIMIT)
        .await?;
    Ok(Json(products))
}

/// `GET /api/products/top`.
pub async fn top(State(state): State<AppState>) -> Result<Json<Vec<Product>>> {
    let products = ProductRepository::new(state.pool())
        .top_rated(TOP_PRODUCTS_LIMIT)
        .await?;
    Ok(Json(products))
}

/// `GET /api/products/new`.
pub async fn newest(State(state): State<AppState>) -> Result<Json<Vec<Product>>> {
    let products = ProductRepository::new(state.pool())
        .newest(NEW_PRODUCTS_LIMIT)
        .await?;
    Ok(Json(products))
}

/// `POST /api/products/filtered-products`.
pub async fn filtered(
    State(state): State<AppState>,
    Json(body): Json<FilterRequest>,
) -> Result<Json<Vec<Product>>> {
    let range = body.price_range()?;
    let products = ProductRepository::new(state.pool())
        .filter(&body.checked, range)
        .await?;
    Ok(Json(products))
}

/// `GET /api/products/{id}`.
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<ProductDetail>> {
    let products = ProductRepository::new(state.pool());
    let product = products.get(id).await?.ok_or_else(not_found)?;
    let reviews = products.reviews(id).await?;
    Ok(Json(ProductDetail { product, reviews }))
}

/// `POST /api/products/{id}/reviews`.
#[instrument(skip_all, fields(product_id = %id, user_id = %user.id))]
pub async fn add_review(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<ProductId>,
    Json(body): Json<ReviewRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    if !(1..=5).contains(&body.rating) {
        return Err(AppError::BadRequest(
            "Rating must be between 1 and 5".to_string(),
        ));
    }
    let comment = body.comment.trim();
    if comment.is_empty() {
        return Err(AppError::BadRequest("Comment is required".to_string()));
    }

    ProductRepository::new(state.pool())
        .add_review(id, user.id, &user.username, body.rating, comment)
        .await
        .map_err(map_not_found)?;

    Ok((StatusCode::CREATED, Json(json!({ "message": "Review added" }))))
}

// =============================================================================
// Admin
// =============================================================================

/// `POST /api/products` (admin).
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Json(body): Json<ProductInput>,
) -> Result<(StatusCode, Json<Product>)> {
    body.validate().map_err(AppError::BadRequest)?;
    let product = ProductRepository::new(state.pool()).create(&body).await?;
    tracing::info!(product_id = %product.id, "Product created");
    Ok((StatusCode::CREATED, Json(product)))
}

/// `PUT /api/products/{id}` (admin).
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Path(id): Path<ProductId>,
    Json(body): Json<ProductInput>,
) -> Result<Json<Product>> {
    body.validate().map_err(AppError::BadRequest)?;
    let product = ProductRepository::new(state.pool())
        .update(id, &body)
        .await
        .map_err(map_not_found)?;
    Ok(Json(product))
}

/// `DELETE /api/products/{id}` (admin).
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>> {
    let product = ProductRepository::new(state.pool())
        .delete(id)
        .await
        .map_err(map_not_found)?;
    tracing::info!(product_id = %id, "Product deleted");
    Ok(Json(product))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(0), 1);
        assert_eq!(page_count(6), 1);
        assert_eq!(page_count(7), 2);
        assert_eq!(page_count(13), 3);
    }

    #[test]
    fn test_price_range() {
        let empty = FilterRequest::default();
        assert_eq!(empty.price_range().unwrap(), None);

        let ok = FilterRequest {
            checked: Vec::new(),
            radio: vec![Decimal::ZERO, Decimal::ONE_HUNDRED],
        };
        assert_eq!(
            ok.price_range().unwrap(),
            Some((Decimal::ZERO, Decimal::ONE_HUNDRED))
        );

        let inverted = FilterRequest {
            checked: Vec::new(),
            radio: vec![Decimal::TEN, Decimal::ONE],
        };
        assert!(inverted.price_range().is_err());

        let single = FilterRequest {
            checked: Vec::new(),
            radio: vec![Decimal::TEN],
        };
        assert!(single.price_range().is_err());
    }

    #[test]
    fn test_filter_request_accepts_numbers() {
        let body: FilterRequest =
            serde_json::from_str(r#"{"checked": [1, 2], "radio": [0, 49.99]}"#).unwrap();
        assert_eq!(body.checked, vec![CategoryId::new(1), CategoryId::new(2)]);
        assert_eq!(body.radio[1].to_string(), "49.99");
    }
}
