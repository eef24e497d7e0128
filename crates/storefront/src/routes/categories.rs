//! Category route handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;

use bazaar_core::CategoryId;

use crate::db::CategoryRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::Category;
use crate::models::category::normalize_category_name;
use crate::state::AppState;

/// Create/rename body.
#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub name: String,
}

fn not_found() -> AppError {
    AppError::NotFound("Category not found".to_string())
}

/// `POST /api/category` (admin).
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Json(body): Json<CategoryRequest>,
) -> Result<(StatusCode, Json<Category>)> {
    let name = normalize_category_name(&body.name).map_err(AppError::BadRequest)?;
    let category = CategoryRepository::new(state.pool()).create(&name).await?;
    tracing::info!(category_id = %category.id, "Category created");
    Ok((StatusCode::CREATED, Json(category)))
}

/// `PUT /api/category/{id}` (admin).
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Path(id): Path<CategoryId>,
    Json(body): Json<CategoryRequest>,
) -> Result<Json<Category>> {
    let name = normalize_category_name(&body.name).map_err(AppError::BadRequest)?;
    let category = CategoryRepository::new(state.pool())
        .update(id, &name)
        .await
        .map_err(|e| match e {
            crate::db::RepositoryError::NotFound => not_found(),
            other => other.into(),
        })?;
    Ok(Json(category))
}

/// `DELETE /api/category/{id}` (admin).
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Path(id): Path<CategoryId>,
) -> Result<Json<Category>> {
    let category = CategoryRepository::new(state.pool())
        .delete(id)
        .await
        .map_err(|e| match e {
            crate::db::RepositoryError::NotFound => not_found(),
            other => other.into(),
        })?;
    tracing::info!(category_id = %id, "Category deleted");
    Ok(Json(category))
}

/// `GET /api/category/categories`.
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    let categories = CategoryRepository::new(state.pool()).list().await?;
    Ok(Json(categories))
}

/// `GET /api/category/{id}`.
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
) -> Result<Json<Category>> {
    CategoryRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(not_found)
}
