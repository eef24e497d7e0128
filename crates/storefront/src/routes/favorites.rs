//! Favorite product handlers, stored in the visitor's session.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use tower_sessions::Session;

use bazaar_core::ProductId;
use bazaar_core::favorites::{FavoriteProduct, Favorites};
use bazaar_core::store::SnapshotStore;

use crate::db::ProductRepository;
use crate::error::{AppError, Result};
use crate::state::AppState;
use crate::store::SessionSnapshotStore;

/// Body of `POST /api/favorites`.
#[derive(Debug, Deserialize)]
pub struct FavoriteRequest {
    pub product_id: ProductId,
}

async fn load(store: &SessionSnapshotStore<Favorites>) -> Result<Favorites> {
    Ok(store.load().await?.unwrap_or_default())
}

/// `GET /api/favorites`.
pub async fn list(session: Session) -> Result<Json<Favorites>> {
    let store = SessionSnapshotStore::favorites(session);
    Ok(Json(load(&store).await?))
}

/// `POST /api/favorites` - add a product; already present is a no-op.
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<FavoriteRequest>,
) -> Result<Json<Favorites>> {
    let product = ProductRepository::new(state.pool())
        .get(body.product_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

    let store = SessionSnapshotStore::favorites(session);
    let mut favorites = load(&store).await?;
    let added = favorites.add(FavoriteProduct {
        product_id: product.id,
        name: product.name,
        price: product.price,
        image: product.image,
    });
    if added {
        store.save(&favorites).await?;
    }
    Ok(Json(favorites))
}

/// `DELETE /api/favorites/{product_id}`.
pub async fn remove(
    session: Session,
    Path(product_id): Path<ProductId>,
) -> Result<Json<Favorites>> {
    let store = SessionSnapshotStore::favorites(session);
    let mut favorites = load(&store).await?;
    if favorites.remove(product_id) {
        store.save(&favorites).await?;
    }
    Ok(Json(favorites))
}
