//! User and authentication route handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_sessions::Session;
use tracing::instrument;

use bazaar_core::{Email, UserId};

use crate::db::users::UserUpdate;
use crate::db::{RepositoryError, UserRepository};
use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{RequireAdmin, RequireAuth, clear_current_user, set_current_user};
use crate::models::User;
use crate::services::auth::{AuthService, ProfileChanges};
use crate::state::AppState;

// =============================================================================
// Request Types
// =============================================================================

/// Registration body.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Login body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Profile update body. Omitted fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct ProfileRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Admin update body. Omitted fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct AdminUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub is_admin: Option<bool>,
}

async fn start_session(session: &Session, user: &User) -> Result<()> {
    set_current_user(session, &user.to_current_user()).await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    Ok(())
}

// =============================================================================
// Public
// =============================================================================

/// `POST /api/users` - register and log in.
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<User>)> {
    let user = AuthService::new(state.pool())
        .register(&body.username, &body.email, &body.password)
        .await?;
    start_session(&session, &user).await?;
    tracing::info!(user_id = %user.id, "User registered");
    Ok((StatusCode::CREATED, Json(user)))
}

/// `POST /api/users/auth` - log in.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<LoginRequest>,
) -> Result<Json<User>> {
    let user = AuthService::new(state.pool())
        .login(&body.email, &body.password)
        .await?;
    start_session(&session, &user).await?;
    tracing::info!(user_id = %user.id, "User logged in");
    Ok(Json(user))
}

/// `POST /api/users/logout`.
///
/// Only the identity is dropped; cart and favorites stay with the session.
pub async fn logout(session: Session) -> Result<Json<Value>> {
    clear_current_user(&session).await?;
    clear_sentry_user();
    Ok(Json(json!({ "message": "Logged out successfully" })))
}

// =============================================================================
// Profile
// =============================================================================

/// `GET /api/users/profile`.
pub async fn profile(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
) -> Result<Json<User>> {
    let user = AuthService::new(state.pool()).get_user(current.id).await?;
    Ok(Json(user))
}

/// `PUT /api/users/profile`.
#[instrument(skip_all, fields(user_id = %current.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(current): RequireAuth,
    Json(body): Json<ProfileRequest>,
) -> Result<Json<User>> {
    let changes = ProfileChanges {
        username: body.username.as_deref(),
        email: body.email.as_deref(),
        password: body.password.as_deref(),
    };
    let user = AuthService::new(state.pool())
        .update_profile(current.id, &changes)
        .await?;
    set_current_user(&session, &user.to_current_user()).await?;
    Ok(Json(user))
}

// =============================================================================
// Admin
// =============================================================================

/// `GET /api/users` (admin).
pub async fn list(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
) -> Result<Json<Vec<User>>> {
    let users = UserRepository::new(state.pool()).list().await?;
    Ok(Json(users))
}

/// `GET /api/users/{id}` (admin).
pub async fn show(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Path(id): Path<UserId>,
) -> Result<Json<User>> {
    let user = UserRepository::new(state.pool())
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    Ok(Json(user))
}

/// `PUT /api/users/{id}` (admin).
#[instrument(skip_all, fields(admin_id = %admin.id, %id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<UserId>,
    Json(body): Json<AdminUserRequest>,
) -> Result<Json<User>> {
    let username = body.username.as_deref().map(str::trim);
    if username.is_some_and(str::is_empty) {
        return Err(AppError::BadRequest("Username is required".to_string()));
    }
    let email = body
        .email
        .as_deref()
        .map(Email::parse)
        .transpose()
        .map_err(|e| AppError::BadRequest(format!("Invalid email address: {e}")))?;

    let changes = UserUpdate {
        username,
        email: email.as_ref(),
        password_hash: None,
        is_admin: body.is_admin,
    };
    let user = UserRepository::new(state.pool())
        .update(id, &changes)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => {
                AppError::NotFound("User not found".to_string())
            }
            other => other.into(),
        })?;
    Ok(Json(user))
}

/// `DELETE /api/users/{id}` (admin). Admin accounts cannot be deleted.
#[instrument(skip_all, fields(admin_id = %admin.id, %id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<UserId>,
) -> Result<Json<Value>> {
    let users = UserRepository::new(state.pool());
    let user = users
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    if user.is_admin {
        return Err(AppError::BadRequest("Cannot delete admin user".to_string()));
    }

    users.delete(id).await?;
    tracing::info!(user_id = %id, "User deleted");
    Ok(Json(json!({ "message": "User removed" })))
}
