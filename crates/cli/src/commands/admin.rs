//! Admin user management commands.

use bazaar_core::{Email, UserId};
use bazaar_storefront::db::users::UserUpdate;
use bazaar_storefront::db::{RepositoryError, UserRepository};
use bazaar_storefront::services::auth::{AuthError, hash_new_password};

use super::{CommandError, connect};

/// Grant admin rights to an existing user.
///
/// # Errors
///
/// Returns `CommandError::UserNotFound` if no user has that email.
pub async fn promote(email: &str) -> Result<(), CommandError> {
    let email = Email::parse(email)?;
    let pool = connect().await?;

    let promoted = UserRepository::new(&pool).promote(&email).await?;
    if !promoted {
        return Err(CommandError::UserNotFound(email.into_inner()));
    }

    tracing::info!("Promoted {} to admin", email);
    Ok(())
}

/// Create a new admin user.
///
/// # Returns
///
/// The ID of the created user.
///
/// # Errors
///
/// Returns an error if the email or password is invalid, or a user with
/// that email already exists.
pub async fn create_user(
    email: &str,
    username: &str,
    password: &str,
) -> Result<UserId, CommandError> {
    let email = Email::parse(email)?;
    let username = username.trim();
    if username.is_empty() {
        return Err(AuthError::MissingUsername.into());
    }
    let password_hash = hash_new_password(password)?;

    let pool = connect().await?;
    let users = UserRepository::new(&pool);

    let user = users
        .create(username, &email, &password_hash)
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => CommandError::from(AuthError::UserAlreadyExists),
            other => other.into(),
        })?;
    users
        .update(
            user.id,
            &UserUpdate {
                is_admin: Some(true),
                ..UserUpdate::default()
            },
        )
        .await?;

    tracing::info!("Created admin user {} ({})", email, user.id);
    Ok(user.id)
}
