//! CLI subcommands.

pub mod admin;
pub mod migrate;
pub mod seed;

use sqlx::PgPool;
use thiserror::Error;

use bazaar_core::EmailError;
use bazaar_storefront::config::{ConfigError, get_database_url};
use bazaar_storefront::db::{RepositoryError, create_pool};
use bazaar_storefront::services::auth::AuthError;

/// Environment variable holding the storefront connection string.
pub const DATABASE_URL_VAR: &str = "BAZAAR_DATABASE_URL";

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Configuration is missing or invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// Account validation failed.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// No user with that email.
    #[error("No user found with email: {0}")]
    UserNotFound(String),

    /// Seed file could not be read.
    #[error("Failed to read seed file: {0}")]
    Io(#[from] std::io::Error),

    /// Seed file is not valid YAML for the catalog format.
    #[error("Invalid seed file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Seed data failed validation.
    #[error("Invalid seed data: {0}")]
    InvalidSeed(String),
}

/// Connect to the storefront database.
async fn connect() -> Result<PgPool, CommandError> {
    dotenvy::dotenv().ok();
    let database_url = get_database_url(DATABASE_URL_VAR)?;

    tracing::info!("Connecting to storefront database...");
    Ok(create_pool(&database_url).await?)
}
