//! Subcommand implementations.

pub mod ingest;
pub mod migrate;
pub mod seed;

use sqlx::PgPool;
use thiserror::Error;

use clients_finder_server::config::{AppConfig, ConfigError};
use clients_finder_server::db::{self, RepositoryError};

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("{0}")]
    Invalid(String),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid locations file: {0}")]
    Locations(#[from] serde_yaml::Error),

    #[error("Failed to encode report: {0}")]
    Report(#[from] serde_json::Error),
}

/// Load configuration and connect to the database.
async fn connect() -> Result<(AppConfig, PgPool), CommandError> {
    let config = AppConfig::from_env()?;
    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&config.database_url).await?;
    Ok((config, pool))
}
