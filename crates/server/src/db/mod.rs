//! Database operations for the CRM `PostgreSQL` store.
//!
//! ## Tables
//!
//! - `clients` - Discovered businesses, unique on `place_id`
//! - `notes` - Free-text notes per client (cascade on client delete)
//! - `email_history` - One row per outreach attempt (cascade on client delete)
//! - `email_templates` - Reusable outreach templates
//! - `custom_target_types` - User-defined template audiences
//!
//! # Migrations
//!
//! Migrations live in `crates/server/migrations/` and are embedded in
//! [`MIGRATOR`]. Run them with:
//! ```bash
//! cargo run -p clients-finder-cli -- migrate
//! ```

pub mod client_filter;
pub mod clients;
pub mod email_history;
pub mod notes;
pub mod target_types;
pub mod templates;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use client_filter::{ClientFilter, ClientQuery};
pub use clients::{ClientRepository, Direction, InsertOutcome};
pub use email_history::EmailHistoryRepository;
pub use notes::NoteRepository;
pub use target_types::TargetTypeRepository;
pub use templates::TemplateRepository;

/// Embedded schema migrations.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., dangling foreign key).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map foreign-key violations to [`RepositoryError::Conflict`].
    pub(crate) fn from_write(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                Self::Conflict(db.message().to_string())
            }
            _ => Self::Database(err),
        }
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
