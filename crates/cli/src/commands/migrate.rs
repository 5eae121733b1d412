//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! cf-cli migrate
//! ```
//!
//! Migrations live in `crates/server/migrations/` and are embedded in the
//! server library, so the binary needs no source checkout at run time.

use clients_finder_server::db::MIGRATOR;

use super::{CommandError, connect};

/// Apply all pending migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), CommandError> {
    let (_, pool) = connect().await?;

    tracing::info!("Running migrations...");
    MIGRATOR.run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
