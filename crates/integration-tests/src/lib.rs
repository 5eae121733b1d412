//! Integration tests for Clients Finder.
//!
//! # Running Tests
//!
//! ```bash
//! # In-process router tests (no database needed)
//! cargo test -p clients-finder-integration-tests
//!
//! # Database and HTTP tests
//! export CRM_DATABASE_URL=postgres://localhost/clients_finder_test
//! cargo run -p clients-finder-cli -- migrate
//! cargo run -p clients-finder-server &
//! cargo test -p clients-finder-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `api_validation` - Request validation through the real router, no I/O
//! - `repository` - Repository behavior against `PostgreSQL` (ignored)
//! - `clients_api` - HTTP round trips against a running server (ignored)

use std::collections::HashMap;

use axum::Router;
use clients_finder_core::ClientId;
use clients_finder_server::config::AppConfig;
use clients_finder_server::db::{ClientRepository, InsertOutcome};
use clients_finder_server::models::NewClient;
use clients_finder_server::app::app;
use clients_finder_server::state::AppState;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// Base URL of a running server (configurable via environment).
#[must_use]
pub fn base_url() -> String {
    std::env::var("CRM_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// Build the API router with no integrations configured.
///
/// The pool connects lazily, so handlers that fail validation never touch a
/// database.
///
/// # Panics
///
/// Panics if the state cannot be built.
#[must_use]
pub fn offline_app() -> Router {
    offline_app_with(&[])
}

/// Build the API router from explicit configuration variables.
///
/// # Panics
///
/// Panics if the configuration or state cannot be built.
#[must_use]
pub fn offline_app_with(vars: &[(&str, &str)]) -> Router {
    let mut env: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    env.entry("CRM_DATABASE_URL".to_string())
        .or_insert_with(|| "postgres://localhost/clients_finder_offline".to_string());

    let config = AppConfig::from_lookup(|key| env.get(key).cloned()).expect("config");
    let pool = PgPoolOptions::new()
        .connect_lazy(&env["CRM_DATABASE_URL"])
        .expect("lazy pool");
    let state = AppState::new(&config, pool).expect("state");

    app(state)
}

/// Connect to the test database named by `CRM_DATABASE_URL`.
///
/// # Panics
///
/// Panics if the variable is missing or the database is unreachable.
pub async fn test_pool() -> PgPool {
    let url = std::env::var("CRM_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .expect("CRM_DATABASE_URL must be set for database tests");
    PgPool::connect(&url).await.expect("connect to test database")
}

/// A client with a unique `place_id`.
#[must_use]
pub fn sample_client(name: &str) -> NewClient {
    NewClient {
        place_id: format!("it-{}", uuid::Uuid::new_v4()),
        name: name.to_string(),
        category: Some("catering.cafe".to_string()),
        address: format!("{name}, Thamel, Kathmandu, Nepal"),
        city: Some("Kathmandu".to_string()),
        country: Some("Nepal".to_string()),
        country_code: Some("np".to_string()),
        latitude: 27.7154,
        longitude: 85.3123,
        datasource: Some("integration-test".to_string()),
        ..NewClient::default()
    }
}

/// Insert a client and return its id.
///
/// # Panics
///
/// Panics if the insert fails or the `place_id` already exists.
pub async fn insert_client(pool: &PgPool, client: &NewClient) -> ClientId {
    match ClientRepository::new(pool)
        .insert(client)
        .await
        .expect("insert client")
    {
        InsertOutcome::Inserted(id) => id,
        InsertOutcome::AlreadyExists => panic!("place_id {} already exists", client.place_id),
    }
}
