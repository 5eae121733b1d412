//! Seed the database with a test client.
//!
//! The test client (`place_id = "test-client"`) gives outreach a safe
//! recipient: point its email at your own inbox and send templates to it.

use clients_finder_core::EmailAddress;
use clients_finder_server::db::{ClientRepository, InsertOutcome};
use clients_finder_server::models::NewClient;

use super::{CommandError, connect};

/// `place_id` of the seeded client.
pub const TEST_PLACE_ID: &str = "test-client";

/// Fields of the seeded client.
#[must_use]
pub fn test_client_record(email: &EmailAddress) -> NewClient {
    NewClient {
        place_id: TEST_PLACE_ID.to_string(),
        name: "Test Client".to_string(),
        category: Some("Testing".to_string()),
        address: "123 Test Street".to_string(),
        street: Some("123 Test Street".to_string()),
        city: Some("Test City".to_string()),
        state: Some("TS".to_string()),
        postcode: Some("12345".to_string()),
        country: Some("Test Country".to_string()),
        country_code: None,
        phone: Some("+1-555-0000".to_string()),
        email: Some(email.to_string()),
        website: Some("https://test.example.com".to_string()),
        latitude: 0.0,
        longitude: 0.0,
        opening_hours: Some("9:00 AM - 5:00 PM".to_string()),
        facilities: Some("Testing Facility".to_string()),
        datasource: Some("Manual Test Entry".to_string()),
    }
}

/// Create the test client unless it already exists.
///
/// # Errors
///
/// Returns an error if no valid email is given or the insert fails.
pub async fn test_client(email: Option<&str>) -> Result<(), CommandError> {
    let email = email
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .ok_or_else(|| {
            CommandError::Invalid("No email given: pass --email or set SEED_TEST_EMAIL".to_string())
        })?;
    let email = EmailAddress::parse(email)
        .map_err(|e| CommandError::Invalid(format!("Invalid email {email}: {e}")))?;

    let (_, pool) = connect().await?;

    match ClientRepository::new(&pool)
        .insert(&test_client_record(&email))
        .await?
    {
        InsertOutcome::Inserted(id) => {
            tracing::info!(client_id = %id, email = %email, "Test client created");
        }
        InsertOutcome::AlreadyExists => tracing::info!("Test client already exists"),
    }
    Ok(())
}
