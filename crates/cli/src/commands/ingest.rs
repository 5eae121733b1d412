//! Places ingestion command.
//!
//! Runs the same ingestion as `POST /api/clients/auto-fetch` and prints the
//! report as JSON.
//!
//! # Locations file
//!
//! ```yaml
//! - name: Kathmandu
//!   lat: 27.7172
//!   lon: 85.3240
//! - name: Pokhara
//!   lat: 28.2096
//!   lon: 83.9856
//! ```

use std::path::Path;

use clients_finder_server::services::GeoapifyClient;
use clients_finder_server::services::ingestion::{self, IngestionOptions, SeedLocation};

use super::{CommandError, connect};
use crate::IngestArgs;

/// Build run options from command-line arguments.
///
/// # Errors
///
/// Returns an error if the locations file cannot be read or parsed.
pub fn options(args: &IngestArgs) -> Result<IngestionOptions, CommandError> {
    let mut options = IngestionOptions::default();

    if let Some(category) = args.category.as_deref().map(str::trim) {
        if category.is_empty() {
            return Err(CommandError::Invalid("--category must not be blank".to_string()));
        }
        options.categories = vec![category.to_string()];
    }
    if let Some(path) = &args.locations {
        options.locations = load_locations(path)?;
    } else if args.single_location {
        options.locations.truncate(1);
    }
    if let Some(radius) = args.radius {
        options.radius_m = radius;
    }
    if let Some(batch_size) = args.batch_size {
        options.page_size = batch_size;
    }
    if let Some(max_batches) = args.max_batches {
        options.max_pages = max_batches;
    }

    Ok(options)
}

/// Read search centers from a YAML file.
///
/// # Errors
///
/// Returns an error if the file is unreadable, malformed, or empty.
pub fn load_locations(path: &Path) -> Result<Vec<SeedLocation>, CommandError> {
    let content = std::fs::read_to_string(path).map_err(|source| CommandError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let locations: Vec<SeedLocation> = serde_yaml::from_str(&content)?;
    if locations.is_empty() {
        return Err(CommandError::Invalid(format!(
            "{} lists no locations",
            path.display()
        )));
    }
    Ok(locations)
}

/// Run an ingestion and print its report.
///
/// # Errors
///
/// Returns an error if configuration is incomplete or the database is
/// unreachable. Failed batches are logged and do not fail the command.
pub async fn run(args: IngestArgs) -> Result<(), CommandError> {
    let options = options(&args)?;
    let (config, pool) = connect().await?;

    let geoapify_config = config
        .geoapify
        .as_ref()
        .ok_or_else(|| CommandError::Invalid("GEOAPIFY_API_KEY is not set".to_string()))?;
    let client = GeoapifyClient::new(geoapify_config)
        .map_err(|e| CommandError::Invalid(e.to_string()))?;

    tracing::info!(
        categories = options.categories.len(),
        locations = options.locations.len(),
        radius_m = options.radius_m,
        "Starting ingestion"
    );
    let report = ingestion::run_with_geoapify(&client, &pool, &options).await;

    tracing::info!(
        total_fetched = report.summary.total_fetched,
        new_clients = report.summary.new_clients,
        existing_clients = report.summary.existing_clients,
        "Ingestion complete"
    );

    #[allow(clippy::print_stdout)]
    {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}
