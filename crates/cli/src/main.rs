//! Clients Finder CLI - migrations, ingestion and seeding.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! cf-cli migrate
//!
//! # Ingest every default category around every seed city
//! cf-cli ingest
//!
//! # Ingest hotels around Kathmandu only
//! cf-cli ingest --category accommodation.hotel --single-location
//!
//! # Ingest around custom centers
//! cf-cli ingest --locations locations.yaml
//!
//! # Create the test client used for outreach dry runs
//! cf-cli seed --email me@example.com
//! ```
//!
//! # Environment Variables
//!
//! - `CRM_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string
//! - `GEOAPIFY_API_KEY` - required by `ingest`
//! - `SEED_TEST_EMAIL` - default address for `seed`

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "cf-cli")]
#[command(author, version, about = "Clients Finder CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Import businesses from the Geoapify places API
    Ingest(IngestArgs),
    /// Create the test client if it does not exist
    Seed {
        /// Email of the test client (falls back to `SEED_TEST_EMAIL`)
        #[arg(short, long)]
        email: Option<String>,
    },
}

#[derive(Debug, clap::Args)]
pub struct IngestArgs {
    /// Fetch one category instead of the default set
    #[arg(short, long)]
    pub category: Option<String>,

    /// Search around the first seed city only
    #[arg(long)]
    pub single_location: bool,

    /// Search radius in meters
    #[arg(short, long)]
    pub radius: Option<u32>,

    /// Results per request (max 500)
    #[arg(long)]
    pub batch_size: Option<u32>,

    /// Requests per location and category
    #[arg(long)]
    pub max_batches: Option<u32>,

    /// YAML list of `{ name, lat, lon }` search centers
    #[arg(long, value_name = "FILE", conflicts_with = "single_location")]
    pub locations: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "clients_finder_server=info,cf_cli=info".into()),
        )
        .init();

    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Ingest(args) => commands::ingest::run(args).await?,
        Commands::Seed { email } => {
            let email = email.or_else(|| std::env::var("SEED_TEST_EMAIL").ok());
            commands::seed::test_client(email.as_deref()).await?;
        }
    }
    Ok(())
}
