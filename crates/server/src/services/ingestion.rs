//! Places ingestion worker.
//!
//! Pages through the places search for every (category, seed location)
//! pair and stores each result as a `PENDING` client unless its `place_id`
//! is already known. Requests are strictly sequential with a fixed delay
//! between pages.
//!
//! Paging for one location stops when a page is empty, a page is shorter
//! than requested, the per-location page cap is reached, or a request fails.
//! A failed page is logged and the run moves on to the next location.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use super::places::{GeoapifyClient, MAX_PAGE_SIZE, PlaceProperties, PlaceQuery, PlacesError};
use crate::db::{ClientRepository, InsertOutcome, RepositoryError};
use crate::models::NewClient;

/// Categories fetched when a run does not name one.
pub const DEFAULT_CATEGORIES: [&str; 10] = [
    "education.school",
    "catering.restaurant",
    "healthcare.hospital",
    "healthcare.pharmacy",
    "commercial.supermarket",
    "service.beauty",
    "entertainment.cinema",
    "accommodation.hotel",
    "commercial.shopping_mall",
    "sport.fitness",
];

/// Default search radius around each seed location.
pub const DEFAULT_RADIUS_M: u32 = 25_000;
/// Default page size.
pub const DEFAULT_PAGE_SIZE: u32 = 100;
/// Default page cap per location.
pub const DEFAULT_MAX_PAGES: u32 = 5;
/// Default pause between page requests.
pub const DEFAULT_DELAY: Duration = Duration::from_millis(300);

/// A named search center.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedLocation {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

impl SeedLocation {
    fn new(name: &str, lat: f64, lon: f64) -> Self {
        Self {
            name: name.to_string(),
            lat,
            lon,
        }
    }
}

/// Seed cities used when a run does not supply its own.
#[must_use]
pub fn default_locations() -> Vec<SeedLocation> {
    vec![
        SeedLocation::new("Kathmandu", 27.7172, 85.3240),
        SeedLocation::new("Pokhara", 28.2096, 83.9856),
        SeedLocation::new("Lalitpur", 27.6661, 85.3247),
        SeedLocation::new("Biratnagar", 26.4525, 87.2718),
        SeedLocation::new("Bharatpur", 27.6800, 84.4344),
        SeedLocation::new("Birgunj", 27.0099, 84.8797),
        SeedLocation::new("Dharan", 26.8150, 87.2820),
        SeedLocation::new("Butwal", 27.7000, 83.4480),
        SeedLocation::new("Hetauda", 27.4283, 85.0331),
        SeedLocation::new("Janakpur", 26.7288, 85.9242),
    ]
}

/// Parameters of one ingestion run.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestionOptions {
    pub categories: Vec<String>,
    pub locations: Vec<SeedLocation>,
    pub radius_m: u32,
    /// Results per page, clamped to `1..=MAX_PAGE_SIZE`.
    pub page_size: u32,
    pub max_pages: u32,
    pub delay: Duration,
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            categories: DEFAULT_CATEGORIES.iter().map(ToString::to_string).collect(),
            locations: default_locations(),
            radius_m: DEFAULT_RADIUS_M,
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: DEFAULT_MAX_PAGES,
            delay: DEFAULT_DELAY,
        }
    }
}

impl IngestionOptions {
    fn effective_page_size(&self) -> u32 {
        self.page_size.clamp(1, MAX_PAGE_SIZE)
    }
}

/// Per-category outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryStats {
    pub category: String,
    /// Results stored or recognised (`new_clients + existing_clients`).
    pub total_fetched: u64,
    pub new_clients: u64,
    pub existing_clients: u64,
    pub completed: bool,
}

/// Totals across all categories.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionSummary {
    pub total_fetched: u64,
    pub new_clients: u64,
    pub existing_clients: u64,
    pub categories_processed: usize,
}

/// Result of an ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionReport {
    pub stats: Vec<CategoryStats>,
    pub summary: IngestionSummary,
}

/// Supplies pages of place results.
pub trait PlaceSource {
    /// Fetch one page.
    fn fetch_page(
        &self,
        query: &PlaceQuery,
    ) -> impl Future<Output = Result<Vec<PlaceProperties>, PlacesError>> + Send;
}

impl PlaceSource for GeoapifyClient {
    async fn fetch_page(&self, query: &PlaceQuery) -> Result<Vec<PlaceProperties>, PlacesError> {
        self.search_places(query).await
    }
}

/// Persists ingested clients keyed by `place_id`.
pub trait PlaceStore {
    /// Whether a client with this `place_id` is already stored.
    fn exists(&self, place_id: &str) -> impl Future<Output = Result<bool, RepositoryError>> + Send;

    /// Insert a client; a duplicate `place_id` yields [`InsertOutcome::AlreadyExists`].
    fn insert(
        &self,
        client: &NewClient,
    ) -> impl Future<Output = Result<InsertOutcome, RepositoryError>> + Send;
}

impl PlaceStore for ClientRepository<'_> {
    async fn exists(&self, place_id: &str) -> Result<bool, RepositoryError> {
        Ok(self.find_by_place_id(place_id).await?.is_some())
    }

    async fn insert(&self, client: &NewClient) -> Result<InsertOutcome, RepositoryError> {
        ClientRepository::insert(self, client).await
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct PageCounts {
    new_clients: u64,
    existing_clients: u64,
}

impl PageCounts {
    fn add(&mut self, other: Self) {
        self.new_clients += other.new_clients;
        self.existing_clients += other.existing_clients;
    }
}

/// Run ingestion over every configured category and location.
#[instrument(skip_all, fields(
    categories = options.categories.len(),
    locations = options.locations.len(),
    radius_m = options.radius_m,
))]
pub async fn run<S, T>(source: &S, store: &T, options: &IngestionOptions) -> IngestionReport
where
    S: PlaceSource + Sync,
    T: PlaceStore + Sync,
{
    let mut report = IngestionReport::default();

    for category in &options.categories {
        let mut counts = PageCounts::default();
        for location in &options.locations {
            counts.add(ingest_location(source, store, category, location, options).await);
        }

        info!(
            category = %category,
            new_clients = counts.new_clients,
            existing_clients = counts.existing_clients,
            "Category ingestion finished"
        );

        report.stats.push(CategoryStats {
            category: category.clone(),
            total_fetched: counts.new_clients + counts.existing_clients,
            new_clients: counts.new_clients,
            existing_clients: counts.existing_clients,
            completed: true,
        });
        report.summary.new_clients += counts.new_clients;
        report.summary.existing_clients += counts.existing_clients;
    }

    report.summary.total_fetched = report.summary.new_clients + report.summary.existing_clients;
    report.summary.categories_processed = options.categories.len();

    info!(
        total_fetched = report.summary.total_fetched,
        new_clients = report.summary.new_clients,
        "Ingestion run finished"
    );
    report
}

async fn ingest_location<S, T>(
    source: &S,
    store: &T,
    category: &str,
    location: &SeedLocation,
    options: &IngestionOptions,
) -> PageCounts
where
    S: PlaceSource + Sync,
    T: PlaceStore + Sync,
{
    let page_size = options.effective_page_size();
    let mut counts = PageCounts::default();

    for page in 0..options.max_pages {
        if page > 0 && !options.delay.is_zero() {
            tokio::time::sleep(options.delay).await;
        }

        let query = PlaceQuery {
            category: category.to_string(),
            lat: location.lat,
            lon: location.lon,
            radius_m: options.radius_m,
            limit: page_size,
            offset: page * page_size,
        };

        let places = match source.fetch_page(&query).await {
            Ok(places) => places,
            Err(e) => {
                warn!(
                    category,
                    location = %location.name,
                    batch = page + 1,
                    error = %e,
                    "Places batch failed; skipping rest of location"
                );
                break;
            }
        };

        let received = places.len();
        let batch = store_places(store, places, category).await;
        counts.add(batch);

        debug!(
            category,
            location = %location.name,
            batch = page + 1,
            received,
            new_clients = batch.new_clients,
            existing_clients = batch.existing_clients,
            "Stored places batch"
        );

        if received < page_size as usize {
            break;
        }
    }

    counts
}

async fn store_places<T>(store: &T, places: Vec<PlaceProperties>, category: &str) -> PageCounts
where
    T: PlaceStore + Sync,
{
    let mut counts = PageCounts::default();

    for place in places {
        let Some(client) = map_place(place, category) else {
            continue;
        };

        match store.exists(&client.place_id).await {
            Ok(true) => {
                counts.existing_clients += 1;
                continue;
            }
            Ok(false) => {}
            Err(e) => {
                warn!(place_id = %client.place_id, error = %e, "Lookup failed; skipping place");
                continue;
            }
        }

        match store.insert(&client).await {
            Ok(InsertOutcome::Inserted(_)) => counts.new_clients += 1,
            Ok(InsertOutcome::AlreadyExists) => counts.existing_clients += 1,
            Err(e) => {
                warn!(place_id = %client.place_id, error = %e, "Insert failed; skipping place");
            }
        }
    }

    counts
}

/// Map a place result to a new client.
///
/// Returns `None` when the result has no `place_id` or no coordinates.
#[must_use]
pub fn map_place(place: PlaceProperties, requested_category: &str) -> Option<NewClient> {
    let place_id = present(place.place_id.as_deref())?.to_string();
    let latitude = place.lat?;
    let longitude = place.lon?;

    let contact = place.contact.unwrap_or_default();
    let datasource = place.datasource.unwrap_or_default();
    let address_line1 = present(place.address_line1.as_deref());

    let categories = place.categories.join("; ");
    let category = first_present([
        present(Some(categories.as_str())),
        present(Some(requested_category)),
    ]);

    Some(NewClient {
        place_id,
        name: first_present([present(place.name.as_deref()), address_line1])
            .unwrap_or_else(|| "Unknown".to_string()),
        category,
        address: first_present([present(place.formatted.as_deref()), address_line1])
            .unwrap_or_else(|| "Unknown".to_string()),
        street: first_present([present(place.street.as_deref()), address_line1]),
        city: owned(place.city.as_deref()),
        state: owned(place.state.as_deref()),
        postcode: owned(place.postcode.as_deref()),
        country: owned(place.country.as_deref()),
        country_code: owned(place.country_code.as_deref()),
        phone: first_present([
            present(contact.phone.as_deref()),
            present(datasource.raw_str("phone")),
        ]),
        email: first_present([
            present(contact.email.as_deref()),
            present(datasource.raw_str("email")),
        ]),
        website: first_present([
            present(contact.website.as_deref()),
            present(datasource.raw_str("website")),
        ]),
        latitude,
        longitude,
        opening_hours: json_encoded(place.opening_hours.as_ref()),
        facilities: json_encoded(place.facilities.as_ref()),
        datasource: owned(datasource.sourcename.as_deref()),
    })
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn owned(value: Option<&str>) -> Option<String> {
    present(value).map(String::from)
}

fn first_present<const N: usize>(candidates: [Option<&str>; N]) -> Option<String> {
    candidates.into_iter().flatten().next().map(String::from)
}

fn json_encoded(value: Option<&serde_json::Value>) -> Option<String> {
    value
        .filter(|v| !v.is_null())
        .and_then(|v| serde_json::to_string(v).ok())
}

/// Convenience wrapper: ingest with the Geoapify client into `PostgreSQL`.
pub async fn run_with_geoapify(
    client: &GeoapifyClient,
    pool: &sqlx::PgPool,
    options: &IngestionOptions,
) -> IngestionReport {
    run(client, &ClientRepository::new(pool), options).await
}
