//! Places ingestion and geocoding handlers.

use axum::{
    Router,
    extract::State,
    routing::{get, post},
};
use serde::{Deserialize, Deserializer};

use crate::error::AppError;
use crate::extract::{Json, Query};
use crate::services::ingestion::{
    self, DEFAULT_CATEGORIES, DEFAULT_MAX_PAGES, DEFAULT_PAGE_SIZE, DEFAULT_RADIUS_M,
    IngestionOptions, IngestionReport, SeedLocation, default_locations,
};
use crate::services::GeocodeResult;
use crate::services::places::MAX_PAGE_SIZE;
use crate::state::AppState;

/// Build the ingestion router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/clients/auto-fetch", post(auto_fetch))
        .route("/api/clients/search", get(search_area))
        .route("/api/clients/geocode", post(geocode))
}

/// Body of an auto-fetch run. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AutoFetchRequest {
    /// Radius in meters, as a number or numeric string.
    #[serde(deserialize_with = "lenient_u32")]
    pub radius: Option<u32>,
    pub batch_size: Option<u32>,
    pub max_batches_per_category: Option<u32>,
    /// Fetch one category instead of the default set.
    pub category: Option<String>,
    /// `false` searches around the first seed city only.
    pub use_multiple_locations: Option<bool>,
}

impl AutoFetchRequest {
    fn into_options(self) -> IngestionOptions {
        let categories = match self.category.as_deref().map(str::trim) {
            Some(category) if !category.is_empty() => vec![category.to_string()],
            _ => DEFAULT_CATEGORIES.iter().map(ToString::to_string).collect(),
        };

        let mut locations = default_locations();
        if !self.use_multiple_locations.unwrap_or(true) {
            locations.truncate(1);
        }

        IngestionOptions {
            categories,
            locations,
            radius_m: self.radius.unwrap_or(DEFAULT_RADIUS_M),
            page_size: self.batch_size.unwrap_or(DEFAULT_PAGE_SIZE),
            max_pages: self.max_batches_per_category.unwrap_or(DEFAULT_MAX_PAGES),
            ..IngestionOptions::default()
        }
    }
}

/// Accept `25000` as well as `"25000"`.
fn lenient_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(u32),
        Text(String),
    }

    match Option::<NumberOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrString::Number(n)) => Ok(Some(n)),
        Some(NumberOrString::Text(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// Run a multi-location ingestion and report what was stored.
#[tracing::instrument(skip(state, body))]
async fn auto_fetch(
    State(state): State<AppState>,
    body: Option<Json<AutoFetchRequest>>,
) -> Result<Json<IngestionReport>, AppError> {
    let geoapify = state.geoapify()?;
    let options = body.map(|Json(b)| b).unwrap_or_default().into_options();

    let report = ingestion::run_with_geoapify(geoapify, state.pool(), &options).await;
    Ok(Json(report))
}

/// Single-center search parameters.
#[derive(Debug, Deserialize)]
pub struct AreaSearchQuery {
    pub lat: f64,
    pub lon: f64,
    pub radius: Option<u32>,
    pub category: String,
    pub limit: Option<u32>,
}

impl AreaSearchQuery {
    fn into_options(self) -> Result<IngestionOptions, AppError> {
        let category = self.category.trim();
        if category.is_empty() {
            return Err(AppError::BadRequest("Missing required field: category".to_string()));
        }
        if !(-90.0..=90.0).contains(&self.lat) || !(-180.0..=180.0).contains(&self.lon) {
            return Err(AppError::BadRequest("Coordinates out of range".to_string()));
        }

        let limit = self.limit.unwrap_or(DEFAULT_PAGE_SIZE).max(1);
        let page_size = limit.min(MAX_PAGE_SIZE);

        Ok(IngestionOptions {
            categories: vec![category.to_string()],
            locations: vec![SeedLocation {
                name: format!("{:.4},{:.4}", self.lat, self.lon),
                lat: self.lat,
                lon: self.lon,
            }],
            radius_m: self.radius.unwrap_or(DEFAULT_RADIUS_M),
            page_size,
            max_pages: limit.div_ceil(page_size),
            ..IngestionOptions::default()
        })
    }
}

/// Ingest one category around a single point.
#[tracing::instrument(skip(state))]
async fn search_area(
    State(state): State<AppState>,
    Query(query): Query<AreaSearchQuery>,
) -> Result<Json<IngestionReport>, AppError> {
    let geoapify = state.geoapify()?;
    let options = query.into_options()?;

    let report = ingestion::run_with_geoapify(geoapify, state.pool(), &options).await;
    Ok(Json(report))
}

#[derive(Debug, Deserialize)]
pub struct GeocodeRequest {
    pub address: Option<String>,
}

/// Resolve an address to coordinates.
async fn geocode(
    State(state): State<AppState>,
    Json(body): Json<GeocodeRequest>,
) -> Result<Json<GeocodeResult>, AppError> {
    let address = body
        .address
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .ok_or_else(|| AppError::BadRequest("Address is required".to_string()))?;

    state
        .geoapify()?
        .geocode(address)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("Address"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_fetch_defaults() {
        let options = AutoFetchRequest::default().into_options();
        assert_eq!(options, IngestionOptions::default());
    }

    #[test]
    fn test_auto_fetch_overrides() {
        let req: AutoFetchRequest = serde_json::from_value(serde_json::json!({
            "radius": "5000",
            "batchSize": 50,
            "maxBatchesPerCategory": 2,
            "category": "accommodation.hotel",
            "useMultipleLocations": false
        }))
        .unwrap();
        let options = req.into_options();

        assert_eq!(options.radius_m, 5000);
        assert_eq!(options.page_size, 50);
        assert_eq!(options.max_pages, 2);
        assert_eq!(options.categories, vec!["accommodation.hotel".to_string()]);
        assert_eq!(options.locations.len(), 1);
        assert_eq!(options.locations[0].name, "Kathmandu");
    }

    #[test]
    fn test_auto_fetch_rejects_non_numeric_radius() {
        let parsed: Result<AutoFetchRequest, _> =
            serde_json::from_value(serde_json::json!({ "radius": "far" }));
        assert!(parsed.is_err());
    }

    #[test]
    fn test_area_search_splits_large_limits_into_pages() {
        let query = AreaSearchQuery {
            lat: 27.7172,
            lon: 85.324,
            radius: Some(3000),
            category: "catering.cafe".to_string(),
            limit: Some(1200),
        };
        let options = query.into_options().unwrap();
        assert_eq!(options.page_size, 500);
        assert_eq!(options.max_pages, 3);
        assert_eq!(options.radius_m, 3000);
        assert_eq!(options.locations.len(), 1);
    }

    #[test]
    fn test_area_search_small_limit_is_one_page() {
        let query = AreaSearchQuery {
            lat: 27.7172,
            lon: 85.324,
            radius: None,
            category: "catering.cafe".to_string(),
            limit: Some(0),
        };
        let options = query.into_options().unwrap();
        assert_eq!(options.page_size, 1);
        assert_eq!(options.max_pages, 1);
    }

    #[test]
    fn test_area_search_validates_input() {
        let blank = AreaSearchQuery {
            lat: 27.7,
            lon: 85.3,
            radius: None,
            category: "  ".to_string(),
            limit: None,
        };
        assert!(blank.into_options().is_err());

        let off_globe = AreaSearchQuery {
            lat: 127.7,
            lon: 85.3,
            radius: None,
            category: "catering.cafe".to_string(),
            limit: None,
        };
        assert!(off_globe.into_options().is_err());
    }
}
