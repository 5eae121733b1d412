//! Geoapify places and geocoding client.
//!
//! # API Reference
//!
//! - Places: `GET {base}/v2/places?categories=..&filter=circle:lon,lat,radius&limit=..&offset=..`
//! - Geocoding: `GET {base}/v1/geocode/search?text=..`
//! - Authentication: `apiKey` query parameter
//!
//! Both endpoints answer with a `GeoJSON` `FeatureCollection`.
//!
//! Geocoding answers, including misses, are cached for one hour.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::config::GeoapifyConfig;

/// Largest page the places endpoint serves.
pub const MAX_PAGE_SIZE: u32 = 500;

const GEOCODE_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Errors that can occur when calling Geoapify.
#[derive(Debug, Error)]
pub enum PlacesError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("Geoapify API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to build the request URL.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

/// One page request against the places search.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceQuery {
    pub category: String,
    pub lat: f64,
    pub lon: f64,
    /// Search radius in meters.
    pub radius_m: u32,
    pub limit: u32,
    pub offset: u32,
}

#[derive(Debug, Deserialize)]
struct FeatureCollection<P> {
    #[serde(default = "Vec::new")]
    features: Vec<Feature<P>>,
}

#[derive(Debug, Deserialize)]
struct Feature<P> {
    properties: P,
}

/// Properties of one place result. Every field may be missing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlaceProperties {
    pub place_id: Option<String>,
    pub name: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    pub address_line1: Option<String>,
    pub formatted: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postcode: Option<String>,
    pub country: Option<String>,
    pub country_code: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub contact: Option<PlaceContact>,
    pub datasource: Option<PlaceDatasource>,
    pub opening_hours: Option<serde_json::Value>,
    pub facilities: Option<serde_json::Value>,
}

/// Structured contact block.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlaceContact {
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
}

/// Upstream source metadata, including the raw source tags.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlaceDatasource {
    pub sourcename: Option<String>,
    #[serde(default)]
    pub raw: HashMap<String, serde_json::Value>,
}

impl PlaceDatasource {
    /// A raw source tag, if it is a string.
    #[must_use]
    pub fn raw_str(&self, key: &str) -> Option<&str> {
        self.raw.get(key).and_then(serde_json::Value::as_str)
    }
}

#[derive(Debug, Deserialize)]
struct GeocodeProperties {
    lat: Option<f64>,
    lon: Option<f64>,
    formatted: Option<String>,
}

/// A resolved address.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeocodeResult {
    pub lat: f64,
    pub lon: f64,
    pub formatted: String,
}

/// Geoapify API client.
#[derive(Clone)]
pub struct GeoapifyClient {
    inner: Arc<GeoapifyClientInner>,
}

struct GeoapifyClientInner {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    geocode_cache: Cache<String, Option<GeocodeResult>>,
}

impl GeoapifyClient {
    /// Create a new Geoapify client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &GeoapifyConfig) -> Result<Self, PlacesError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        let geocode_cache = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(GEOCODE_CACHE_TTL)
            .build();

        Ok(Self {
            inner: Arc::new(GeoapifyClientInner {
                client,
                api_key: config.api_key.clone(),
                base_url: config.base_url.clone(),
                geocode_cache,
            }),
        })
    }

    /// Fetch one page of places.
    ///
    /// # Errors
    ///
    /// Returns error on transport failure or a non-success response.
    #[tracing::instrument(skip(self, query), fields(category = %query.category, offset = query.offset))]
    pub async fn search_places(
        &self,
        query: &PlaceQuery,
    ) -> Result<Vec<PlaceProperties>, PlacesError> {
        let url = places_url(
            &self.inner.base_url,
            self.inner.api_key.expose_secret(),
            query,
        )?;
        let collection: FeatureCollection<PlaceProperties> = self.get_json(url).await?;
        Ok(collection
            .features
            .into_iter()
            .map(|f| f.properties)
            .collect())
    }

    /// Resolve free-text to coordinates, using the first result.
    ///
    /// # Errors
    ///
    /// Returns error on transport failure or a non-success response.
    #[tracing::instrument(skip(self))]
    pub async fn geocode(&self, text: &str) -> Result<Option<GeocodeResult>, PlacesError> {
        let key = geocode_cache_key(text);
        if let Some(cached) = self.inner.geocode_cache.get(&key).await {
            tracing::debug!("Geocode cache hit");
            return Ok(cached);
        }

        let url = geocode_url(&self.inner.base_url, self.inner.api_key.expose_secret(), text)?;
        let collection: FeatureCollection<GeocodeProperties> = self.get_json(url).await?;

        let result = collection.features.into_iter().find_map(|f| {
            let p = f.properties;
            Some(GeocodeResult {
                lat: p.lat?,
                lon: p.lon?,
                formatted: p.formatted.unwrap_or_else(|| text.to_string()),
            })
        });
        self.inner.geocode_cache.insert(key, result.clone()).await;
        Ok(result)
    }

    /// GET and decode JSON. The URL carries the API key, so it is stripped
    /// from transport errors before they can reach a log line.
    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: Url) -> Result<T, PlacesError> {
        let response = self
            .inner
            .client
            .get(url)
            .send()
            .await
            .map_err(reqwest::Error::without_url)?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PlacesError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await.map_err(reqwest::Error::without_url)?)
    }
}

fn places_url(base_url: &str, api_key: &str, query: &PlaceQuery) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(&format!("{base_url}/v2/places"))?;
    url.query_pairs_mut()
        .append_pair("categories", &query.category)
        .append_pair(
            "filter",
            &format!("circle:{},{},{}", query.lon, query.lat, query.radius_m),
        )
        .append_pair("limit", &query.limit.to_string())
        .append_pair("offset", &query.offset.to_string())
        .append_pair("apiKey", api_key);
    Ok(url)
}

/// Addresses differing only in case or surrounding whitespace share an entry.
fn geocode_cache_key(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn geocode_url(base_url: &str, api_key: &str, text: &str) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(&format!("{base_url}/v1/geocode/search"))?;
    url.query_pairs_mut()
        .append_pair("text", text)
        .append_pair("apiKey", api_key);
    Ok(url)
}
