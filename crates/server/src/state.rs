//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::AppConfig;
use crate::error::AppError;
use crate::services::{
    GeoapifyClient, OutreachError, OutreachService, PlacesError, S3Uploader, StorageError,
    UploadApiClient,
};

/// Error building application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("places client: {0}")]
    Places(#[from] PlacesError),
    #[error("outreach: {0}")]
    Outreach(#[from] OutreachError),
    #[error("storage: {0}")]
    Storage(#[from] StorageError),
    #[error("http client: {0}")]
    Http(#[from] reqwest::Error),
}

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. Optional integrations are `None` when their
/// configuration is absent.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    pool: PgPool,
    geoapify: Option<GeoapifyClient>,
    outreach: OutreachService,
    s3: Option<S3Uploader>,
    upload_api: Option<UploadApiClient>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if an integration's client cannot be built.
    pub fn new(config: &AppConfig, pool: PgPool) -> Result<Self, StateError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()?;

        let geoapify = config
            .geoapify
            .as_ref()
            .map(GeoapifyClient::new)
            .transpose()?;
        let outreach = OutreachService::from_config(config)?;
        let s3 = config
            .s3
            .as_ref()
            .map(|c| S3Uploader::new(c, http.clone()))
            .transpose()?;
        let upload_api = config
            .upload_api
            .as_ref()
            .map(|c| UploadApiClient::new(c, http));

        Ok(Self {
            inner: Arc::new(AppStateInner {
                pool,
                geoapify,
                outreach,
                s3,
                upload_api,
            }),
        })
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get the Geoapify client.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotConfigured` without `GEOAPIFY_API_KEY`.
    pub fn geoapify(&self) -> Result<&GeoapifyClient, AppError> {
        self.inner
            .geoapify
            .as_ref()
            .ok_or(AppError::NotConfigured("Geoapify"))
    }

    #[must_use]
    pub fn outreach(&self) -> &OutreachService {
        &self.inner.outreach
    }

    /// Get the S3 uploader.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotConfigured` without the `S3_*` variables.
    pub fn s3(&self) -> Result<&S3Uploader, AppError> {
        self.inner
            .s3
            .as_ref()
            .ok_or(AppError::NotConfigured("S3 storage"))
    }

    /// Get the upload API client.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotConfigured` without `STORAGE_API_KEY`.
    pub fn upload_api(&self) -> Result<&UploadApiClient, AppError> {
        self.inner
            .upload_api
            .as_ref()
            .ok_or(AppError::NotConfigured("Storage API"))
    }
}
