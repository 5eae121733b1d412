//! Template attachment storage.
//!
//! Two backends:
//! - an S3-compatible bucket, written with a path-style `PUT` signed with
//!   AWS Signature Version 4;
//! - a hosted upload API that takes multipart form posts.
//!
//! Both accept the same file types and size limit.

use std::sync::Arc;

use axum::body::Bytes;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{info, instrument};
use url::Url;

use crate::config::{S3Config, UploadApiConfig};

/// Largest accepted upload.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Accepted content types: images, PDF, Word and Excel.
pub const ALLOWED_CONTENT_TYPES: [&str; 10] = [
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/webp",
    "image/gif",
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
];

const SIGNING_ALGORITHM: &str = "AWS4-HMAC-SHA256";
const SIGNED_HEADERS: &str = "content-type;host;x-amz-content-sha256;x-amz-date";
const S3_SERVICE: &str = "s3";

/// Errors that can occur when storing an attachment.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The upload was larger than [`MAX_UPLOAD_BYTES`].
    #[error("File size must be less than 10MB (got {size} bytes)")]
    TooLarge { size: usize },

    /// The content type is not accepted.
    #[error("Invalid file type {0}. Allowed: images, PDF, Word, Excel")]
    UnsupportedType(String),

    /// The endpoint URL is unusable.
    #[error("Invalid storage endpoint: {0}")]
    Endpoint(String),

    /// Request signing failed.
    #[error("Signing error: {0}")]
    Signing(String),

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The storage backend returned an error response.
    #[error("Upload failed: {status} - {message}")]
    Upload { status: u16, message: String },

    /// The upload API answered without a stored file.
    #[error("Upload rejected: {0}")]
    Rejected(String),
}

/// A file received from a client.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl UploadFile {
    /// Check size and content type.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::TooLarge` or `StorageError::UnsupportedType`.
    pub fn validate(&self) -> Result<(), StorageError> {
        if self.bytes.len() > MAX_UPLOAD_BYTES {
            return Err(StorageError::TooLarge {
                size: self.bytes.len(),
            });
        }
        if !ALLOWED_CONTENT_TYPES.contains(&self.content_type.as_str()) {
            return Err(StorageError::UnsupportedType(self.content_type.clone()));
        }
        Ok(())
    }
}

/// A stored file, as returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredFile {
    pub url: String,
    pub filename: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub content_type: String,
}

/// Replace every character outside `[A-Za-z0-9.-]` with `_`.
#[must_use]
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Object key `"{unix_millis}-{sanitized_name}"`.
#[must_use]
pub fn object_key(now: DateTime<Utc>, file_name: &str) -> String {
    format!("{}-{}", now.timestamp_millis(), sanitize_file_name(file_name))
}

// =============================================================================
// SigV4
// =============================================================================

/// Headers that authorize one signed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    pub authorization: String,
    pub amz_date: String,
    pub payload_hash: String,
}

/// AWS Signature Version 4 signer for single-chunk S3 uploads.
pub struct SigV4Signer<'a> {
    access_key: &'a str,
    secret_key: &'a str,
    region: &'a str,
}

impl<'a> SigV4Signer<'a> {
    #[must_use]
    pub const fn new(access_key: &'a str, secret_key: &'a str, region: &'a str) -> Self {
        Self {
            access_key,
            secret_key,
            region,
        }
    }

    /// Sign a `PUT` of `payload` to `path` on `host`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Signing` if the HMAC cannot be keyed.
    pub fn sign_put(
        &self,
        host: &str,
        path: &str,
        content_type: &str,
        payload: &[u8],
        now: DateTime<Utc>,
    ) -> Result<SignedRequest, StorageError> {
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date_stamp = now.format("%Y%m%d").to_string();
        let payload_hash = hex::encode(Sha256::digest(payload));

        let canonical = canonical_request("PUT", path, content_type, host, &payload_hash, &amz_date);
        let scope = format!("{date_stamp}/{}/{S3_SERVICE}/aws4_request", self.region);
        let string_to_sign = format!(
            "{SIGNING_ALGORITHM}\n{amz_date}\n{scope}\n{}",
            hex::encode(Sha256::digest(canonical.as_bytes()))
        );

        let k_date = hmac_sha256(
            format!("AWS4{}", self.secret_key).as_bytes(),
            date_stamp.as_bytes(),
        )?;
        let k_region = hmac_sha256(&k_date, self.region.as_bytes())?;
        let k_service = hmac_sha256(&k_region, S3_SERVICE.as_bytes())?;
        let k_signing = hmac_sha256(&k_service, b"aws4_request")?;
        let signature = hex::encode(hmac_sha256(&k_signing, string_to_sign.as_bytes())?);

        Ok(SignedRequest {
            authorization: format!(
                "{SIGNING_ALGORITHM} Credential={}/{scope}, SignedHeaders={SIGNED_HEADERS}, Signature={signature}",
                self.access_key
            ),
            amz_date,
            payload_hash,
        })
    }
}

fn canonical_request(
    method: &str,
    path: &str,
    content_type: &str,
    host: &str,
    payload_hash: &str,
    amz_date: &str,
) -> String {
    format!(
        "{method}\n{path}\n\n\
         content-type:{content_type}\nhost:{host}\n\
         x-amz-content-sha256:{payload_hash}\nx-amz-date:{amz_date}\n\
         \n{SIGNED_HEADERS}\n{payload_hash}"
    )
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>, StorageError> {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(key).map_err(|e| StorageError::Signing(e.to_string()))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

// =============================================================================
// S3 backend
// =============================================================================

/// Uploads attachments to an S3-compatible bucket.
#[derive(Clone)]
pub struct S3Uploader {
    inner: Arc<S3UploaderInner>,
}

struct S3UploaderInner {
    client: reqwest::Client,
    endpoint: String,
    /// `host[:port]` as sent in the `Host` header.
    host: String,
    bucket: String,
    access_key: String,
    secret_key: SecretString,
    region: String,
}

impl S3Uploader {
    /// Create an uploader.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Endpoint` if the endpoint has no host.
    pub fn new(config: &S3Config, client: reqwest::Client) -> Result<Self, StorageError> {
        let host = endpoint_host(&config.endpoint)?;
        Ok(Self {
            inner: Arc::new(S3UploaderInner {
                client,
                endpoint: config.endpoint.clone(),
                host,
                bucket: config.bucket.clone(),
                access_key: config.access_key.clone(),
                secret_key: config.secret_key.clone(),
                region: config.region.clone(),
            }),
        })
    }

    /// Validate and store a file.
    ///
    /// # Errors
    ///
    /// Returns a validation error, or `StorageError::Upload` if the bucket
    /// rejects the `PUT`.
    #[instrument(skip(self, file), fields(file_name = %file.file_name, size = file.bytes.len()))]
    pub async fn upload(&self, file: UploadFile) -> Result<StoredFile, StorageError> {
        file.validate()?;
        let inner = &self.inner;

        let key = object_key(Utc::now(), &file.file_name);
        let path = format!("/{}/{key}", inner.bucket);
        let signed = SigV4Signer::new(
            &inner.access_key,
            inner.secret_key.expose_secret(),
            &inner.region,
        )
        .sign_put(
            &inner.host,
            &path,
            &file.content_type,
            &file.bytes,
            Utc::now(),
        )?;

        let url = format!("{}{path}", inner.endpoint);
        let size = file.bytes.len() as u64;
        let response = inner
            .client
            .put(&url)
            .header(reqwest::header::CONTENT_TYPE, &file.content_type)
            .header("x-amz-content-sha256", &signed.payload_hash)
            .header("x-amz-date", &signed.amz_date)
            .header(reqwest::header::AUTHORIZATION, &signed.authorization)
            .body(file.bytes)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(StorageError::Upload {
                status: status.as_u16(),
                message,
            });
        }

        info!(key = %key, "Attachment stored in bucket");
        Ok(StoredFile {
            url,
            filename: file.file_name,
            size,
            content_type: file.content_type,
        })
    }
}

fn endpoint_host(endpoint: &str) -> Result<String, StorageError> {
    let url = Url::parse(endpoint).map_err(|e| StorageError::Endpoint(e.to_string()))?;
    let host = url
        .host_str()
        .ok_or_else(|| StorageError::Endpoint(format!("{endpoint} has no host")))?;
    Ok(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

// =============================================================================
// Upload API backend
// =============================================================================

/// Uploads attachments through the hosted upload API.
#[derive(Clone)]
pub struct UploadApiClient {
    inner: Arc<UploadApiClientInner>,
}

struct UploadApiClientInner {
    client: reqwest::Client,
    api_url: String,
    base_url: String,
    api_key: SecretString,
    project: String,
}

#[derive(Debug, Deserialize)]
struct UploadApiResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    files: Vec<UploadApiFile>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadApiFile {
    filename: String,
    original_filename: Option<String>,
    #[serde(rename = "media_url")]
    media_url: Option<String>,
    size: Option<u64>,
    mimetype: Option<String>,
}

impl UploadApiClient {
    #[must_use]
    pub fn new(config: &UploadApiConfig, client: reqwest::Client) -> Self {
        Self {
            inner: Arc::new(UploadApiClientInner {
                client,
                api_url: config.api_url.clone(),
                base_url: config.base_url.trim_end_matches('/').to_string(),
                api_key: config.api_key.clone(),
                project: config.project.clone(),
            }),
        }
    }

    /// Validate and store a file.
    ///
    /// # Errors
    ///
    /// Returns a validation error, a transport error, or
    /// `StorageError::Rejected` when the API stores nothing.
    #[instrument(skip(self, file), fields(file_name = %file.file_name, size = file.bytes.len()))]
    pub async fn upload(&self, file: UploadFile) -> Result<StoredFile, StorageError> {
        file.validate()?;
        let inner = &self.inner;
        let fallback_size = file.bytes.len() as u64;

        let part = reqwest::multipart::Part::bytes(file.bytes.to_vec())
            .file_name(file.file_name.clone())
            .mime_str(&file.content_type)?;
        let form = reqwest::multipart::Form::new()
            .text("projectName", inner.project.clone())
            .part("files", part);

        let response = inner
            .client
            .post(&inner.api_url)
            .header("X-API-Key", inner.api_key.expose_secret())
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(StorageError::Upload {
                status: status.as_u16(),
                message,
            });
        }

        let body: UploadApiResponse = response.json().await?;
        let stored = body
            .success
            .then(|| body.files.into_iter().next())
            .flatten()
            .ok_or_else(|| {
                StorageError::Rejected(body.error.unwrap_or_else(|| "Upload failed".to_string()))
            })?;

        let url = public_url(&inner.base_url, &inner.project, &stored);
        info!(url = %url, "Attachment stored via upload API");
        Ok(StoredFile {
            url,
            filename: stored
                .original_filename
                .unwrap_or_else(|| stored.filename.clone()),
            size: stored.size.unwrap_or(fallback_size),
            content_type: stored.mimetype.unwrap_or(file.content_type),
        })
    }
}

fn public_url(base_url: &str, project: &str, file: &UploadApiFile) -> String {
    match &file.media_url {
        Some(media_url) if !media_url.is_empty() => format!("{base_url}{media_url}"),
        _ => format!("{base_url}/api/images/{project}/{}", file.filename),
    }
}
