//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `CRM_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! ## Optional
//! - `CRM_HOST` - Bind address (default: 127.0.0.1)
//! - `CRM_PORT` - Listen port (default: 3000)
//! - `SENTRY_DSN`, `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`, `SENTRY_TRACES_SAMPLE_RATE`
//!
//! ## Optional (Geoapify - enables ingestion and geocoding)
//! - `GEOAPIFY_API_KEY` - Geoapify API key
//! - `GEOAPIFY_BASE_URL` - API root (default: <https://api.geoapify.com>)
//!
//! ## Optional (SMTP - enabled when `SMTP_HOST` is set)
//! - `SMTP_HOST`, `SMTP_USER`, `SMTP_PASSWORD`
//! - `SMTP_PORT` - default 587
//! - `SMTP_FROM` - sender address (default: `SMTP_USER`)
//! - `SMTP_SECURE` - `true` for implicit TLS instead of STARTTLS
//!
//! ## Optional (Brevo - enabled when `BREVO_API_KEY` is set)
//! - `BREVO_API_KEY`, `BREVO_SENDER_EMAIL`
//! - `BREVO_SENDER_NAME` - default "Clients Finder"
//!
//! ## Optional (S3-compatible attachment bucket)
//! - `S3_ENDPOINT`, `S3_BUCKET`, `S3_ACCESS_KEY`, `S3_SECRET_KEY`
//! - `S3_REGION` - default us-east-1
//!
//! ## Optional (template upload API - enabled when `STORAGE_API_KEY` is set)
//! - `STORAGE_API_KEY`, `STORAGE_API_URL`, `STORAGE_BASE_URL`
//! - `STORAGE_PROJECT` - default clients-finder-templates
//!
//! ## Optional (TLS)
//! - `CRM_TLS_CERT` - PEM-encoded certificate chain
//! - `CRM_TLS_KEY` - PEM-encoded private key

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use secrecy::SecretString;
use thiserror::Error;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.0;
const DEFAULT_GEOAPIFY_BASE_URL: &str = "https://api.geoapify.com";
const DEFAULT_BREVO_SENDER_NAME: &str = "Clients Finder";
const DEFAULT_S3_REGION: &str = "us-east-1";
const DEFAULT_STORAGE_PROJECT: &str = "clients-finder-templates";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "your_",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "insert",
    "put-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Places provider (optional - ingestion and geocoding return 503 without it)
    pub geoapify: Option<GeoapifyConfig>,
    /// SMTP transport (optional)
    pub smtp: Option<SmtpConfig>,
    /// Brevo transactional email API (optional)
    pub brevo: Option<BrevoConfig>,
    /// S3-compatible bucket for `/api/upload` (optional)
    pub s3: Option<S3Config>,
    /// Proprietary upload API for template attachments (optional)
    pub upload_api: Option<UploadApiConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
    /// TLS configuration for HTTPS (optional)
    pub tls: Option<TlsConfig>,
}

/// Geoapify API configuration.
#[derive(Clone)]
pub struct GeoapifyConfig {
    pub api_key: SecretString,
    /// API root without trailing slash
    pub base_url: String,
}

impl std::fmt::Debug for GeoapifyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeoapifyConfig")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// SMTP configuration.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    /// Email sender address (From header)
    pub from_address: String,
    /// Implicit TLS (`SMTP_SECURE=true`) instead of STARTTLS
    pub secure: bool,
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .field("secure", &self.secure)
            .finish()
    }
}

/// Brevo transactional email configuration.
#[derive(Clone)]
pub struct BrevoConfig {
    pub api_key: SecretString,
    pub sender_email: String,
    pub sender_name: String,
}

impl std::fmt::Debug for BrevoConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrevoConfig")
            .field("api_key", &"[REDACTED]")
            .field("sender_email", &self.sender_email)
            .field("sender_name", &self.sender_name)
            .finish()
    }
}

/// S3-compatible object store configuration.
#[derive(Clone)]
pub struct S3Config {
    /// Endpoint URL, e.g. `https://storage.example.net`
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: SecretString,
    pub region: String,
}

impl std::fmt::Debug for S3Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Config")
            .field("endpoint", &self.endpoint)
            .field("bucket", &self.bucket)
            .field("access_key", &self.access_key)
            .field("secret_key", &"[REDACTED]")
            .field("region", &self.region)
            .finish()
    }
}

/// Upload API configuration for template attachments.
#[derive(Clone)]
pub struct UploadApiConfig {
    /// Upload endpoint receiving the multipart POST
    pub api_url: String,
    /// Public root that returned media paths are joined onto
    pub base_url: String,
    pub api_key: SecretString,
    pub project: String,
}

impl std::fmt::Debug for UploadApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadApiConfig")
            .field("api_url", &self.api_url)
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("project", &self.project)
            .finish()
    }
}

/// TLS configuration for HTTPS.
#[derive(Clone)]
pub struct TlsConfig {
    /// PEM-encoded certificate chain
    pub cert_pem: String,
    /// PEM-encoded private key
    pub key_pem: SecretString,
}

impl std::fmt::Debug for TlsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsConfig")
            .field("cert_pem", &"[CERTIFICATE]")
            .field("key_pem", &"[REDACTED]")
            .finish()
    }
}

/// Source of configuration values, keyed by variable name.
///
/// Blank values are treated as unset.
struct Vars<F>(F);

impl<F: Fn(&str) -> Option<String>> Vars<F> {
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn parsed<T>(&self, key: &str, default: &str) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.or_default(key, default)
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    }

    /// Read an optional API key, warning when it looks like a placeholder.
    fn checked_secret(&self, key: &str) -> Option<SecretString> {
        self.optional(key).map(|value| {
            if let Err(e) = validate_secret_strength(&value, key) {
                tracing::warn!("{key} validation warning: {e}");
            }
            SecretString::from(value)
        })
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or a
    /// group of variables is only partially set.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key/value lookup.
    ///
    /// # Errors
    ///
    /// Same as [`AppConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(lookup);

        let database_url = vars
            .optional("CRM_DATABASE_URL")
            .or_else(|| vars.optional("DATABASE_URL"))
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingEnvVar("CRM_DATABASE_URL".to_string()))?;
        let host = vars.parsed::<IpAddr>("CRM_HOST", "127.0.0.1")?;
        let port = vars.parsed::<u16>("CRM_PORT", "3000")?;

        let sentry_sample_rate = vars
            .optional("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = vars
            .optional("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);

        Ok(Self {
            database_url,
            host,
            port,
            geoapify: GeoapifyConfig::from_vars(&vars),
            smtp: SmtpConfig::from_vars(&vars)?,
            brevo: BrevoConfig::from_vars(&vars)?,
            s3: S3Config::from_vars(&vars)?,
            upload_api: UploadApiConfig::from_vars(&vars)?,
            sentry_dsn: vars.optional("SENTRY_DSN"),
            sentry_environment: vars.optional("SENTRY_ENVIRONMENT"),
            sentry_sample_rate,
            sentry_traces_sample_rate,
            tls: TlsConfig::from_vars(&vars)?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl GeoapifyConfig {
    fn from_vars<F: Fn(&str) -> Option<String>>(vars: &Vars<F>) -> Option<Self> {
        let api_key = vars.checked_secret("GEOAPIFY_API_KEY")?;
        Some(Self {
            api_key,
            base_url: vars
                .or_default("GEOAPIFY_BASE_URL", DEFAULT_GEOAPIFY_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
        })
    }
}

impl SmtpConfig {
    fn from_vars<F: Fn(&str) -> Option<String>>(
        vars: &Vars<F>,
    ) -> Result<Option<Self>, ConfigError> {
        let Some(host) = vars.optional("SMTP_HOST") else {
            return Ok(None);
        };
        let username = vars.required("SMTP_USER")?;
        let password = SecretString::from(vars.required("SMTP_PASSWORD")?);
        let from_address = vars.optional("SMTP_FROM").unwrap_or_else(|| username.clone());
        let secure = vars.optional("SMTP_SECURE").is_some_and(|v| v == "true");

        Ok(Some(Self {
            host,
            port: vars.parsed("SMTP_PORT", "587")?,
            username,
            password,
            from_address,
            secure,
        }))
    }
}

impl BrevoConfig {
    fn from_vars<F: Fn(&str) -> Option<String>>(
        vars: &Vars<F>,
    ) -> Result<Option<Self>, ConfigError> {
        let Some(api_key) = vars.checked_secret("BREVO_API_KEY") else {
            return Ok(None);
        };
        let sender_email = vars.optional("BREVO_SENDER_EMAIL").ok_or_else(|| {
            ConfigError::InvalidEnvVar(
                "BREVO_*".to_string(),
                "BREVO_SENDER_EMAIL must be set together with BREVO_API_KEY".to_string(),
            )
        })?;

        Ok(Some(Self {
            api_key,
            sender_email,
            sender_name: vars.or_default("BREVO_SENDER_NAME", DEFAULT_BREVO_SENDER_NAME),
        }))
    }
}

impl S3Config {
    fn from_vars<F: Fn(&str) -> Option<String>>(
        vars: &Vars<F>,
    ) -> Result<Option<Self>, ConfigError> {
        let endpoint = vars.optional("S3_ENDPOINT");
        let bucket = vars.optional("S3_BUCKET");
        let access_key = vars.optional("S3_ACCESS_KEY");
        let secret_key = vars.optional("S3_SECRET_KEY");

        match (endpoint, bucket, access_key, secret_key) {
            (Some(endpoint), Some(bucket), Some(access_key), Some(secret_key)) => {
                url::Url::parse(&endpoint).map_err(|e| {
                    ConfigError::InvalidEnvVar("S3_ENDPOINT".to_string(), e.to_string())
                })?;
                Ok(Some(Self {
                    endpoint: endpoint.trim_end_matches('/').to_string(),
                    bucket,
                    access_key,
                    secret_key: SecretString::from(secret_key),
                    region: vars.or_default("S3_REGION", DEFAULT_S3_REGION),
                }))
            }
            (None, None, None, None) => Ok(None),
            _ => Err(ConfigError::InvalidEnvVar(
                "S3_*".to_string(),
                "S3_ENDPOINT, S3_BUCKET, S3_ACCESS_KEY and S3_SECRET_KEY must be set together"
                    .to_string(),
            )),
        }
    }
}

impl UploadApiConfig {
    fn from_vars<F: Fn(&str) -> Option<String>>(
        vars: &Vars<F>,
    ) -> Result<Option<Self>, ConfigError> {
        let Some(api_key) = vars.checked_secret("STORAGE_API_KEY") else {
            return Ok(None);
        };
        let (Some(api_url), Some(base_url)) = (
            vars.optional("STORAGE_API_URL"),
            vars.optional("STORAGE_BASE_URL"),
        ) else {
            return Err(ConfigError::InvalidEnvVar(
                "STORAGE_*".to_string(),
                "STORAGE_API_URL and STORAGE_BASE_URL must be set together with STORAGE_API_KEY"
                    .to_string(),
            ));
        };

        Ok(Some(Self {
            api_url,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            project: vars.or_default("STORAGE_PROJECT", DEFAULT_STORAGE_PROJECT),
        }))
    }
}

impl TlsConfig {
    fn from_vars<F: Fn(&str) -> Option<String>>(
        vars: &Vars<F>,
    ) -> Result<Option<Self>, ConfigError> {
        match (vars.optional("CRM_TLS_CERT"), vars.optional("CRM_TLS_KEY")) {
            (Some(cert), Some(key)) => Ok(Some(Self {
                cert_pem: cert,
                key_pem: SecretString::from(key),
            })),
            (None, None) => Ok(None),
            _ => Err(ConfigError::InvalidEnvVar(
                "CRM_TLS_*".to_string(),
                "Both CRM_TLS_CERT and CRM_TLS_KEY must be set together".to_string(),
            )),
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Check that an API key is not a placeholder and has plausible entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1})"
            ),
        ));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        AppConfig::from_lookup(move |key| map.get(key).cloned())
    }

    const DB: (&str, &str) = ("CRM_DATABASE_URL", "postgres://localhost/crm");

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = load(&[DB]).unwrap();
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:3000");
        assert!(config.geoapify.is_none());
        assert!(config.smtp.is_none());
        assert!(config.brevo.is_none());
        assert!(config.s3.is_none());
        assert!(config.upload_api.is_none());
        assert!(config.tls.is_none());
    }

    #[test]
    fn test_database_url_falls_back_to_generic() {
        let config = load(&[("DATABASE_URL", "postgres://fly/crm")]).unwrap();
        assert_eq!(config.database_url.expose_secret(), "postgres://fly/crm");

        let err = load(&[]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "CRM_DATABASE_URL"));
    }

    #[test]
    fn test_invalid_port() {
        let err = load(&[DB, ("CRM_PORT", "eighty")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref k, _) if k == "CRM_PORT"));
    }

    #[test]
    fn test_smtp_from_defaults_to_user() {
        let config = load(&[
            DB,
            ("SMTP_HOST", "smtp.mail.test"),
            ("SMTP_USER", "sales@agency.test"),
            ("SMTP_PASSWORD", "k2P9xQ7vLm"),
        ])
        .unwrap();
        let smtp = config.smtp.unwrap();
        assert_eq!(smtp.port, 587);
        assert_eq!(smtp.from_address, "sales@agency.test");
        assert!(!smtp.secure);
    }

    #[test]
    fn test_smtp_host_without_credentials_is_an_error() {
        let err = load(&[DB, ("SMTP_HOST", "smtp.mail.test")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "SMTP_USER"));
    }

    #[test]
    fn test_partial_s3_config_is_an_error() {
        let err = load(&[DB, ("S3_ENDPOINT", "https://s3.test"), ("S3_BUCKET", "b")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref k, _) if k == "S3_*"));
    }

    #[test]
    fn test_full_s3_config() {
        let config = load(&[
            DB,
            ("S3_ENDPOINT", "https://s3.test/"),
            ("S3_BUCKET", "attachments"),
            ("S3_ACCESS_KEY", "AKIDEXAMPLE"),
            ("S3_SECRET_KEY", "wJalrXUtnFEMI/K7MDENG"),
        ])
        .unwrap();
        let s3 = config.s3.unwrap();
        assert_eq!(s3.endpoint, "https://s3.test");
        assert_eq!(s3.region, "us-east-1");
    }

    #[test]
    fn test_brevo_requires_sender() {
        let err = load(&[DB, ("BREVO_API_KEY", "xkeysib-9f8a7b6c5d4e")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref k, _) if k == "BREVO_*"));
    }

    #[test]
    fn test_blank_values_are_unset() {
        let config = load(&[DB, ("GEOAPIFY_API_KEY", "   "), ("SMTP_HOST", "")]).unwrap();
        assert!(config.geoapify.is_none());
        assert!(config.smtp.is_none());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = load(&[DB, ("GEOAPIFY_API_KEY", "a81c7e0f3b2d49e6")]).unwrap();
        let debug = format!("{:?}", config.geoapify.unwrap());
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("a81c7e0f3b2d49e6"));
    }

    #[test]
    fn test_shannon_entropy() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("ab") - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength() {
        assert!(validate_secret_strength("your-api-key-here", "K").is_err());
        assert!(validate_secret_strength("aaaaaaaaaaaaaaaa", "K").is_err());
        assert!(validate_secret_strength("a81c7e0f3b2d49e6", "K").is_ok());
    }
}
