//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `ROOH_STORE_BASE_URL` - WordPress/WooCommerce origin (e.g. `https://shop.example.com`)
//!
//! ## Optional
//! - `ROOH_CATALOG_CONSUMER_KEY` - REST v3 consumer key (catalog disabled if unset)
//! - `ROOH_CATALOG_CONSUMER_SECRET` - REST v3 consumer secret (required with the key)
//! - `ROOH_SESSION_FILE` - Where cart credentials persist (default: .rooh-session.json)
//! - `ROOH_NONCE_TTL_SECS` - Nonce lifetime in seconds (default: 600)
//! - `ROOH_CATALOG_TIMEOUT_SECS` - Catalog request timeout (default: 15)
//! - `ROOH_CATALOG_MAX_ATTEMPTS` - Catalog attempts including the first (default: 3)
//! - `ROOH_CATALOG_BACKOFF_MS` - Base delay between catalog attempts (default: 250)
//! - `ROOH_CART_SYNC_PARAM` - Handoff query parameter (default: `rooh_sync_cart`)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::path::PathBuf;
use std::time::Duration;

use rooh_core::DEFAULT_NONCE_TTL_SECS;
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

/// Path of the Store API (v1) below the store origin.
const STORE_API_PATH: &str = "wp-json/wc/store/v1/";

/// Path of the REST API (v3) below the store origin.
const CATALOG_API_PATH: &str = "wp-json/wc/v3/";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Store origin, always with a trailing slash.
    pub base_url: Url,
    /// File backing the cart session credentials.
    pub session_file: PathBuf,
    /// How long a captured nonce stays usable.
    pub nonce_ttl: Duration,
    /// Query parameter the handoff endpoint reads.
    pub cart_sync_param: String,
    /// Catalog API configuration (absent when no consumer key is set).
    pub catalog: Option<CatalogConfig>,
    /// Sentry DSN for error tracking.
    pub sentry_dsn: Option<String>,
}

/// Catalog (REST v3) configuration.
///
/// Implements `Debug` manually to redact the consumer secret.
#[derive(Clone)]
pub struct CatalogConfig {
    pub consumer_key: String,
    pub consumer_secret: SecretString,
    pub timeout: Duration,
    pub max_attempts: u32,
    pub backoff_base: Duration,
}

impl std::fmt::Debug for CatalogConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogConfig")
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .field("max_attempts", &self.max_attempts)
            .field("backoff_base", &self.backoff_base)
            .finish()
    }
}

impl StoreConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let base_url = parse_base_url(&get_required_env("ROOH_STORE_BASE_URL")?)?;
        let session_file = PathBuf::from(get_env_or_default(
            "ROOH_SESSION_FILE",
            ".rooh-session.json",
        ));
        let nonce_ttl = Duration::from_secs(get_parsed_env(
            "ROOH_NONCE_TTL_SECS",
            DEFAULT_NONCE_TTL_SECS.unsigned_abs(),
        )?);
        let cart_sync_param = get_env_or_default("ROOH_CART_SYNC_PARAM", "rooh_sync_cart");
        let catalog = CatalogConfig::from_env()?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");

        Ok(Self {
            base_url,
            session_file,
            nonce_ttl,
            cart_sync_param,
            catalog,
            sentry_dsn,
        })
    }

    /// Configuration with defaults for everything but the store origin.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if `base_url` is not a valid URL.
    pub fn with_base_url(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_base_url(base_url)?,
            session_file: PathBuf::from(".rooh-session.json"),
            nonce_ttl: Duration::from_secs(DEFAULT_NONCE_TTL_SECS.unsigned_abs()),
            cart_sync_param: "rooh_sync_cart".to_string(),
            catalog: None,
            sentry_dsn: None,
        })
    }

    /// Base URL of the Store API, e.g. `https://shop.example.com/wp-json/wc/store/v1/`.
    #[must_use]
    pub fn store_api_url(&self) -> Url {
        join_or_base(&self.base_url, STORE_API_PATH)
    }

    /// Base URL of the catalog REST API.
    #[must_use]
    pub fn catalog_api_url(&self) -> Url {
        join_or_base(&self.base_url, CATALOG_API_PATH)
    }

    /// Nonce lifetime as a `chrono` duration for the session store.
    #[must_use]
    pub fn nonce_ttl_chrono(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.nonce_ttl)
            .unwrap_or_else(|_| chrono::Duration::seconds(DEFAULT_NONCE_TTL_SECS))
    }
}

impl CatalogConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(consumer_key) = get_optional_env("ROOH_CATALOG_CONSUMER_KEY") else {
            return Ok(None);
        };
        let consumer_secret =
            SecretString::from(get_required_env("ROOH_CATALOG_CONSUMER_SECRET")?);

        Ok(Some(Self {
            consumer_key,
            consumer_secret,
            timeout: Duration::from_secs(get_parsed_env("ROOH_CATALOG_TIMEOUT_SECS", 15)?),
            max_attempts: get_parsed_env("ROOH_CATALOG_MAX_ATTEMPTS", 3)?,
            backoff_base: Duration::from_millis(get_parsed_env("ROOH_CATALOG_BACKOFF_MS", 250)?),
        }))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse the store origin, normalizing to exactly one trailing slash so
/// relative joins keep the full path.
fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let normalized = format!("{}/", raw.trim().trim_end_matches('/'));
    let url = Url::parse(&normalized).map_err(|e| {
        ConfigError::InvalidEnvVar("ROOH_STORE_BASE_URL".to_string(), e.to_string())
    })?;
    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidEnvVar(
            "ROOH_STORE_BASE_URL".to_string(),
            "must be an absolute http(s) URL".to_string(),
        ));
    }
    Ok(url)
}

fn join_or_base(base: &Url, path: &str) -> Url {
    base.join(path).unwrap_or_else(|_| base.clone())
}

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get and parse an environment variable, falling back to `default` when unset.
fn get_parsed_env<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_optional_env(key).map_or(Ok(default), |value| {
        value
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}
