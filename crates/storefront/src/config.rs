//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional.
//!
//! - `BOUTIQUE_HOST` - Bind address (default: 127.0.0.1)
//! - `BOUTIQUE_PORT` - Listen port (default: 3000)
//! - `MEILISEARCH_URL` - Search index base URL (default: <http://localhost:7700>)
//! - `MEILISEARCH_API_KEY` - Search index API key (high entropy, no placeholders)
//! - `MEILISEARCH_INDEX` - Index uid (default: products)
//! - `SEARCH_DEBOUNCE_MS` - Debounce window in milliseconds (default: 300)
//! - `SEARCH_RESULT_LIMIT` - Maximum hits per search (default: 20)
//! - `NATS_URL` - NATS server URL (default: nats://localhost:4222)
//! - `NATS_PRODUCT_BUCKET` - Key-value bucket holding products (default: products)
//! - `NATS_IMAGE_BUCKET` - Object store bucket holding images (default: product-images)
//! - `CATALOG_SAMPLE_SIZE` - Number of product ids listed for the catalog (default: 2)
//! - `BACKEND_TIMEOUT_MS` - Upper bound on any single backend call (default: 5000)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use crate::search::SearchSettings;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "your_",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct BoutiqueConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Search index configuration
    pub search: SearchConfig,
    /// Key-value and object store configuration
    pub store: StoreConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

/// Meilisearch configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct SearchConfig {
    /// Base URL of the Meilisearch server
    pub url: Url,
    /// API key sent as a bearer token, if the server requires one
    pub api_key: Option<SecretString>,
    /// Index uid
    pub index: String,
    /// Debounce, result cap and call timeout
    pub settings: SearchSettings,
}

impl std::fmt::Debug for SearchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchConfig")
            .field("url", &self.url.as_str())
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("index", &self.index)
            .field("settings", &self.settings)
            .finish()
    }
}

/// NATS JetStream configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// NATS server URL
    pub nats_url: String,
    /// Key-value bucket holding JSON product records
    pub product_bucket: String,
    /// Object store bucket holding product images
    pub image_bucket: String,
    /// Number of product ids listed into the catalog sample
    pub catalog_sample_size: usize,
    /// Upper bound on a single store call
    pub timeout: Duration,
}

impl BoutiqueConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable cannot be parsed, or if the API
    /// key fails validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_parsed_or_default::<IpAddr>("BOUTIQUE_HOST", "127.0.0.1")?;
        let port = get_parsed_or_default::<u16>("BOUTIQUE_PORT", "3000")?;
        let timeout = Duration::from_millis(get_parsed_or_default("BACKEND_TIMEOUT_MS", "5000")?);

        let search = SearchConfig::from_env(timeout)?;
        let store = StoreConfig::from_env(timeout)?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");

        Ok(Self {
            host,
            port,
            search,
            store,
            sentry_dsn,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl SearchConfig {
    fn from_env(timeout: Duration) -> Result<Self, ConfigError> {
        let url = get_parsed_or_default::<Url>("MEILISEARCH_URL", "http://localhost:7700")?;
        let api_key = get_optional_env("MEILISEARCH_API_KEY")
            .map(|key| {
                validate_secret_strength(&key, "MEILISEARCH_API_KEY")?;
                Ok(SecretString::from(key))
            })
            .transpose()?;

        let result_limit = get_parsed_or_default::<usize>("SEARCH_RESULT_LIMIT", "20")?;
        if result_limit == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "SEARCH_RESULT_LIMIT".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            url,
            api_key,
            index: get_env_or_default("MEILISEARCH_INDEX", "products"),
            settings: SearchSettings {
                debounce: Duration::from_millis(get_parsed_or_default("SEARCH_DEBOUNCE_MS", "300")?),
                result_limit,
                timeout,
            },
        })
    }
}

impl StoreConfig {
    fn from_env(timeout: Duration) -> Result<Self, ConfigError> {
        Ok(Self {
            nats_url: get_env_or_default("NATS_URL", "nats://localhost:4222"),
            product_bucket: get_env_or_default("NATS_PRODUCT_BUCKET", "products"),
            image_bucket: get_env_or_default("NATS_IMAGE_BUCKET", "product-images"),
            catalog_sample_size: get_parsed_or_default("CATALOG_SAMPLE_SIZE", "2")?,
            timeout,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Get an environment variable parsed as `T`, falling back to `default`.
fn get_parsed_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    parse_value(key, &get_env_or_default(key, default))
}

fn parse_value<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

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
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
    }

    // Real API keys have high entropy
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated key."
            ),
        ));
    }

    Ok(())
}
