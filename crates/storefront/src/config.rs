//! Engine configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `PIZZERIA_API_URL` - Base URL of the backend (e.g. `https://api.example.com/v1/`)
//!
//! ## Optional
//! - `PIZZERIA_STORAGE_DIR` - Directory for the local storage tier (default: in-memory)
//! - `PIZZERIA_HISTORY_LIMIT` - Orders kept in the history ledger (default: 50)
//! - `PIZZERIA_MENU_CACHE_TTL_SECS` - Menu cache lifetime (default: 300)
//! - `PIZZERIA_REQUEST_TIMEOUT_SECS` - Backend request timeout (default: 10)
//! - `PIZZERIA_API_TOKEN` - Bearer token for operator tooling
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

/// Default number of orders the history ledger keeps.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Backend API configuration
    pub api: ApiConfig,
    /// Directory for file-backed local storage; `None` keeps it in memory
    pub storage_dir: Option<PathBuf>,
    /// Maximum number of orders kept in the history ledger
    pub history_limit: usize,
    /// Bearer token for operator tooling (never logged)
    pub api_token: Option<SecretString>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

/// Backend API configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL; always ends with `/` so relative paths join beneath it
    pub base_url: Url,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// How long `GET /menu` responses are cached
    pub menu_cache_ttl: Duration,
}

impl StorefrontConfig {
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

        let base_url = parse_base_url(&get_required_env("PIZZERIA_API_URL")?)
            .map_err(|e| ConfigError::InvalidEnvVar("PIZZERIA_API_URL".to_string(), e))?;
        let request_timeout = Duration::from_secs(get_parsed_env_or_default(
            "PIZZERIA_REQUEST_TIMEOUT_SECS",
            10,
        )?);
        let menu_cache_ttl = Duration::from_secs(get_parsed_env_or_default(
            "PIZZERIA_MENU_CACHE_TTL_SECS",
            300,
        )?);
        let history_limit =
            get_parsed_env_or_default("PIZZERIA_HISTORY_LIMIT", DEFAULT_HISTORY_LIMIT)?;
        if history_limit == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "PIZZERIA_HISTORY_LIMIT".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            api: ApiConfig {
                base_url,
                request_timeout,
                menu_cache_ttl,
            },
            storage_dir: get_optional_env("PIZZERIA_STORAGE_DIR").map(PathBuf::from),
            history_limit,
            api_token: get_optional_env("PIZZERIA_API_TOKEN").map(SecretString::from),
            sentry_dsn: get_optional_env("SENTRY_DSN"),
        })
    }

    /// Configuration for a backend at `base_url` with every optional value defaulted.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if the URL cannot be parsed.
    pub fn with_base_url(base_url: &str) -> Result<Self, ConfigError> {
        let base_url = parse_base_url(base_url)
            .map_err(|e| ConfigError::InvalidEnvVar("PIZZERIA_API_URL".to_string(), e))?;

        Ok(Self {
            api: ApiConfig {
                base_url,
                request_timeout: Duration::from_secs(10),
                menu_cache_ttl: Duration::from_secs(300),
            },
            storage_dir: None,
            history_limit: DEFAULT_HISTORY_LIMIT,
            api_token: None,
            sentry_dsn: None,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse a base URL and make sure it ends with `/`.
fn parse_base_url(raw: &str) -> Result<Url, String> {
    let mut url = Url::parse(raw.trim()).map_err(|e| e.to_string())?;
    if url.cannot_be_a_base() {
        return Err("must be an absolute http(s) URL".to_string());
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Parse an environment variable, falling back to `default` when unset.
fn get_parsed_env_or_default<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_optional_env(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}
