//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront
//! - `WIX_CLIENT_ID` - OAuth client ID of the Wix headless project
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `APP_ENV` - `development` or `production` (default: development)
//! - `WIX_API_BASE_URL` - Wix REST API root (default: <https://www.wixapis.com>)
//! - `WIX_STORES_APP_ID` - Catalog app ID used in catalog references
//! - `CART_CACHE_CAPACITY` - Max browsing sessions with a cached cart (default: 10000)
//! - `CART_CACHE_IDLE_SECS` - Idle time before a cached cart is dropped (default: 1800)
//! - `CART_CLEAR_ATTEMPTS` - Attempts for clearing a cart (default: 3)
//! - `CART_CLEAR_RETRY_DELAY_MS` - Delay between clear attempts (default: 1000)
//! - `RATE_LIMIT_ENABLED` - Rate limit `/api` routes (default: true)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.1)

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

/// Wix Stores catalog app ID.
pub const WIX_STORES_APP_ID: &str = "1380b703-ce81-ff05-f115-39571d94dfcd";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppEnv {
    #[default]
    Development,
    Production,
}

impl AppEnv {
    /// Whether cookies must carry the `Secure` attribute.
    #[must_use]
    pub const fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

impl FromStr for AppEnv {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(format!("unknown environment '{other}'")),
        }
    }
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront (no trailing slash)
    pub base_url: String,
    /// Deployment environment
    pub app_env: AppEnv,
    /// Wix platform configuration
    pub wix: WixConfig,
    /// Cart cache configuration
    pub cart: CartConfig,
    /// Whether `/api` routes are rate limited
    pub rate_limit_enabled: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate
    pub sentry_sample_rate: f32,
    /// Sentry transaction sample rate
    pub sentry_traces_sample_rate: f32,
}

/// Wix headless project configuration.
#[derive(Debug, Clone)]
pub struct WixConfig {
    /// OAuth client ID (public, identifies the headless project)
    pub client_id: String,
    /// REST API root
    pub api_base_url: String,
    /// Catalog app ID for catalog references
    pub stores_app_id: String,
}

/// Per-session cart cache settings.
#[derive(Debug, Clone)]
pub struct CartConfig {
    /// Max sessions with a cached cart
    pub capacity: u64,
    /// Idle time before a session's cart cache is dropped
    pub idle_timeout: Duration,
    /// Attempts for clearing a cart
    pub clear_attempts: u32,
    /// Delay between clear attempts
    pub clear_retry_delay: Duration,
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            capacity: 10_000,
            idle_timeout: Duration::from_secs(1800),
            clear_attempts: 3,
            clear_retry_delay: Duration::from_millis(1000),
        }
    }
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

        let host = parse_env_or_default("STOREFRONT_HOST", "127.0.0.1")?;
        let port = parse_env_or_default("STOREFRONT_PORT", "3000")?;
        let base_url =
            normalize_base_url("STOREFRONT_BASE_URL", &get_required_env("STOREFRONT_BASE_URL")?)?;
        let app_env = parse_env_or_default("APP_ENV", "development")?;

        let wix = WixConfig::from_env()?;
        let cart = CartConfig::from_env()?;
        let rate_limit_enabled = parse_env_or_default("RATE_LIMIT_ENABLED", "true")?;

        Ok(Self {
            host,
            port,
            base_url,
            app_env,
            wix,
            cart,
            rate_limit_enabled,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_env_or_default("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: parse_env_or_default("SENTRY_TRACES_SAMPLE_RATE", "0.1")?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether session cookies carry the `Secure` attribute.
    #[must_use]
    pub const fn secure_cookies(&self) -> bool {
        self.app_env.is_production()
    }
}

impl WixConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            client_id: get_required_env("WIX_CLIENT_ID")?,
            api_base_url: normalize_base_url(
                "WIX_API_BASE_URL",
                &get_env_or_default("WIX_API_BASE_URL", "https://www.wixapis.com"),
            )?,
            stores_app_id: get_env_or_default("WIX_STORES_APP_ID", WIX_STORES_APP_ID),
        })
    }
}

impl CartConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let attempts: u32 = parse_env_or_default("CART_CLEAR_ATTEMPTS", "3")?;
        if attempts == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "CART_CLEAR_ATTEMPTS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            capacity: parse_env_or_default("CART_CACHE_CAPACITY", "10000")?,
            idle_timeout: Duration::from_secs(parse_env_or_default("CART_CACHE_IDLE_SECS", "1800")?),
            clear_attempts: attempts,
            clear_retry_delay: Duration::from_millis(parse_env_or_default(
                "CART_CLEAR_RETRY_DELAY_MS",
                "1000",
            )?),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, falling back to a default literal.
fn parse_env_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    parse_value(key, &get_env_or_default(key, default))
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Validate a URL and strip any trailing slash.
fn normalize_base_url(key: &str, raw: &str) -> Result<String, ConfigError> {
    let parsed = url::Url::parse(raw.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme '{}'", parsed.scheme()),
        ));
    }
    Ok(raw.trim().trim_end_matches('/').to_string())
}
