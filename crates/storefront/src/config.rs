//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SERVER_URL` - Public URL of the storefront (used for checkout redirects)
//! - `CMS_URL` - Base URL of the Payload CMS instance
//! - `CMS_API_KEY` - Payload API key for server-side collection access
//! - `STRIPE_SECRET_KEY` - Stripe secret (or restricted) API key
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STRIPE_API_BASE` - Stripe API base URL (default: <https://api.stripe.com>)
//! - `STRIPE_FEE_PRICE_ID` - Price ID of the flat fee added to every checkout
//! - `HTTP_TIMEOUT_SECS` - Timeout for outbound CMS and Stripe requests (default: 30)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error event sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Performance trace sample rate (default: 0.0)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use marketplace_core::PriceId;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Flat fee line item appended to every checkout session.
pub const DEFAULT_FEE_PRICE_ID: &str = "price_1Oo4Y0SIsm0zeUEXKRFnFUVm";

/// Default Stripe API base URL.
pub const DEFAULT_STRIPE_API_BASE: &str = "https://api.stripe.com";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
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

/// Stripe API key prefixes accepted for server-side calls.
const STRIPE_KEY_PREFIXES: &[&str] = &["sk_", "rk_"];

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

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront, without trailing slash
    pub server_url: String,
    /// Payload CMS configuration
    pub cms: CmsConfig,
    /// Stripe configuration
    pub stripe: StripeConfig,
    /// Timeout applied to outbound HTTP requests
    pub http_timeout: Duration,
    /// Sentry error tracking configuration
    pub sentry: SentryConfig,
}

/// Payload CMS configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct CmsConfig {
    /// Base URL of the CMS (the REST API lives under `/api`)
    pub url: Url,
    /// API key of the service user
    pub api_key: SecretString,
}

impl std::fmt::Debug for CmsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CmsConfig")
            .field("url", &self.url.as_str())
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

/// Stripe configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct StripeConfig {
    /// API base URL
    pub api_base: Url,
    /// Secret API key
    pub secret_key: SecretString,
    /// Price ID of the flat fee appended to every checkout session
    pub fee_price_id: PriceId,
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("api_base", &self.api_base.as_str())
            .field("secret_key", &"[REDACTED]")
            .field("fee_price_id", &self.fee_price_id.as_str())
            .finish()
    }
}

/// Sentry error tracking configuration.
#[derive(Debug, Clone)]
pub struct SentryConfig {
    /// Sentry DSN; tracking is disabled when unset
    pub dsn: Option<String>,
    /// Environment name reported with events
    pub environment: Option<String>,
    /// Error event sample rate
    pub sample_rate: f32,
    /// Performance trace sample rate
    pub traces_sample_rate: f32,
}

impl Default for SentryConfig {
    fn default() -> Self {
        Self {
            dsn: None,
            environment: None,
            sample_rate: 1.0,
            traces_sample_rate: 0.0,
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
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = parse_env("STOREFRONT_HOST", "127.0.0.1")?;
        let port = parse_env("STOREFRONT_PORT", "3000")?;
        let server_url = normalize_server_url(&get_required_env("SERVER_URL")?)?;
        let http_timeout = Duration::from_secs(parse_env("HTTP_TIMEOUT_SECS", "30")?);

        Ok(Self {
            host,
            port,
            server_url,
            cms: CmsConfig::from_env()?,
            stripe: StripeConfig::from_env()?,
            http_timeout,
            sentry: SentryConfig::from_env()?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl CmsConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            url: get_url("CMS_URL", None)?,
            api_key: get_validated_secret("CMS_API_KEY")?,
        })
    }
}

impl StripeConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let secret_key = get_validated_secret("STRIPE_SECRET_KEY")?;
        validate_stripe_key(&secret_key, "STRIPE_SECRET_KEY")?;

        let fee_price_id = PriceId::parse(get_env_or_default(
            "STRIPE_FEE_PRICE_ID",
            DEFAULT_FEE_PRICE_ID,
        ))
        .map_err(|e| ConfigError::InvalidEnvVar("STRIPE_FEE_PRICE_ID".to_string(), e.to_string()))?;

        Ok(Self {
            api_base: get_url("STRIPE_API_BASE", Some(DEFAULT_STRIPE_API_BASE))?,
            secret_key,
            fee_price_id,
        })
    }
}

impl SentryConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            dsn: get_optional_env("SENTRY_DSN"),
            environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sample_rate: parse_env("SENTRY_SAMPLE_RATE", "1.0")?,
            traces_sample_rate: parse_env("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
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
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable with a default value.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Get an environment variable as an absolute http(s) URL.
fn get_url(key: &str, default: Option<&str>) -> Result<Url, ConfigError> {
    let raw = match default {
        Some(default) => get_env_or_default(key, default),
        None => get_required_env(key)?,
    };
    parse_http_url(&raw).map_err(|reason| ConfigError::InvalidEnvVar(key.to_string(), reason))
}

fn parse_http_url(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw).map_err(|e| e.to_string())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("unsupported scheme '{}'", url.scheme()));
    }
    if url.host_str().is_none() {
        return Err("URL must have a host".to_string());
    }
    Ok(url)
}

/// Validate the public server URL and strip any trailing slash.
fn normalize_server_url(raw: &str) -> Result<String, ConfigError> {
    parse_http_url(raw)
        .map_err(|reason| ConfigError::InvalidEnvVar("SERVER_URL".to_string(), reason))?;
    Ok(raw.trim_end_matches('/').to_string())
}

/// Validate that a Stripe key has a server-side key prefix.
fn validate_stripe_key(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if STRIPE_KEY_PREFIXES
        .iter()
        .any(|prefix| value.starts_with(prefix))
    {
        return Ok(());
    }
    Err(ConfigError::InsecureSecret(
        var_name.to_string(),
        "must be a secret (sk_) or restricted (rk_) key; publishable keys cannot create sessions"
            .to_string(),
    ))
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
    let len = s.len() as f64;
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
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
