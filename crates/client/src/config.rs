//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DWA_API_BASE` - Backend base URL (e.g., `https://api.dwa.example/`)
//!
//! ## Optional
//! - `DWA_REQUEST_TIMEOUT_SECS` - Per-request timeout (default: 30)
//! - `DWA_SESSION_DIR` - Directory holding the persisted session (default: `<tmp>/dwa-session`)
//! - `DWA_DELIVERY_FEE` - Flat delivery fee per order (default: 5.00)
//! - `DWA_TAX_RATE` - Tax rate as a fraction of the subtotal (default: 0.05)
//! - `DWA_SIGNUP_EMAIL_DOMAIN` - Only allow signups from this email domain

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use dwa_core::Pricing;
use rust_decimal::Decimal;
use thiserror::Error;
use url::Url;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend base URL; always ends with `/` so relative paths nest under it.
    pub api_base: Url,
    /// Timeout applied to every request.
    pub request_timeout: Duration,
    /// Directory holding the persisted session.
    pub session_dir: PathBuf,
    /// Fee and tax settings used at checkout.
    pub pricing: Pricing,
    /// Email domain new accounts must belong to, if restricted.
    pub signup_email_domain: Option<String>,
}

impl ClientConfig {
    /// Default request timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Configuration pointing at `api_base` with every other setting defaulted.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if `api_base` is not a valid
    /// absolute URL.
    pub fn new(api_base: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            api_base: parse_base_url("DWA_API_BASE", api_base)?,
            request_timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            session_dir: default_session_dir(),
            pricing: Pricing::default(),
            signup_email_domain: None,
        })
    }

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

        let api_base = parse_base_url("DWA_API_BASE", &get_required_env("DWA_API_BASE")?)?;
        let timeout_secs: u64 = get_parsed_env(
            "DWA_REQUEST_TIMEOUT_SECS",
            Self::DEFAULT_TIMEOUT_SECS,
        )?;
        let session_dir = get_optional_env("DWA_SESSION_DIR")
            .map_or_else(default_session_dir, PathBuf::from);

        let defaults = Pricing::default();
        let pricing = Pricing::new(
            get_decimal_env("DWA_DELIVERY_FEE", defaults.delivery_fee)?,
            get_decimal_env("DWA_TAX_RATE", defaults.tax_rate)?,
        );

        let signup_email_domain = get_optional_env("DWA_SIGNUP_EMAIL_DOMAIN")
            .map(|d| d.trim().trim_start_matches('@').to_string())
            .filter(|d| !d.is_empty());

        Ok(Self {
            api_base,
            request_timeout: Duration::from_secs(timeout_secs),
            session_dir,
            pricing,
            signup_email_domain,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse a base URL, forcing a trailing slash so `Url::join` keeps the path.
fn parse_base_url(key: &str, raw: &str) -> Result<Url, ConfigError> {
    let trimmed = raw.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };
    let url = Url::parse(&with_slash)
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be an absolute http(s) URL".to_string(),
        ));
    }
    Ok(url)
}

fn default_session_dir() -> PathBuf {
    std::env::temp_dir().join("dwa-session")
}

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get and parse an environment variable, falling back to a default.
fn get_parsed_env<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_optional_env(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

/// Get a non-negative decimal environment variable.
fn get_decimal_env(key: &str, default: Decimal) -> Result<Decimal, ConfigError> {
    let value: Decimal = get_parsed_env(key, default)?;
    if value.is_sign_negative() {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must not be negative".to_string(),
        ));
    }
    Ok(value)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_base_url_adds_trailing_slash() {
        let url = parse_base_url("K", "http://localhost:8080/api").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/api/");
        assert_eq!(url.join("items/all").unwrap().as_str(), "http://localhost:8080/api/items/all");
    }

    #[test]
    fn test_parse_base_url_rejects_garbage() {
        assert!(matches!(
            parse_base_url("K", "not a url"),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
        assert!(parse_base_url("K", "mailto:a@b.io").is_err());
    }

    #[test]
    fn test_new_uses_defaults() {
        let config = ClientConfig::new("http://127.0.0.1:9000").unwrap();
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.pricing, Pricing::default());
        assert!(config.signup_email_domain.is_none());
    }

    #[test]
    fn test_missing_env_var_message() {
        let err = ConfigError::MissingEnvVar("DWA_API_BASE".to_string());
        assert_eq!(err.to_string(), "Missing environment variable: DWA_API_BASE");
    }
}
