//! Lookup configuration
//!
//! Endpoints and limits for the public-IP and geolocation lookups, read from
//! environment variables with built-in defaults.

use std::env;
use std::time::Duration;
use thiserror::Error;

/// Public-IP endpoint override
pub const PUBLIC_IP_URL_VAR: &str = "IPKIT_PUBLIC_IP_URL";
/// Geolocation endpoint override
pub const GEO_URL_VAR: &str = "IPKIT_GEO_URL";
/// Request timeout in seconds
pub const TIMEOUT_VAR: &str = "IPKIT_TIMEOUT_SECS";
/// Retries after the first failed attempt
pub const MAX_RETRIES_VAR: &str = "IPKIT_MAX_RETRIES";
/// Requests per second allowed by the client rate limiter
pub const RATE_LIMIT_VAR: &str = "IPKIT_RATE_LIMIT";

pub const DEFAULT_PUBLIC_IP_URL: &str = "https://api.ipify.org?format=json";
pub const DEFAULT_GEO_URL: &str = "http://ip-api.com/json";

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Variable is set but cannot be used
    #[error("Invalid value for {var}: {value}")]
    InvalidValue { var: String, value: String },
}

/// Result type for configuration loading
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Settings for the external lookup services
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupConfig {
    pub public_ip_url: String,
    pub geolocation_url: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub requests_per_second: u32,
}

impl LookupConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_source(|var| env::var(var).ok())
    }

    /// Load configuration from any variable source
    ///
    /// Unset variables fall back to defaults. Set but unparsable or zero
    /// numeric values are errors.
    pub fn from_source<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let public_ip_url = lookup(PUBLIC_IP_URL_VAR)
            .map(|v| non_empty(PUBLIC_IP_URL_VAR, v))
            .transpose()?
            .unwrap_or(defaults.public_ip_url);

        let geolocation_url = lookup(GEO_URL_VAR)
            .map(|v| non_empty(GEO_URL_VAR, v))
            .transpose()?
            .unwrap_or(defaults.geolocation_url);

        let timeout = lookup(TIMEOUT_VAR)
            .map(|v| positive(TIMEOUT_VAR, v))
            .transpose()?
            .map(|secs| Duration::from_secs(u64::from(secs)))
            .unwrap_or(defaults.timeout);

        let max_retries = match lookup(MAX_RETRIES_VAR) {
            Some(v) => v.trim().parse().map_err(|_| invalid(MAX_RETRIES_VAR, &v))?,
            None => defaults.max_retries,
        };

        let requests_per_second = lookup(RATE_LIMIT_VAR)
            .map(|v| positive(RATE_LIMIT_VAR, v))
            .transpose()?
            .unwrap_or(defaults.requests_per_second);

        Ok(Self {
            public_ip_url,
            geolocation_url,
            timeout,
            max_retries,
            requests_per_second,
        })
    }
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            public_ip_url: DEFAULT_PUBLIC_IP_URL.to_string(),
            geolocation_url: DEFAULT_GEO_URL.to_string(),
            timeout: Duration::from_secs(10),
            max_retries: 3,
            requests_per_second: 10,
        }
    }
}

fn invalid(var: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        var: var.to_string(),
        value: value.to_string(),
    }
}

fn non_empty(var: &str, value: String) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(invalid(var, &value));
    }
    Ok(trimmed.to_string())
}

fn positive(var: &str, value: String) -> Result<u32> {
    match value.trim().parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(invalid(var, &value)),
    }
}
