//! Application configuration from the environment.
//!
//! Values come from process environment variables, optionally seeded from
//! a `.env` file in the working directory.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use chrono_tz::Tz;

use crate::cache::CacheConfig;
use crate::domain::{DEFAULT_NO_UPDATE_HOURS, DEFAULT_TIMEZONE, StalenessPolicy};
use crate::upstream::{DEFAULT_BASE_URL, DEFAULT_MAX_PER_SECOND, UpstreamConfig};

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8000";
const DEFAULT_LOG_DIR: &str = "logs";
const DEFAULT_CACHE_TTL_SECS: u64 = 60 * 60;
const DEFAULT_CACHE_MAX_CAPACITY: u64 = 128;

/// Errors from loading configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// A required variable is unset or empty
    #[error("{0} not found in environment variables")]
    Missing(&'static str),

    /// A variable is set but unusable
    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Everything the server needs to start.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Token for the upstream carpark API.
    pub upstream_api_key: String,
    /// Upstream collection endpoint.
    pub upstream_base_url: String,
    /// Token callers must present in `X-API-Key`.
    pub public_api_token: String,
    /// Outbound request ceiling per second.
    pub max_requests_per_second: u32,
    pub cache_ttl: Duration,
    pub cache_max_capacity: u64,
    /// Hours without an update before a facility is hidden.
    pub no_update_hours: f64,
    /// Timezone the upstream reports `MessageDate` in.
    pub timezone: Tz,
    pub bind_addr: SocketAddr,
    /// Directory for rolling log files.
    pub log_dir: PathBuf,
}

impl AppConfig {
    /// Load from the process environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        // A missing .env file is normal in production.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load using `lookup` to resolve variable names.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let required = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let upstream_api_key = required("NSW_CARPARK_API_TOKEN")?;
        let public_api_token = required("PUBLIC_API_TOKEN")?;

        let upstream_base_url =
            get("NSW_CARPARK_API_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let max_requests_per_second = match get("MAX_REQUESTS_PER_SECOND") {
            Some(raw) => parse_positive::<u32>(&raw, "MAX_REQUESTS_PER_SECOND")?,
            None => DEFAULT_MAX_PER_SECOND,
        };

        let cache_ttl_secs = match get("CACHE_TTL_SECS") {
            Some(raw) => parse_positive::<u64>(&raw, "CACHE_TTL_SECS")?,
            None => DEFAULT_CACHE_TTL_SECS,
        };

        let cache_max_capacity = match get("CACHE_MAX_CAPACITY") {
            Some(raw) => parse_positive::<u64>(&raw, "CACHE_MAX_CAPACITY")?,
            None => DEFAULT_CACHE_MAX_CAPACITY,
        };

        let no_update_hours = match get("NO_UPDATE_HOURS") {
            Some(raw) => parse_hours(&raw)?,
            None => DEFAULT_NO_UPDATE_HOURS,
        };

        let timezone = match get("CARPARK_TIMEZONE") {
            Some(raw) => raw.trim().parse::<Tz>().map_err(|e| ConfigError::Invalid {
                name: "CARPARK_TIMEZONE",
                reason: e.to_string(),
            })?,
            None => DEFAULT_TIMEZONE,
        };

        let bind_addr = get("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .trim()
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                name: "BIND_ADDR",
                reason: e.to_string(),
            })?;

        let log_dir = PathBuf::from(get("LOG_DIR").unwrap_or_else(|| DEFAULT_LOG_DIR.to_string()));

        Ok(Self {
            upstream_api_key,
            upstream_base_url,
            public_api_token,
            max_requests_per_second,
            cache_ttl: Duration::from_secs(cache_ttl_secs),
            cache_max_capacity,
            no_update_hours,
            timezone,
            bind_addr,
            log_dir,
        })
    }

    pub fn upstream(&self) -> UpstreamConfig {
        UpstreamConfig::new(&self.upstream_api_key).with_base_url(&self.upstream_base_url)
    }

    pub fn cache(&self) -> CacheConfig {
        CacheConfig::new(self.cache_ttl, self.cache_max_capacity)
    }

    pub fn staleness(&self) -> StalenessPolicy {
        StalenessPolicy::new(self.no_update_hours, self.timezone)
    }
}

fn parse_positive<T>(raw: &str, name: &'static str) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    let invalid = || ConfigError::Invalid {
        name,
        reason: format!("must be an integer > 0, got {raw:?}"),
    };
    let value: T = raw.trim().parse().map_err(|_| invalid())?;
    if value <= T::default() {
        return Err(invalid());
    }
    Ok(value)
}

fn parse_hours(raw: &str) -> Result<f64, ConfigError> {
    let invalid = || ConfigError::Invalid {
        name: "NO_UPDATE_HOURS",
        reason: format!("must be a number >= 0, got {raw:?}"),
    };
    let hours: f64 = raw.trim().parse().map_err(|_| invalid())?;
    if !hours.is_finite() || hours < 0.0 {
        return Err(invalid());
    }
    Ok(hours)
}
