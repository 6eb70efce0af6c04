//! Engine configuration
//!
//! Values come from the process environment (after `dotenv`), with the
//! defaults listed on [`EngineConfig::default`].

use crate::error::QueryError;
use crate::Result;
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_GATEWAY_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONTEXT_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_MAX_DISTINCT_ATTEMPTS: usize = 3;
pub const DEFAULT_API_PORT: u16 = 8080;

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Base URL of the tool gateway, without the `/tool/{name}` suffix
    pub gateway_base_url: Option<String>,
    pub gateway_timeout: Duration,
    pub context_timeout: Duration,
    pub max_distinct_attempts: usize,
    pub context_cache: bool,
    pub database_url: Option<String>,
    pub api_port: u16,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            gateway_base_url: None,
            gateway_timeout: Duration::from_secs(DEFAULT_GATEWAY_TIMEOUT_SECS),
            context_timeout: Duration::from_secs(DEFAULT_CONTEXT_TIMEOUT_SECS),
            max_distinct_attempts: DEFAULT_MAX_DISTINCT_ATTEMPTS,
            context_cache: false,
            database_url: None,
            api_port: DEFAULT_API_PORT,
        }
    }
}

impl EngineConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let first_of = |keys: &[&str]| {
            keys.iter()
                .filter_map(|key| lookup(key))
                .map(|value| value.trim().to_string())
                .find(|value| !value.is_empty())
        };

        let gateway_base_url = first_of(&["GATEWAY_BASE_URL", "TOOLS_API_BASE_URL"])
            .map(|url| url.trim_end_matches('/').to_string());

        let gateway_timeout_secs: u64 = parse_or(
            first_of(&["GATEWAY_TIMEOUT_SECS"]),
            "GATEWAY_TIMEOUT_SECS",
            DEFAULT_GATEWAY_TIMEOUT_SECS,
        )?;
        let context_timeout_secs: u64 = parse_or(
            first_of(&["CONTEXT_TIMEOUT_SECS"]),
            "CONTEXT_TIMEOUT_SECS",
            DEFAULT_CONTEXT_TIMEOUT_SECS,
        )?;
        let max_distinct_attempts: usize = parse_or(
            first_of(&["MAX_DISTINCT_ATTEMPTS"]),
            "MAX_DISTINCT_ATTEMPTS",
            DEFAULT_MAX_DISTINCT_ATTEMPTS,
        )?;
        let api_port: u16 = parse_or(
            first_of(&["PORT", "API_PORT"]),
            "PORT",
            DEFAULT_API_PORT,
        )?;

        if max_distinct_attempts == 0 {
            return Err(QueryError::ConfigError(
                "MAX_DISTINCT_ATTEMPTS must be at least 1".to_string(),
            ));
        }

        let context_cache = match first_of(&["CONTEXT_CACHE"]) {
            Some(value) => parse_flag(&value).ok_or_else(|| {
                QueryError::ConfigError(format!("CONTEXT_CACHE is not a boolean: {}", value))
            })?,
            None => false,
        };

        Ok(Self {
            gateway_base_url,
            gateway_timeout: Duration::from_secs(gateway_timeout_secs),
            context_timeout: Duration::from_secs(context_timeout_secs),
            max_distinct_attempts,
            context_cache,
            database_url: first_of(&["DATABASE_URL", "POSTGRES_URL"]),
            api_port,
        })
    }

    /// Gateway base URL, or a configuration error when it is not set
    pub fn require_gateway_base_url(&self) -> Result<&str> {
        self.gateway_base_url.as_deref().ok_or_else(|| {
            QueryError::ConfigError(
                "GATEWAY_BASE_URL (or TOOLS_API_BASE_URL) is not configured".to_string(),
            )
        })
    }
}

fn parse_or<T: FromStr>(raw: Option<String>, key: &str, default: T) -> Result<T> {
    match raw {
        Some(value) => value.parse::<T>().map_err(|_| {
            QueryError::ConfigError(format!("{} has an invalid value: {}", key, value))
        }),
        None => Ok(default),
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
