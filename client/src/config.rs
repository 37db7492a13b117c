//! Configuration management for the client.

use medals_engine::CounterKinds;
use std::env;
use std::time::Duration;

const DEFAULT_API_URL: &str = "https://localhost:5001/api/country";
const DEFAULT_HUB_URL: &str = "wss://localhost:5001/medalsHub";
const DEFAULT_COUNTERS: &str = "gold,silver,bronze";
const DEFAULT_TIMEOUT_SECS: &str = "10";

/// Client configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// REST resource for entities
    pub api_url: String,
    /// Websocket endpoint of the notification hub
    pub hub_url: String,
    /// Counter kinds every entity carries
    pub counter_kinds: CounterKinds,
    /// Per-request timeout for persistence calls
    pub request_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = lookup("MEDALS_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());
        validate_url(&api_url, &["http", "https"])?;

        let hub_url = lookup("MEDALS_HUB_URL").unwrap_or_else(|| DEFAULT_HUB_URL.to_string());
        validate_url(&hub_url, &["ws", "wss"])?;

        let counters = lookup("MEDALS_COUNTERS").unwrap_or_else(|| DEFAULT_COUNTERS.to_string());
        let counter_kinds = CounterKinds::parse(&counters)
            .map_err(|e| ConfigError::InvalidCounters(e.to_string()))?;

        let request_timeout = lookup("MEDALS_REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|| DEFAULT_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .ok_or(ConfigError::InvalidTimeout)?;

        Ok(Self {
            api_url,
            hub_url,
            counter_kinds,
            request_timeout,
        })
    }
}

fn validate_url(raw: &str, schemes: &[&str]) -> Result<(), ConfigError> {
    let url = reqwest::Url::parse(raw).map_err(|e| ConfigError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    if !schemes.contains(&url.scheme()) {
        return Err(ConfigError::InvalidUrl {
            url: raw.to_string(),
            reason: format!("expected scheme {}", schemes.join(" or ")),
        });
    }
    Ok(())
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Invalid MEDALS_COUNTERS value: {0}")]
    InvalidCounters(String),

    #[error("Invalid MEDALS_REQUEST_TIMEOUT_SECS value")]
    InvalidTimeout,
}
