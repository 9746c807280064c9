//! Configuration schema definitions using serde.

use serde::{Deserialize, Serialize};
use skystats_common::{LoggingConfig, Result};
use std::path::PathBuf;

/// Main configuration structure for SkyStats.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server configuration.
    pub server: ServerConfig,
    /// Bluesky API configuration.
    pub bluesky: BlueskyConfig,
    /// Stats cache configuration.
    pub cache: CacheConfig,
    /// Aggregation configuration.
    pub stats: StatsConfig,
    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to listen on.
    pub bind_addr: String,
    /// Allow cross-origin requests to the JSON API.
    pub permissive_cors: bool,
}

/// Bluesky API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlueskyConfig {
    /// XRPC service base URL.
    pub service_url: String,
    /// Login identifier; anonymous access when unset.
    pub identifier: Option<String>,
    /// App password paired with `identifier`.
    pub password: Option<String>,
    /// Items requested per page (1..=100).
    pub page_limit: u8,
    /// Upper bound on pages followed per list.
    pub max_pages: usize,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Outgoing requests per second.
    pub rate_limit_per_sec: u32,
    /// User-Agent header sent with every request.
    pub user_agent: String,
}

impl BlueskyConfig {
    /// Whether both login fields are present.
    pub fn has_credentials(&self) -> bool {
        self.identifier.is_some() && self.password.is_some()
    }
}

/// Stats cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Seconds a stored entry stays fresh.
    pub ttl_secs: u64,
    /// Where entries are kept.
    pub backend: StoreBackend,
}

/// Key-value store backend selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StoreBackend {
    /// In-process store, lost on restart.
    Memory {
        /// Maximum number of keys held.
        max_capacity: u64,
    },
    /// One JSON file per key under `directory`.
    File {
        /// Directory holding the entries.
        directory: PathBuf,
    },
}

/// Aggregation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    /// IANA time zone used to place timestamps on the calendar.
    pub timezone: String,
    /// Period shown when a page request doesn't choose one.
    pub default_period: String,
}

impl Config {
    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        crate::validator::ConfigValidator::validate(self)
    }
}
