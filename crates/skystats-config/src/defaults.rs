//! Default values for every configuration section.

use crate::schema::*;

/// Default listen address.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8787";

/// Public AppView; serves graph queries without authentication.
pub const DEFAULT_SERVICE_URL: &str = "https://public.api.bsky.app";

/// Freshness window of a cached stats entry.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 60 * 60;

/// Key capacity of the in-memory store.
pub const DEFAULT_MEMORY_CAPACITY: u64 = 10_000;

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            permissive_cors: false,
        }
    }
}

impl Default for BlueskyConfig {
    fn default() -> Self {
        Self {
            service_url: DEFAULT_SERVICE_URL.to_string(),
            identifier: None,
            password: None,
            page_limit: 100,
            max_pages: 1000,
            timeout_secs: 30,
            rate_limit_per_sec: 10,
            user_agent: concat!("skystats/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_CACHE_TTL_SECS,
            backend: StoreBackend::default(),
        }
    }
}

impl Default for StoreBackend {
    fn default() -> Self {
        Self::Memory {
            max_capacity: DEFAULT_MEMORY_CAPACITY,
        }
    }
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            timezone: "UTC".to_string(),
            default_period: "month".to_string(),
        }
    }
}
