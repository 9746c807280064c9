//! Runtime validation of a loaded configuration.

use crate::schema::{Config, StoreBackend};
use skystats_common::{Result, StatsError};
use std::net::SocketAddr;

const PERIODS: [&str; 3] = ["month", "week", "day"];

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validates a configuration, reporting the first offending field.
    pub fn validate(config: &Config) -> Result<()> {
        config
            .server
            .bind_addr
            .parse::<SocketAddr>()
            .map_err(|_| {
                StatsError::validation_field(
                    format!("'{}' is not a socket address", config.server.bind_addr),
                    "server.bind_addr",
                )
            })?;

        let bluesky = &config.bluesky;
        url::Url::parse(&bluesky.service_url).map_err(|e| {
            StatsError::validation_field(
                format!("'{}' is not a valid URL: {e}", bluesky.service_url),
                "bluesky.service_url",
            )
        })?;
        if bluesky.identifier.is_some() != bluesky.password.is_some() {
            return Err(StatsError::validation_field(
                "identifier and password must be set together",
                "bluesky.identifier",
            ));
        }
        if !(1..=100).contains(&bluesky.page_limit) {
            return Err(StatsError::validation_field(
                "page_limit must be between 1 and 100",
                "bluesky.page_limit",
            ));
        }
        if bluesky.max_pages == 0 {
            return Err(StatsError::validation_field(
                "max_pages must be greater than 0",
                "bluesky.max_pages",
            ));
        }
        if bluesky.rate_limit_per_sec == 0 {
            return Err(StatsError::validation_field(
                "rate_limit_per_sec must be greater than 0",
                "bluesky.rate_limit_per_sec",
            ));
        }

        if config.cache.ttl_secs == 0 {
            return Err(StatsError::validation_field(
                "ttl_secs must be greater than 0",
                "cache.ttl_secs",
            ));
        }
        if let StoreBackend::Memory { max_capacity: 0 } = config.cache.backend {
            return Err(StatsError::validation_field(
                "max_capacity must be greater than 0",
                "cache.backend.max_capacity",
            ));
        }

        config
            .stats
            .timezone
            .parse::<chrono_tz::Tz>()
            .map_err(|_| {
                StatsError::validation_field(
                    format!("unknown time zone '{}'", config.stats.timezone),
                    "stats.timezone",
                )
            })?;
        if !PERIODS.contains(&config.stats.default_period.as_str()) {
            return Err(StatsError::validation_field(
                format!(
                    "default_period must be one of {}",
                    PERIODS.join(", ")
                ),
                "stats.default_period",
            ));
        }

        Ok(())
    }
}
