//! Shared handler state.

use crate::error::WebResult;
use skystats_config::Config;
use skystats_stats::{
    build_store, counter_store, Aggregator, BlueskyClient, Granularity, LikeCounter, StatsCache, StatsService,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Services every handler can reach.
#[derive(Clone)]
pub struct AppState {
    /// Lookup pipeline.
    pub service: StatsService,
    /// Site-wide like counter.
    pub likes: LikeCounter,
    /// Period shown when a request doesn't pick one.
    pub default_period: Granularity,
}

impl AppState {
    /// Bundles already constructed services.
    pub fn new(service: StatsService, likes: LikeCounter, default_period: Granularity) -> Self {
        Self {
            service,
            likes,
            default_period,
        }
    }

    /// Builds the stores, client, cache and pipeline described by `config`.
    pub async fn from_config(config: &Config) -> WebResult<Self> {
        let store = build_store(&config.cache.backend).await?;
        let likes_store = counter_store(&config.cache.backend, &store);
        let client = BlueskyClient::new(&config.bluesky)?;
        let aggregator = Aggregator::from_timezone_name(&config.stats.timezone)?;
        let cache = StatsCache::new(store.clone(), Duration::from_secs(config.cache.ttl_secs));
        let default_period: Granularity = config.stats.default_period.parse()?;

        info!(
            "Stats cached for {}s, bucketed in {}, default period {}",
            config.cache.ttl_secs,
            aggregator.timezone(),
            default_period
        );

        Ok(Self::new(
            StatsService::new(Arc::new(client), cache, aggregator),
            LikeCounter::new(likes_store),
            default_period,
        ))
    }

    /// Parses a `period` query value, falling back to the default.
    pub fn period(&self, requested: Option<&str>) -> Granularity {
        requested
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(self.default_period)
    }
}
