//! Stats lookup pipeline: validate, consult the cache, fetch, aggregate, store.

use crate::aggregator::Aggregator;
use crate::cache::{CacheEntry, StatsCache};
use crate::fetcher::SocialGraphSource;
use crate::types::GranularSeries;
use serde::Serialize;
use skystats_common::{Handle, StatsError};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

/// Successful lookup result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsReport {
    /// The handle that was looked up.
    pub actor: String,
    /// Followers bucketed at every granularity.
    pub follower_stats: GranularSeries,
    /// Accounts followed, bucketed at every granularity.
    pub follow_stats: GranularSeries,
    /// Whether the data came from a fresh cache entry.
    pub cached: bool,
    /// Epoch seconds at which the data was fetched.
    pub fetched_at: f64,
}

impl StatsReport {
    fn from_entry(actor: &Handle, entry: CacheEntry, cached: bool) -> Self {
        Self {
            actor: actor.to_string(),
            follower_stats: entry.follower_stats,
            follow_stats: entry.follow_stats,
            cached,
            fetched_at: entry.timestamp,
        }
    }

    /// Whether neither list has any dated record.
    pub fn is_empty(&self) -> bool {
        self.follower_stats.is_empty() && self.follow_stats.is_empty()
    }
}

/// Category of a failed lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum FailureKind {
    /// The handle failed local validation; nothing was fetched.
    InvalidHandle,
    /// The API asked us to slow down.
    RateLimited {
        /// Seconds until the quota resets, when known.
        retry_after_secs: Option<u64>,
    },
    /// The actor does not exist.
    NotFound,
    /// Any other fetch failure.
    Unavailable,
}

/// A failed lookup, safe to show to the user.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[error("{message}")]
pub struct LookupFailure {
    /// The input as received.
    pub actor: String,
    /// What went wrong.
    #[serde(flatten)]
    pub kind: FailureKind,
    /// User-facing explanation.
    pub message: String,
}

impl LookupFailure {
    /// Classifies `error` and replaces it with its user-facing message.
    pub fn from_error(actor: impl Into<String>, error: &StatsError) -> Self {
        let kind = match error {
            StatsError::Validation {
                field: Some(field), ..
            } if field == "handle" => FailureKind::InvalidHandle,
            StatsError::RateLimited { retry_after_secs } => FailureKind::RateLimited {
                retry_after_secs: *retry_after_secs,
            },
            StatsError::ActorNotFound { .. } => FailureKind::NotFound,
            _ => FailureKind::Unavailable,
        };
        Self {
            actor: actor.into(),
            kind,
            message: error.user_message(),
        }
    }

    /// Whether retrying the same lookup later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind, FailureKind::RateLimited { .. })
    }
}

/// Runs lookups against a graph source with a stats cache in front.
#[derive(Clone)]
pub struct StatsService {
    source: Arc<dyn SocialGraphSource>,
    cache: StatsCache,
    aggregator: Aggregator,
}

impl StatsService {
    /// Wires the pipeline together.
    pub fn new(source: Arc<dyn SocialGraphSource>, cache: StatsCache, aggregator: Aggregator) -> Self {
        Self {
            source,
            cache,
            aggregator,
        }
    }

    /// The cache in front of the source.
    pub fn cache(&self) -> &StatsCache {
        &self.cache
    }

    /// Looks up follower and follow statistics for `raw_handle`.
    ///
    /// A fresh cache entry is returned as is. Otherwise both lists are
    /// fetched, aggregated at every granularity, and written back to the
    /// cache before returning.
    #[instrument(skip(self))]
    pub async fn lookup(&self, raw_handle: &str) -> Result<StatsReport, LookupFailure> {
        let actor = Handle::parse(raw_handle).map_err(|e| {
            info!("Rejected handle {:?}: {}", raw_handle, e);
            LookupFailure::from_error(raw_handle, &e)
        })?;

        if let Some(entry) = self.cache.lookup(actor.as_str()).await {
            return Ok(StatsReport::from_entry(&actor, entry, true));
        }

        let entry = self
            .fetch_entry(&actor)
            .await
            .map_err(|e| {
                match &e {
                    StatsError::ActorNotFound { .. } => warn!("Unknown actor {}", actor),
                    StatsError::RateLimited { .. } => warn!("Lookup of {} rate limited", actor),
                    other => error!("Lookup of {} failed: {}", actor, other),
                }
                LookupFailure::from_error(actor.as_str(), &e)
            })?;

        self.cache.store(actor.as_str(), &entry).await;
        Ok(StatsReport::from_entry(&actor, entry, false))
    }

    /// Drops any cached entry for `raw_handle` so the next lookup refetches.
    pub async fn invalidate(&self, raw_handle: &str) -> Result<Handle, LookupFailure> {
        let actor =
            Handle::parse(raw_handle).map_err(|e| LookupFailure::from_error(raw_handle, &e))?;
        self.cache.invalidate(actor.as_str()).await;
        info!("Invalidated cached stats for {}", actor);
        Ok(actor)
    }

    async fn fetch_entry(&self, actor: &Handle) -> skystats_common::Result<CacheEntry> {
        let follows = self.source.follows(actor.as_str()).await?;
        let followers = self.source.followers(actor.as_str()).await?;
        info!(
            "Fetched {} followers and {} follows for {}",
            followers.len(),
            follows.len(),
            actor
        );

        Ok(CacheEntry::new(
            self.aggregator.aggregate_all(&followers),
            self.aggregator.aggregate_all(&follows),
        ))
    }
}
