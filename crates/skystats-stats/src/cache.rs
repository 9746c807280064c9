//! Stats cache with a fixed freshness window on top of a [`KvStore`].
//!
//! Every operation is best-effort: a failing store or an undecodable entry is
//! logged and treated as a miss, never surfaced to the caller.

use crate::store::KvStore;
use crate::types::GranularSeries;
use serde::{Deserialize, Serialize};
use skystats_common::now_epoch_seconds;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Prefix of every stats key in the store.
pub const CACHE_KEY_PREFIX: &str = "stats-";

/// Aggregated follower and follow statistics for one actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    /// Followers bucketed at every granularity.
    pub follower_stats: GranularSeries,
    /// Accounts followed, bucketed at every granularity.
    pub follow_stats: GranularSeries,
    /// Creation time, epoch seconds.
    pub timestamp: f64,
}

impl CacheEntry {
    /// Wraps freshly aggregated series, stamped with the current time.
    pub fn new(follower_stats: GranularSeries, follow_stats: GranularSeries) -> Self {
        Self::with_timestamp(follower_stats, follow_stats, now_epoch_seconds())
    }

    /// Wraps series with an explicit creation time.
    pub fn with_timestamp(
        follower_stats: GranularSeries,
        follow_stats: GranularSeries,
        timestamp: f64,
    ) -> Self {
        Self {
            follower_stats,
            follow_stats,
            timestamp,
        }
    }

    /// Age in seconds at `now`.
    pub fn age_at(&self, now: f64) -> f64 {
        now - self.timestamp
    }

    /// Whether the entry is still usable at `now`. The window is half-open.
    pub fn is_fresh_at(&self, now: f64, ttl: Duration) -> bool {
        self.age_at(now) < ttl.as_secs_f64()
    }

    /// Whether both lists satisfy the running-total invariant.
    pub fn is_consistent(&self) -> bool {
        self.follower_stats.is_consistent() && self.follow_stats.is_consistent()
    }
}

/// Freshness-checked access to cached stats.
#[derive(Clone)]
pub struct StatsCache {
    store: Arc<dyn KvStore>,
    ttl: Duration,
}

impl StatsCache {
    /// Creates a cache over `store` whose entries stay fresh for `ttl`.
    pub fn new(store: Arc<dyn KvStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Freshness window.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Store key for an actor.
    pub fn key_for(actor: &str) -> String {
        format!("{CACHE_KEY_PREFIX}{actor}")
    }

    /// Returns the entry for `actor` if one exists and is fresh now.
    pub async fn lookup(&self, actor: &str) -> Option<CacheEntry> {
        self.lookup_at(actor, now_epoch_seconds()).await
    }

    /// Returns the entry for `actor` if one exists and is fresh at `now`.
    ///
    /// Stale entries are left in place.
    #[instrument(skip(self))]
    pub async fn lookup_at(&self, actor: &str, now: f64) -> Option<CacheEntry> {
        let raw = match self.store.get(&Self::key_for(actor)).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("Cache miss for {}", actor);
                return None;
            }
            Err(e) => {
                warn!("Cache read failed for {}: {}", actor, e);
                return None;
            }
        };

        let entry: CacheEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Discarding undecodable cache entry for {}: {}", actor, e);
                return None;
            }
        };
        if !entry.is_consistent() {
            warn!("Discarding inconsistent cache entry for {}", actor);
            return None;
        }
        if !entry.is_fresh_at(now, self.ttl) {
            debug!(
                "Cache entry for {} is stale ({:.0}s old)",
                actor,
                entry.age_at(now)
            );
            return None;
        }

        debug!("Cache hit for {}", actor);
        Some(entry)
    }

    /// Writes `entry` for `actor`, replacing any previous one.
    #[instrument(skip(self, entry))]
    pub async fn store(&self, actor: &str, entry: &CacheEntry) {
        let raw = match serde_json::to_string(entry) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Failed to encode cache entry for {}: {}", actor, e);
                return;
            }
        };
        match self.store.put(&Self::key_for(actor), raw).await {
            Ok(()) => debug!("Cached stats for {}", actor),
            Err(e) => warn!("Cache write failed for {}: {}", actor, e),
        }
    }

    /// Removes the entry for `actor`.
    #[instrument(skip(self))]
    pub async fn invalidate(&self, actor: &str) {
        if let Err(e) = self.store.delete(&Self::key_for(actor)).await {
            warn!("Cache invalidation failed for {}: {}", actor, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::Aggregator;
    use crate::store::{MemoryStore, UpdateFn};
    use async_trait::async_trait;
    use skystats_common::test_utils::record_fixtures;
    use skystats_common::{Result, StatsError};

    const T: f64 = 1_700_000_000.0;

    fn cache() -> StatsCache {
        StatsCache::new(Arc::new(MemoryStore::new(16)), Duration::from_secs(3600))
    }

    fn entry_at(timestamp: f64) -> CacheEntry {
        let series = Aggregator::default().aggregate_all(&record_fixtures::january_february_2024());
        CacheEntry::with_timestamp(series.clone(), series, timestamp)
    }

    #[tokio::test]
    async fn test_fresh_then_stale() {
        let cache = cache();
        cache.store("alice.bsky.social", &entry_at(T)).await;

        assert!(cache.lookup_at("alice.bsky.social", T + 3599.0).await.is_some());
        assert!(cache.lookup_at("alice.bsky.social", T + 3600.0).await.is_none());
        assert!(cache.lookup_at("alice.bsky.social", T + 3601.0).await.is_none());
    }

    #[tokio::test]
    async fn test_stale_entry_is_not_deleted() {
        let store = Arc::new(MemoryStore::new(16));
        let cache = StatsCache::new(store.clone(), Duration::from_secs(3600));
        cache.store("alice.bsky.social", &entry_at(T)).await;

        assert!(cache.lookup_at("alice.bsky.social", T + 7200.0).await.is_none());
        assert!(store.get("stats-alice.bsky.social").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_invalidate_and_overwrite() {
        let cache = cache();
        cache.store("bob.bsky.social", &entry_at(T)).await;
        cache.invalidate("bob.bsky.social").await;
        assert!(cache.lookup_at("bob.bsky.social", T + 1.0).await.is_none());

        cache.store("bob.bsky.social", &entry_at(T)).await;
        cache.store("bob.bsky.social", &entry_at(T + 100.0)).await;
        let entry = cache.lookup_at("bob.bsky.social", T + 3650.0).await.unwrap();
        assert_eq!(entry.timestamp, T + 100.0);
    }

    #[tokio::test]
    async fn test_entry_wire_format() {
        let json = serde_json::to_value(entry_at(T)).unwrap();
        assert_eq!(json["timestamp"], serde_json::json!(T));
        assert_eq!(
            json["followerStats"]["month"]["2024-02"]["cumTotal"],
            serde_json::json!(3)
        );
        assert!(json["followStats"]["day"].is_object());
    }

    #[tokio::test]
    async fn test_garbage_and_inconsistent_entries_are_misses() {
        let store = Arc::new(MemoryStore::new(16));
        let cache = StatsCache::new(store.clone(), Duration::from_secs(3600));

        store
            .put("stats-carol.bsky.social", "not json".to_string())
            .await
            .unwrap();
        assert!(cache.lookup_at("carol.bsky.social", T).await.is_none());

        let mut tampered = serde_json::to_value(entry_at(T)).unwrap();
        tampered["followerStats"]["month"]["2024-02"]["cumTotal"] = serde_json::json!(99);
        store
            .put("stats-carol.bsky.social", tampered.to_string())
            .await
            .unwrap();
        assert!(cache.lookup_at("carol.bsky.social", T).await.is_none());
    }

    struct BrokenStore;

    #[async_trait]
    impl KvStore for BrokenStore {
        async fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(StatsError::store("backend offline"))
        }
        async fn put(&self, _key: &str, _value: String) -> Result<()> {
            Err(StatsError::store("backend offline"))
        }
        async fn delete(&self, _key: &str) -> Result<()> {
            Err(StatsError::store("backend offline"))
        }
        async fn update(&self, _key: &str, _f: UpdateFn) -> Result<String> {
            Err(StatsError::store("backend offline"))
        }
    }

    #[tokio::test]
    async fn test_store_failures_are_swallowed() {
        let cache = StatsCache::new(Arc::new(BrokenStore), Duration::from_secs(3600));
        cache.store("dave.bsky.social", &entry_at(T)).await;
        assert!(cache.lookup_at("dave.bsky.social", T).await.is_none());
        cache.invalidate("dave.bsky.social").await;
    }
}
