//! End-to-end lookup pipeline tests over a file-backed cache.

use async_trait::async_trait;
use skystats_common::test_utils::{init_test_logging, record_fixtures};
use skystats_common::{Result, StatsError};
use skystats_stats::{
    Aggregator, FailureKind, FileStore, KvStore, LikeCounter, ProfileView, SocialGraphSource,
    StatsCache, StatsService,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Serves canned lists and counts calls.
struct CannedSource {
    followers: Vec<ProfileView>,
    follows: Vec<ProfileView>,
    calls: AtomicUsize,
}

impl CannedSource {
    fn new(followers: &[&str], follows: &[&str]) -> Self {
        Self {
            followers: to_profiles(followers),
            follows: to_profiles(follows),
            calls: AtomicUsize::new(0),
        }
    }
}

fn to_profiles(created: &[&str]) -> Vec<ProfileView> {
    created
        .iter()
        .enumerate()
        .map(|(i, at)| ProfileView::new(format!("did:plc:{i}"), format!("u{i}.bsky.social")).created(*at))
        .collect()
}

#[async_trait]
impl SocialGraphSource for CannedSource {
    async fn followers(&self, actor: &str) -> Result<Vec<ProfileView>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if actor == "ghost.bsky.social" {
            return Err(StatsError::actor_not_found(actor));
        }
        Ok(self.followers.clone())
    }

    async fn follows(&self, _actor: &str) -> Result<Vec<ProfileView>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.follows.clone())
    }
}

#[tokio::test]
async fn test_lookup_persists_across_service_instances() {
    init_test_logging();
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(CannedSource::new(
        &["2024-01-05", "2024-01-20", "2024-02-01"],
        &["2023-12-31T23:00:00Z"],
    ));

    let first = {
        let store: Arc<dyn KvStore> = Arc::new(FileStore::open(dir.path()).await.unwrap());
        let cache = StatsCache::new(store, Duration::from_secs(3600));
        StatsService::new(source.clone(), cache, Aggregator::default())
            .lookup("alice.bsky.social")
            .await
            .unwrap()
    };
    assert!(!first.cached);
    assert_eq!(source.calls.load(Ordering::SeqCst), 2);

    let json = serde_json::to_value(&first.follower_stats.month).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "2024-02": {"change": 1, "cumTotal": 3},
            "2024-01": {"change": 2, "cumTotal": 2},
        })
    );

    let store: Arc<dyn KvStore> = Arc::new(FileStore::open(dir.path()).await.unwrap());
    let cache = StatsCache::new(store, Duration::from_secs(3600));
    let second = StatsService::new(source.clone(), cache, Aggregator::default())
        .lookup("alice.bsky.social")
        .await
        .unwrap();
    assert!(second.cached);
    assert_eq!(second.follow_stats, first.follow_stats);
    assert_eq!(source.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_display_timezone_applies_to_stored_series() {
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn KvStore> = Arc::new(FileStore::open(dir.path()).await.unwrap());
    let cache = StatsCache::new(store, Duration::from_secs(3600));
    let source = Arc::new(CannedSource::new(&["2024-01-31T23:30:00Z"], &[]));
    let service = StatsService::new(
        source,
        cache,
        Aggregator::from_timezone_name("Asia/Tokyo").unwrap(),
    );

    let report = service.lookup("tokyo.bsky.social").await.unwrap();
    assert!(report.follower_stats.month.get("2024-02").is_some());
    assert!(report.follow_stats.is_empty());
    assert!(!report.is_empty());
}

#[tokio::test]
async fn test_unknown_actor_is_not_cached() {
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn KvStore> = Arc::new(FileStore::open(dir.path()).await.unwrap());
    let cache = StatsCache::new(store.clone(), Duration::from_secs(3600));
    let service = StatsService::new(
        Arc::new(CannedSource::new(&[], &[])),
        cache,
        Aggregator::default(),
    );

    let failure = service.lookup("ghost.bsky.social").await.unwrap_err();
    assert_eq!(failure.kind, FailureKind::NotFound);
    assert_eq!(store.get("stats-ghost.bsky.social").await.unwrap(), None);
}

#[tokio::test]
async fn test_likes_share_the_store_with_stats() {
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn KvStore> = Arc::new(FileStore::open(dir.path()).await.unwrap());
    let likes = LikeCounter::new(store.clone());
    let cache = StatsCache::new(store, Duration::from_secs(3600));
    let service = StatsService::new(
        Arc::new(CannedSource::new(
            &[],
            &record_fixtures::january_february_2024()
                .iter()
                .flatten()
                .map(String::as_str)
                .collect::<Vec<_>>(),
        )),
        cache,
        Aggregator::default(),
    );

    service.lookup("dana.bsky.social").await.unwrap();
    assert_eq!(likes.increment().await.unwrap(), 1);
    assert_eq!(likes.count().await.unwrap(), 1);
    assert!(service.lookup("dana.bsky.social").await.unwrap().cached);
}
