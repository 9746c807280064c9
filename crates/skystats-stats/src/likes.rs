//! Site-wide like counter.

use crate::store::KvStore;
use skystats_common::Result;
use std::sync::Arc;
use tracing::{debug, warn};

/// Store key holding the counter.
pub const LIKES_KEY: &str = "likes";

/// A single counter kept as a decimal string in the store.
#[derive(Clone)]
pub struct LikeCounter {
    store: Arc<dyn KvStore>,
}

impl LikeCounter {
    /// Creates a counter on top of `store`.
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Current count; an absent or unreadable value counts as zero.
    pub async fn count(&self) -> Result<u64> {
        Ok(self
            .store
            .get(LIKES_KEY)
            .await?
            .as_deref()
            .map_or(0, parse_count))
    }

    /// Adds one like and returns the new count.
    pub async fn increment(&self) -> Result<u64> {
        let stored = self
            .store
            .update(
                LIKES_KEY,
                Box::new(|current| {
                    let count = current.as_deref().map_or(0, parse_count);
                    count.saturating_add(1).to_string()
                }),
            )
            .await?;
        let count = parse_count(&stored);
        debug!("Like count is now {}", count);
        Ok(count)
    }
}

fn parse_count(raw: &str) -> u64 {
    raw.trim().parse().unwrap_or_else(|_| {
        warn!("Ignoring unreadable like count {:?}", raw);
        0
    })
}
