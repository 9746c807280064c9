//! # SkyStats Stats
//!
//! Follower and following statistics for Bluesky accounts.
//!
//! This crate fetches an actor's social graph, buckets profile creation
//! timestamps into calendar periods with running totals, and keeps the
//! results in a freshness-checked cache. Chart data preparation and SVG
//! rendering with plotters live here as well.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod aggregator;
pub mod cache;
pub mod chart;
pub mod fetcher;
pub mod likes;
pub mod service;
pub mod store;
pub mod types;

pub use aggregator::{aggregate_by_day, aggregate_by_month, aggregate_by_week, Aggregator, TimedRecord};
pub use cache::{CacheEntry, StatsCache};
pub use fetcher::{BlueskyClient, ProfileView, SocialGraphSource};
pub use likes::LikeCounter;
pub use service::{FailureKind, LookupFailure, StatsReport, StatsService};
pub use store::{build_store, counter_store, FileStore, KvStore, MemoryStore, UpdateFn};
pub use types::*;
