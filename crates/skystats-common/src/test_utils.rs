//! Test utilities and shared test helpers for SkyStats.
//!
//! Enabled for other crates through the `testing` feature.

use chrono::{DateTime, TimeZone, Utc};
use std::sync::Once;
use tracing_subscriber::{fmt, EnvFilter};

static INIT: Once = Once::new();

/// Initialize logging for tests. Safe to call from every test.
pub fn init_test_logging() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
        let _ = fmt()
            .with_test_writer()
            .with_env_filter(filter)
            .try_init();
    });
}

/// Test fixture for creating a fixed UTC timestamp.
pub fn mock_timestamp(
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    min: u32,
    sec: u32,
) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, min, sec)
        .unwrap()
}

/// Canned `createdAt` values for aggregation tests.
pub mod record_fixtures {
    use super::*;

    /// Wraps each string as a present `createdAt`.
    pub fn created_at(values: &[&str]) -> Vec<Option<String>> {
        values.iter().map(|v| Some((*v).to_string())).collect()
    }

    /// The three-record month example: two in January, one in February 2024.
    pub fn january_february_2024() -> Vec<Option<String>> {
        created_at(&["2024-01-05", "2024-01-20", "2024-02-01"])
    }

    /// One record per day for `days` days starting at `start`, as RFC 3339.
    pub fn daily_series(days: i64, start: DateTime<Utc>) -> Vec<Option<String>> {
        (0..days)
            .map(|i| Some((start + chrono::Duration::days(i)).to_rfc3339()))
            .collect()
    }

    /// Mixed valid, missing, and garbage timestamps.
    pub fn with_noise() -> Vec<Option<String>> {
        vec![
            Some("2024-03-01T10:00:00.000Z".to_string()),
            None,
            Some("not a date".to_string()),
            Some(String::new()),
            Some("2024-03-15T23:59:59Z".to_string()),
        ]
    }
}
