//! Time-bucketing of timestamped records into per-period statistics.

use crate::types::{AggregatedSeries, Granularity, GranularSeries, PeriodKey};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use skystats_common::{Result, StatsError};
use std::collections::BTreeMap;
use tracing::{debug, instrument};

/// Anything carrying an optional ISO-8601 creation timestamp.
pub trait TimedRecord {
    /// The raw `createdAt` value, if the record has one.
    fn created_at(&self) -> Option<&str>;
}

impl TimedRecord for Option<String> {
    fn created_at(&self) -> Option<&str> {
        self.as_deref()
    }
}

impl TimedRecord for String {
    fn created_at(&self) -> Option<&str> {
        Some(self)
    }
}

impl TimedRecord for &str {
    fn created_at(&self) -> Option<&str> {
        Some(self)
    }
}

impl<T: TimedRecord> TimedRecord for &T {
    fn created_at(&self) -> Option<&str> {
        (*self).created_at()
    }
}

/// Groups records into calendar periods of a display time zone.
#[derive(Debug, Clone, Copy)]
pub struct Aggregator {
    timezone: Tz,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new(Tz::UTC)
    }
}

impl Aggregator {
    /// Creates an aggregator that places timestamps on the calendar of `timezone`.
    pub fn new(timezone: Tz) -> Self {
        Self { timezone }
    }

    /// Creates an aggregator from an IANA zone name such as `Europe/Berlin`.
    pub fn from_timezone_name(name: &str) -> Result<Self> {
        name.parse::<Tz>()
            .map(Self::new)
            .map_err(|_| StatsError::validation_field(format!("unknown time zone '{name}'"), "timezone"))
    }

    /// The display time zone.
    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Calendar date of a raw timestamp in the display zone.
    ///
    /// Accepts RFC 3339 with an offset, a date-time without offset (taken as
    /// wall time in the display zone), or a bare `YYYY-MM-DD` (taken as UTC
    /// midnight). Anything else yields `None`.
    pub fn local_date(&self, raw: &str) -> Option<NaiveDate> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
            return Some(timestamp.with_timezone(&self.timezone).date_naive());
        }
        if let Ok(wall_time) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
            return Some(wall_time.date());
        }
        if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            let midnight = date.and_hms_opt(0, 0, 0)?;
            return Some(
                Utc.from_utc_datetime(&midnight)
                    .with_timezone(&self.timezone)
                    .date_naive(),
            );
        }
        None
    }

    /// Aggregates `records` at one granularity.
    ///
    /// Records without a parseable timestamp are skipped. Never fails.
    #[instrument(skip(self, records), fields(records = records.len(), granularity = %granularity))]
    pub fn aggregate<R: TimedRecord>(
        &self,
        records: &[R],
        granularity: Granularity,
    ) -> AggregatedSeries {
        let ([series], skipped) = self.bucket(records, [granularity]);
        debug!(
            "Aggregated {} records into {} periods ({} skipped)",
            records.len() - skipped,
            series.len(),
            skipped
        );
        series
    }

    /// Aggregates `records` at every granularity, parsing each timestamp once.
    #[instrument(skip(self, records), fields(records = records.len()))]
    pub fn aggregate_all<R: TimedRecord>(&self, records: &[R]) -> GranularSeries {
        let ([month, week, day], skipped) = self.bucket(records, Granularity::ALL);
        debug!(
            "Aggregated {} dated records: {} months, {} weeks, {} days ({} skipped)",
            month.total(),
            month.len(),
            week.len(),
            day.len(),
            skipped
        );
        GranularSeries { month, week, day }
    }

    /// Counts records per period for each of `granularities` and accumulates
    /// the totals. Returns the series in the same order plus the number of
    /// records without a usable timestamp.
    fn bucket<R: TimedRecord, const N: usize>(
        &self,
        records: &[R],
        granularities: [Granularity; N],
    ) -> ([AggregatedSeries; N], usize) {
        let mut counts: [BTreeMap<PeriodKey, u64>; N] = std::array::from_fn(|_| BTreeMap::new());
        let mut skipped = 0usize;

        for record in records {
            let Some(date) = self.record_date(record) else {
                skipped += 1;
                continue;
            };
            for (granularity, buckets) in granularities.iter().zip(counts.iter_mut()) {
                *buckets.entry(granularity.period_key(date)).or_insert(0) += 1;
            }
        }

        (counts.map(AggregatedSeries::from_counts), skipped)
    }

    fn record_date<R: TimedRecord>(&self, record: &R) -> Option<NaiveDate> {
        record.created_at().and_then(|raw| self.local_date(raw))
    }
}

/// Month buckets in UTC.
pub fn aggregate_by_month<R: TimedRecord>(records: &[R]) -> AggregatedSeries {
    Aggregator::default().aggregate(records, Granularity::Month)
}

/// ISO-week buckets labelled with calendar year and month, in UTC.
pub fn aggregate_by_week<R: TimedRecord>(records: &[R]) -> AggregatedSeries {
    Aggregator::default().aggregate(records, Granularity::Week)
}

/// Day buckets in UTC.
pub fn aggregate_by_day<R: TimedRecord>(records: &[R]) -> AggregatedSeries {
    Aggregator::default().aggregate(records, Granularity::Day)
}
