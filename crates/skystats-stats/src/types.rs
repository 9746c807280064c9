//! Period keys, per-period statistics, and aggregated series.

use chrono::{Datelike, NaiveDate};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use skystats_common::StatsError;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Calendar bucket size used when grouping records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    /// `YYYY-MM`
    #[default]
    Month,
    /// `YYYY-MM-Wnn`
    Week,
    /// `YYYY-MM-DD`
    Day,
}

impl Granularity {
    /// All granularities, coarsest first.
    pub const ALL: [Self; 3] = [Self::Month, Self::Week, Self::Day];

    /// Bucket label for a calendar date.
    ///
    /// Weeks keep the date's own calendar year and month and append the
    /// ISO-8601 week number, so a date in early January can carry week 52
    /// or 53 and a date in late December can carry week 01.
    pub fn period_key(self, date: NaiveDate) -> PeriodKey {
        let key = match self {
            Self::Month => format!("{:04}-{:02}", date.year(), date.month()),
            Self::Week => format!(
                "{:04}-{:02}-W{:02}",
                date.year(),
                date.month(),
                date.iso_week().week()
            ),
            Self::Day => format!(
                "{:04}-{:02}-{:02}",
                date.year(),
                date.month(),
                date.day()
            ),
        };
        PeriodKey(key)
    }

    /// Lowercase identifier used in URLs and JSON.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Month => "month",
            Self::Week => "week",
            Self::Day => "day",
        }
    }

    /// Capitalized name for headings.
    pub fn label(self) -> &'static str {
        match self {
            Self::Month => "Month",
            Self::Week => "Week",
            Self::Day => "Day",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = StatsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "month" | "monthly" => Ok(Self::Month),
            "week" | "weekly" => Ok(Self::Week),
            "day" | "daily" => Ok(Self::Day),
            other => Err(StatsError::validation_field(
                format!("unknown period '{other}'"),
                "period",
            )),
        }
    }
}

/// Label of a calendar bucket. Lexicographic order is chronological order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeriodKey(String);

impl PeriodKey {
    /// Wraps an already formatted key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::borrow::Borrow<str> for PeriodKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Count of records in one period and the running total up to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodStats {
    /// Records falling in this period.
    pub change: u64,
    /// Sum of `change` over this and every earlier period.
    pub cum_total: u64,
}

/// Per-period statistics keyed by [`PeriodKey`].
///
/// Stored ascending; iterated and serialized newest first.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AggregatedSeries {
    periods: BTreeMap<PeriodKey, PeriodStats>,
}

impl AggregatedSeries {
    /// Builds the series from per-period counts, computing running totals
    /// in ascending key order.
    pub fn from_counts(counts: BTreeMap<PeriodKey, u64>) -> Self {
        let mut cumulative = 0u64;
        let periods = counts
            .into_iter()
            .map(|(key, change)| {
                cumulative += change;
                (
                    key,
                    PeriodStats {
                        change,
                        cum_total: cumulative,
                    },
                )
            })
            .collect();
        Self { periods }
    }

    /// Number of periods.
    pub fn len(&self) -> usize {
        self.periods.len()
    }

    /// Whether no period holds any record.
    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    /// Stats for one period.
    pub fn get(&self, key: &str) -> Option<&PeriodStats> {
        self.periods.get(key)
    }

    /// Newest period first, the display order.
    pub fn iter_desc(&self) -> impl Iterator<Item = (&PeriodKey, &PeriodStats)> {
        self.periods.iter().rev()
    }

    /// Oldest period first, the arithmetic order.
    pub fn iter_asc(&self) -> impl Iterator<Item = (&PeriodKey, &PeriodStats)> {
        self.periods.iter()
    }

    /// The most recent period.
    pub fn latest(&self) -> Option<(&PeriodKey, &PeriodStats)> {
        self.periods.iter().next_back()
    }

    /// Running total at the most recent period; equals the record count.
    pub fn total(&self) -> u64 {
        self.latest().map_or(0, |(_, stats)| stats.cum_total)
    }

    /// Checks the running-total invariant over ascending keys.
    ///
    /// Entries read back from storage go through this before use.
    pub fn is_consistent(&self) -> bool {
        let mut cumulative = 0u64;
        self.periods.values().all(|stats| {
            cumulative += stats.change;
            stats.cum_total == cumulative
        })
    }
}

impl Serialize for AggregatedSeries {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.periods.len()))?;
        for (key, stats) in self.iter_desc() {
            map.serialize_entry(key, stats)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for AggregatedSeries {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        BTreeMap::deserialize(deserializer).map(|periods| Self { periods })
    }
}

/// One list aggregated at every granularity.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GranularSeries {
    /// `YYYY-MM` buckets.
    pub month: AggregatedSeries,
    /// `YYYY-MM-Wnn` buckets.
    pub week: AggregatedSeries,
    /// `YYYY-MM-DD` buckets.
    pub day: AggregatedSeries,
}

impl GranularSeries {
    /// The series for one granularity.
    pub fn get(&self, granularity: Granularity) -> &AggregatedSeries {
        match granularity {
            Granularity::Month => &self.month,
            Granularity::Week => &self.week,
            Granularity::Day => &self.day,
        }
    }

    /// Whether the list had no dated records.
    pub fn is_empty(&self) -> bool {
        self.month.is_empty()
    }

    /// Every granularity satisfies the running-total invariant.
    pub fn is_consistent(&self) -> bool {
        Granularity::ALL
            .iter()
            .all(|granularity| self.get(*granularity).is_consistent())
    }
}
