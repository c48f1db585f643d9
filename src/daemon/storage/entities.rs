use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Accumulated usage of one domain within one day bucket.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
pub struct DomainUsage {
    #[serde(rename = "time_ms", with = "duration_ms")]
    pub time: Duration,
    #[serde(default)]
    pub favicon: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_visited: DateTime<Utc>,
}

/// One calendar day of usage, stored under a `YYYY-MM-DD` key.
#[derive(PartialEq, Eq, Debug, Default, Serialize, Deserialize, Clone)]
#[serde(transparent)]
pub struct DailyRecord(pub BTreeMap<String, DomainUsage>);

impl DailyRecord {
    /// Adds `duration` to the domain, creating the entry on first visit. Non positive durations
    /// are ignored so totals never go down.
    pub fn add(&mut self, domain: &str, duration: Duration, favicon: &str, at: DateTime<Utc>) {
        if duration <= Duration::zero() {
            return;
        }
        let usage = self
            .0
            .entry(domain.to_string())
            .or_insert_with(|| DomainUsage {
                time: Duration::zero(),
                favicon: favicon.to_string(),
                last_visited: at,
            });
        usage.time += duration;
        if at >= usage.last_visited {
            usage.last_visited = at;
            if !favicon.is_empty() {
                usage.favicon = favicon.to_string();
            }
        }
    }

    pub fn total(&self) -> Duration {
        self.0
            .values()
            .fold(Duration::zero(), |total, usage| total + usage.time)
    }
}

#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone, Copy)]
pub struct Settings {
    pub tracking_delay_seconds: u32,
}

impl Settings {
    pub const MIN_TRACKING_DELAY: u32 = 1;
    pub const MAX_TRACKING_DELAY: u32 = 100;

    pub fn is_valid(&self) -> bool {
        (Self::MIN_TRACKING_DELAY..=Self::MAX_TRACKING_DELAY).contains(&self.tracking_delay_seconds)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tracking_delay_seconds: 15,
        }
    }
}

/// Named window of day buckets summed during aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TimeRange {
    Today,
    Week,
    Month,
    Year,
    AllTime,
}

impl TimeRange {
    /// Whether a bucket for `date` belongs to the range when looking from `today`.
    pub fn contains(&self, date: NaiveDate, today: NaiveDate) -> bool {
        let distance = (today - date).num_days().abs();
        match self {
            TimeRange::Today => date == today,
            TimeRange::Week => distance < 7,
            TimeRange::Month => distance < 30,
            TimeRange::Year => distance < 365,
            TimeRange::AllTime => true,
        }
    }
}

#[derive(PartialEq, Eq, Debug, Clone)]
pub struct DomainTotal {
    pub domain: String,
    pub time: Duration,
    pub favicon: String,
    pub last_visited: DateTime<Utc>,
}

#[derive(PartialEq, Eq, Debug, Clone)]
pub struct AggregatedUsage {
    pub total_time: Duration,
    /// Sorted by time, longest first.
    pub by_domain: Vec<DomainTotal>,
}

#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Insights {
    pub most_active_day: Option<(NaiveDate, Duration)>,
    /// Average over the days that have any usage in the range.
    pub daily_average: Duration,
}

mod duration_ms {
    use chrono::Duration;
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(duration.num_milliseconds())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms = i64::deserialize(deserializer)?;
        Ok(Duration::milliseconds(ms))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate, TimeZone, Utc};
    use serde_json::json;

    use super::{DailyRecord, Settings, TimeRange};

    #[test]
    fn test_daily_record_accumulates() {
        let first = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let mut record = DailyRecord::default();
        record.add("a.com", Duration::seconds(20), "icon-1", first);
        record.add("a.com", Duration::seconds(30), "", first + Duration::minutes(1));
        record.add("a.com", Duration::seconds(-10), "icon-2", first + Duration::minutes(2));

        let usage = &record.0["a.com"];
        assert_eq!(usage.time, Duration::seconds(50));
        assert_eq!(usage.favicon, "icon-1");
        assert_eq!(usage.last_visited, first + Duration::minutes(1));
        assert_eq!(record.total(), Duration::seconds(50));
    }

    #[test]
    fn test_older_write_keeps_last_visit() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let mut record = DailyRecord::default();
        record.add("a.com", Duration::seconds(20), "new", at);
        record.add("a.com", Duration::seconds(20), "old", at - Duration::minutes(5));

        let usage = &record.0["a.com"];
        assert_eq!(usage.time, Duration::seconds(40));
        assert_eq!(usage.favicon, "new");
        assert_eq!(usage.last_visited, at);
    }

    #[test]
    fn test_daily_record_format() {
        let at = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let mut record = DailyRecord::default();
        record.add("a.com", Duration::milliseconds(15_500), "f", at);
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({"a.com": {"time_ms": 15_500, "favicon": "f", "last_visited": 1_700_000_000_000i64}})
        );
    }

    #[test]
    fn test_settings_bounds() {
        assert!(Settings::default().is_valid());
        assert!(!Settings { tracking_delay_seconds: 0 }.is_valid());
        assert!(Settings { tracking_delay_seconds: 100 }.is_valid());
        assert!(!Settings { tracking_delay_seconds: 101 }.is_valid());
    }

    #[test]
    fn test_time_range_contains() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 31).unwrap();
        let days_ago = |n: u64| today - chrono::Days::new(n);

        assert!(TimeRange::Today.contains(today, today));
        assert!(!TimeRange::Today.contains(days_ago(1), today));
        assert!(TimeRange::Week.contains(days_ago(6), today));
        assert!(!TimeRange::Week.contains(days_ago(7), today));
        assert!(TimeRange::Month.contains(days_ago(29), today));
        assert!(!TimeRange::Month.contains(days_ago(30), today));
        assert!(TimeRange::Year.contains(days_ago(364), today));
        assert!(!TimeRange::Year.contains(days_ago(365), today));
        assert!(TimeRange::AllTime.contains(days_ago(5000), today));
    }
}
