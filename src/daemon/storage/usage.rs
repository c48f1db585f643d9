use std::{collections::BTreeMap, sync::Arc};

use anyhow::{bail, Result};
use chrono::{Duration, NaiveDate};
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::utils::{
    clock::Clock,
    time::{day_key, parse_day_key},
};

use super::{
    entities::{AggregatedUsage, DailyRecord, DomainTotal, Insights, Settings, TimeRange},
    kv::{Items, KeyValueStore},
};

pub const WHITELIST_KEY: &str = "whitelist";
pub const SETTINGS_KEY: &str = "settings";
/// Unreadable day buckets are moved under this prefix on the next write.
pub const CORRUPTED_PREFIX: &str = "corrupted-";

/// Day bucketed usage on top of a [KeyValueStore]. The tracker is its only writer of buckets,
/// the cli reads buckets and manages the whitelist and settings.
pub struct UsageStore<S> {
    store: S,
    clock: Arc<dyn Clock>,
}

impl<S: KeyValueStore> UsageStore<S> {
    pub fn new(store: S, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Adds `duration` to today's bucket of `domain`. Returns whether anything was written:
    /// empty domains, non positive durations and whitelisted domains are dropped.
    pub async fn record(&self, domain: &str, duration: Duration, favicon: &str) -> Result<bool> {
        if domain.is_empty() || duration <= Duration::zero() {
            return Ok(false);
        }

        let today = day_key(self.clock.today());
        let mut items = self.store.get(&[today.as_str(), WHITELIST_KEY]).await?;

        if whitelist_from(&items).iter().any(|d| d == domain) {
            debug!("Skipping whitelisted {domain}");
            return Ok(false);
        }

        let mut update = Items::new();
        let mut bucket = match items.remove(&today) {
            Some(value) => match serde_json::from_value::<DailyRecord>(value.clone()) {
                Ok(bucket) => bucket,
                Err(e) => {
                    // Keep the unreadable bucket around, today's time goes into a fresh one.
                    error!("Bucket {today} is corrupted {e}, moving it aside");
                    update.insert(format!("{CORRUPTED_PREFIX}{today}"), value);
                    DailyRecord::default()
                }
            },
            None => DailyRecord::default(),
        };
        bucket.add(domain, duration, favicon, self.clock.time());
        update.insert(today, serde_json::to_value(&bucket)?);
        self.store.set(update).await?;
        Ok(true)
    }

    /// Sums all buckets of `range`. Domains are sorted by time, longest first.
    pub async fn aggregate(&self, range: TimeRange) -> Result<AggregatedUsage> {
        let mut totals = BTreeMap::<String, DomainTotal>::new();

        for (_, bucket) in self.buckets_in(range).await? {
            for (domain, usage) in bucket.0 {
                let total = totals.entry(domain.clone()).or_insert_with(|| DomainTotal {
                    domain,
                    time: Duration::zero(),
                    favicon: usage.favicon.clone(),
                    last_visited: usage.last_visited,
                });
                total.time += usage.time;
                if usage.last_visited > total.last_visited {
                    total.last_visited = usage.last_visited;
                    total.favicon = usage.favicon;
                }
            }
        }

        let mut by_domain = totals.into_values().collect::<Vec<_>>();
        // Stable sort keeps equal times in domain order.
        by_domain.sort_by(|a, b| b.time.cmp(&a.time));

        let total_time = by_domain
            .iter()
            .fold(Duration::zero(), |total, v| total + v.time);

        Ok(AggregatedUsage {
            total_time,
            by_domain,
        })
    }

    pub async fn insights(&self, range: TimeRange) -> Result<Insights> {
        let days = self
            .buckets_in(range)
            .await?
            .into_iter()
            .map(|(date, bucket)| (date, bucket.total()))
            .filter(|(_, total)| *total > Duration::zero())
            .collect::<Vec<_>>();

        // Earliest day wins a tie, buckets come sorted by date.
        let most_active_day = days
            .iter()
            .copied()
            .fold(None, |best: Option<(NaiveDate, Duration)>, day| match best {
                Some(best) if best.1 >= day.1 => Some(best),
                _ => Some(day),
            });

        let total = days
            .iter()
            .fold(Duration::zero(), |total, (_, time)| total + *time);
        let daily_average = if days.is_empty() {
            Duration::zero()
        } else {
            total / days.len() as i32
        };

        Ok(Insights {
            most_active_day,
            daily_average,
        })
    }

    /// Per day totals of a single domain, oldest day first. Days without the domain are skipped.
    pub async fn domain_history(
        &self,
        domain: &str,
        range: TimeRange,
    ) -> Result<Vec<(NaiveDate, Duration)>> {
        Ok(self
            .buckets_in(range)
            .await?
            .into_iter()
            .filter_map(|(date, bucket)| bucket.0.get(domain).map(|usage| (date, usage.time)))
            .collect())
    }

    pub async fn whitelist(&self) -> Result<Vec<String>> {
        let items = self.store.get(&[WHITELIST_KEY]).await?;
        Ok(whitelist_from(&items))
    }

    /// Returns false when the domain was already excluded.
    pub async fn add_to_whitelist(&self, domain: &str) -> Result<bool> {
        let mut whitelist = self.whitelist().await?;
        if whitelist.iter().any(|d| d == domain) {
            return Ok(false);
        }
        whitelist.push(domain.to_string());
        self.save_whitelist(whitelist).await?;
        Ok(true)
    }

    /// Returns false when the domain wasn't excluded.
    pub async fn remove_from_whitelist(&self, domain: &str) -> Result<bool> {
        let whitelist = self.whitelist().await?;
        let before = whitelist.len();
        let whitelist = whitelist
            .into_iter()
            .filter(|d| d != domain)
            .collect::<Vec<_>>();
        let removed = whitelist.len() != before;
        self.save_whitelist(whitelist).await?;
        Ok(removed)
    }

    pub async fn settings(&self) -> Result<Settings> {
        let mut items = self.store.get(&[SETTINGS_KEY]).await?;
        match items.remove(SETTINGS_KEY) {
            Some(value) => match serde_json::from_value::<Settings>(value) {
                Ok(settings) if settings.is_valid() => Ok(settings),
                Ok(settings) => {
                    warn!("Stored settings are out of range {settings:?}, using defaults");
                    Ok(Settings::default())
                }
                Err(e) => {
                    warn!("Stored settings are corrupted {e}, using defaults");
                    Ok(Settings::default())
                }
            },
            None => Ok(Settings::default()),
        }
    }

    pub async fn set_settings(&self, settings: Settings) -> Result<()> {
        if !settings.is_valid() {
            bail!(
                "Tracking delay must be between {} and {} seconds, got {}",
                Settings::MIN_TRACKING_DELAY,
                Settings::MAX_TRACKING_DELAY,
                settings.tracking_delay_seconds
            );
        }
        let mut update = Items::new();
        update.insert(SETTINGS_KEY.into(), serde_json::to_value(settings)?);
        self.store.set(update).await
    }

    async fn save_whitelist(&self, whitelist: Vec<String>) -> Result<()> {
        let mut update = Items::new();
        update.insert(WHITELIST_KEY.into(), serde_json::to_value(whitelist)?);
        self.store.set(update).await
    }

    /// Day buckets within `range`, sorted by date. Keys that aren't dates are not buckets.
    async fn buckets_in(&self, range: TimeRange) -> Result<Vec<(NaiveDate, DailyRecord)>> {
        let today = self.clock.today();
        let items = self.store.get_all().await?;

        let mut buckets = Vec::new();
        for (key, value) in items {
            let Some(date) = parse_day_key(&key) else {
                continue;
            };
            if !range.contains(date, today) {
                continue;
            }
            match serde_json::from_value::<DailyRecord>(value) {
                Ok(bucket) => buckets.push((date, bucket)),
                // Skip a broken bucket instead of hiding every other day.
                Err(e) => warn!("Bucket {key} is corrupted {e}"),
            }
        }
        buckets.sort_by_key(|(date, _)| *date);
        Ok(buckets)
    }
}

fn whitelist_from(items: &Items) -> Vec<String> {
    match items.get(WHITELIST_KEY) {
        Some(Value::Array(values)) => values
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}
