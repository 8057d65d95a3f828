use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Demand class a departure date falls into. Weekday and weekend fares follow
/// different distributions, so historical samples are never pooled across the
/// two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateBucket {
    Weekday,
    Weekend,
}

impl DateBucket {
    pub fn for_date(date: NaiveDate) -> Self {
        match date.weekday() {
            chrono::Weekday::Sat | chrono::Weekday::Sun => DateBucket::Weekend,
            _ => DateBucket::Weekday,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DateBucket::Weekday => "weekday",
            DateBucket::Weekend => "weekend",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "weekday" => Some(DateBucket::Weekday),
            "weekend" => Some(DateBucket::Weekend),
            _ => None,
        }
    }
}

/// Pooling key for historical price samples.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RouteKey {
    pub origin: String,
    pub destination_group: String,
    pub bucket: DateBucket,
}

impl RouteKey {
    pub fn new(origin: &str, destination_group: &str, date: NaiveDate) -> Self {
        Self {
            origin: origin.to_string(),
            destination_group: destination_group.to_string(),
            bucket: DateBucket::for_date(date),
        }
    }
}

/// One historical price observation. Append-only; the ranking core only reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceSample {
    pub route: RouteKey,
    pub price: f64,
    pub observed_at: DateTime<Utc>,
}

/// The historical price oracle. The read path feeds deal detection; the write
/// path is invoked by the worker after a successful pass, never by the
/// pipeline itself.
#[async_trait::async_trait]
pub trait PriceHistory: Send + Sync {
    /// Most recent `window` samples for the key, newest first.
    async fn samples(&self, key: &RouteKey, window: usize) -> anyhow::Result<Vec<PriceSample>>;

    async fn record(
        &self,
        key: &RouteKey,
        price: f64,
        observed_at: DateTime<Utc>,
    ) -> anyhow::Result<()>;
}

/// Oracle with no history at all: every route reads as insufficient and
/// writes vanish. For dry runs and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPriceHistory;

#[async_trait::async_trait]
impl PriceHistory for NullPriceHistory {
    async fn samples(&self, _key: &RouteKey, _window: usize) -> anyhow::Result<Vec<PriceSample>> {
        Ok(Vec::new())
    }

    async fn record(
        &self,
        _key: &RouteKey,
        _price: f64,
        _observed_at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buckets_split_weekend_from_weekday() {
        // 2026-08-07 is a Friday, 2026-08-08 a Saturday.
        let friday = NaiveDate::from_ymd_opt(2026, 8, 7).unwrap();
        let saturday = NaiveDate::from_ymd_opt(2026, 8, 8).unwrap();
        assert_eq!(DateBucket::for_date(friday), DateBucket::Weekday);
        assert_eq!(DateBucket::for_date(saturday), DateBucket::Weekend);
    }

    #[test]
    fn route_keys_with_same_bucket_pool_together() {
        let monday = NaiveDate::from_ymd_opt(2026, 8, 10).unwrap();
        let tuesday = NaiveDate::from_ymd_opt(2026, 8, 11).unwrap();
        assert_eq!(
            RouteKey::new("LAX", "arizona", monday),
            RouteKey::new("LAX", "arizona", tuesday)
        );
    }
}
