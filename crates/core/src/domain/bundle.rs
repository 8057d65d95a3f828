use crate::domain::flight::FlightOption;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of comparing a price against the route's historical distribution.
///
/// `InsufficientHistory` is a first-class "unknown": downstream consumers must
/// not read it as "not a deal".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DealSignificance {
    InsufficientHistory,
    Scored { z_score: f64, is_deal: bool },
}

impl DealSignificance {
    pub fn is_deal(&self) -> bool {
        matches!(self, DealSignificance::Scored { is_deal: true, .. })
    }
}

/// A flight option with all derived ranking fields attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredOption {
    pub option: FlightOption,
    /// Connection quality in [0, 1]; exactly 1.0 for direct flights.
    pub layover_score: f64,
    pub deal: DealSignificance,
    pub composite_score: f64,
    /// 1-based position within its date batch, assigned by the ranker.
    pub rank: usize,
}

/// One (airport, date) combination whose acquisition did not complete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchWarning {
    pub airport: String,
    pub date: NaiveDate,
    pub reason: String,
}

/// Emitted whenever the requested target date could not be the primary date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateSubstitution {
    pub requested: NaiveDate,
    pub substituted: NaiveDate,
}

/// Best option for one date of the flexibility window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlexibleDateOption {
    pub date: NaiveDate,
    pub option: ScoredOption,
}

/// Price spread of the primary date's candidate batch after dedup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceStatistics {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
}

impl PriceStatistics {
    pub fn from_prices(prices: &[f64]) -> Option<Self> {
        if prices.is_empty() {
            return None;
        }
        let mut sorted = prices.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let count = sorted.len();
        let min = sorted[0];
        let max = sorted[count - 1];
        let mean = sorted.iter().sum::<f64>() / count as f64;
        let median = if count % 2 == 0 {
            (sorted[count / 2 - 1] + sorted[count / 2]) / 2.0
        } else {
            sorted[count / 2]
        };

        Some(Self {
            count,
            min,
            max,
            mean,
            median,
        })
    }
}

/// The full recommendation produced by one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingBundle {
    pub origin: String,
    pub destination_group: String,
    pub target_date: NaiveDate,
    pub generated_at: DateTime<Utc>,
    /// Date the shortlist was drawn from; differs from `target_date` only
    /// when a substitution happened.
    pub primary_date: NaiveDate,
    pub primary: ScoredOption,
    pub alternatives: Vec<ScoredOption>,
    pub flexible_dates: Vec<FlexibleDateOption>,
    pub price_stats: PriceStatistics,
    pub substitution: Option<DateSubstitution>,
    pub warnings: Vec<FetchWarning>,
}

impl RankingBundle {
    /// Cheapest price among the primary date's surfaced options.
    pub fn cheapest_price(&self) -> f64 {
        self.alternatives
            .iter()
            .map(|o| o.option.price)
            .fold(self.primary.option.price, f64::min)
    }
}

/// What a ranking run can legitimately produce short of an error. "Nothing
/// available" is distinct from "couldn't check": the latter surfaces as fetch
/// warnings or, when every combination failed, as an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RankingOutcome {
    Ranked(RankingBundle),
    NoOptions { warnings: Vec<FetchWarning> },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_of_even_count_averages_middle_pair() {
        let stats = PriceStatistics::from_prices(&[300.0, 100.0, 200.0, 400.0]).unwrap();
        assert_eq!(stats.median, 250.0);
        assert_eq!(stats.min, 100.0);
        assert_eq!(stats.max, 400.0);
        assert_eq!(stats.mean, 250.0);
    }

    #[test]
    fn no_stats_for_empty_batch() {
        assert!(PriceStatistics::from_prices(&[]).is_none());
    }

    #[test]
    fn insufficient_history_is_not_a_deal_claim() {
        assert!(!DealSignificance::InsufficientHistory.is_deal());
        assert!(DealSignificance::Scored {
            z_score: -1.4,
            is_deal: true
        }
        .is_deal());
    }
}
