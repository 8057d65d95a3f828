use crate::domain::bundle::DealSignificance;
use crate::domain::history::{PriceHistory, RouteKey};
use crate::search::DealRules;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy)]
struct RouteStats {
    mean: f64,
    std_dev: f64,
}

/// Flags prices that sit unusually far below a route's historical
/// distribution. Stats are cached per route key for the lifetime of one
/// detector, so a pipeline run queries the oracle once per key no matter how
/// many options share the route.
pub struct DealDetector<'a> {
    history: &'a dyn PriceHistory,
    rules: DealRules,
    // None = the key has no usable distribution (too few samples or zero
    // variance).
    cache: HashMap<RouteKey, Option<RouteStats>>,
}

impl<'a> DealDetector<'a> {
    pub fn new(history: &'a dyn PriceHistory, rules: DealRules) -> Self {
        Self {
            history,
            rules,
            cache: HashMap::new(),
        }
    }

    pub async fn evaluate(&mut self, key: &RouteKey, price: f64) -> DealSignificance {
        let stats = match self.cache.get(key) {
            Some(cached) => *cached,
            None => {
                let loaded = self.load_stats(key).await;
                self.cache.insert(key.clone(), loaded);
                loaded
            }
        };

        match stats {
            Some(stats) => {
                let z_score = (price - stats.mean) / stats.std_dev;
                DealSignificance::Scored {
                    z_score,
                    is_deal: z_score <= self.rules.z_score_threshold,
                }
            }
            None => DealSignificance::InsufficientHistory,
        }
    }

    async fn load_stats(&self, key: &RouteKey) -> Option<RouteStats> {
        let samples = match self.history.samples(key, self.rules.history_window).await {
            Ok(samples) => samples,
            Err(err) => {
                // An unreachable oracle downgrades to "unknown" rather than
                // failing the run; ranking proceeds without deal flags.
                tracing::warn!(?key, error = %err, "price history query failed; treating as insufficient");
                return None;
            }
        };

        if samples.len() < self.rules.min_samples {
            return None;
        }

        let prices: Vec<f64> = samples.iter().map(|s| s.price).collect();
        sample_stats(&prices)
    }
}

/// Mean and sample standard deviation (n - 1). None when the distribution is
/// degenerate (zero variance) and a z-score would be meaningless.
fn sample_stats(prices: &[f64]) -> Option<RouteStats> {
    let n = prices.len() as f64;
    if prices.len() < 2 {
        return None;
    }
    let mean = prices.iter().sum::<f64>() / n;
    let variance = prices.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let std_dev = variance.sqrt();
    if std_dev <= f64::EPSILON {
        return None;
    }
    Some(RouteStats { mean, std_dev })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::history::{DateBucket, PriceSample};
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedHistory {
        prices: Vec<f64>,
        queries: AtomicUsize,
    }

    impl FixedHistory {
        fn new(prices: Vec<f64>) -> Self {
            Self {
                prices,
                queries: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait::async_trait]
    impl PriceHistory for FixedHistory {
        async fn samples(
            &self,
            key: &RouteKey,
            window: usize,
        ) -> anyhow::Result<Vec<PriceSample>> {
            self.queries.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .prices
                .iter()
                .take(window)
                .map(|&price| PriceSample {
                    route: key.clone(),
                    price,
                    observed_at: Utc::now(),
                })
                .collect())
        }

        async fn record(
            &self,
            _key: &RouteKey,
            _price: f64,
            _observed_at: chrono::DateTime<Utc>,
        ) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn key() -> RouteKey {
        RouteKey {
            origin: "LAX".to_string(),
            destination_group: "arizona".to_string(),
            bucket: DateBucket::Weekday,
        }
    }

    #[tokio::test]
    async fn fewer_than_min_samples_is_insufficient() {
        let history = FixedHistory::new(vec![200.0, 210.0, 190.0, 205.0]);
        let mut detector = DealDetector::new(&history, DealRules::default());
        let outcome = detector.evaluate(&key(), 120.0).await;
        assert_eq!(outcome, DealSignificance::InsufficientHistory);
    }

    #[tokio::test]
    async fn zero_variance_is_insufficient() {
        let history = FixedHistory::new(vec![200.0; 10]);
        let mut detector = DealDetector::new(&history, DealRules::default());
        let outcome = detector.evaluate(&key(), 120.0).await;
        assert_eq!(outcome, DealSignificance::InsufficientHistory);
    }

    #[tokio::test]
    async fn flags_price_a_std_dev_below_mean() {
        // mean 200, sample std 15.81 over {180,190,200,210,220}.
        let history = FixedHistory::new(vec![180.0, 190.0, 200.0, 210.0, 220.0]);
        let mut detector = DealDetector::new(&history, DealRules::default());

        match detector.evaluate(&key(), 180.0).await {
            DealSignificance::Scored { z_score, is_deal } => {
                assert!(z_score < -1.0);
                assert!(is_deal);
            }
            other => panic!("expected scored outcome, got {other:?}"),
        }

        match detector.evaluate(&key(), 199.0).await {
            DealSignificance::Scored { is_deal, .. } => assert!(!is_deal),
            other => panic!("expected scored outcome, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn caches_stats_per_route_key() {
        let history = FixedHistory::new(vec![180.0, 190.0, 200.0, 210.0, 220.0]);
        let mut detector = DealDetector::new(&history, DealRules::default());
        for price in [150.0, 175.0, 200.0, 225.0] {
            let _ = detector.evaluate(&key(), price).await;
        }
        assert_eq!(history.queries.load(Ordering::SeqCst), 1);
    }
}
