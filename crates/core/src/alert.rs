use crate::domain::history::{PriceSample, RouteKey};
use crate::search::AlertRules;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    PriceDrop,
    HistoricalLow,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::PriceDrop => "price_drop",
            AlertKind::HistoricalLow => "historical_low",
        }
    }
}

/// A noteworthy price event for one route. Computed and persisted here;
/// delivery (email, SMS) is a downstream consumer's job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceAlert {
    pub kind: AlertKind,
    pub route: RouteKey,
    pub current_price: f64,
    /// Historical mean for drops, window minimum for lows.
    pub reference_price: f64,
    pub drop_amount: f64,
    pub drop_percent: f64,
    pub message: String,
}

/// Compare the current cheapest price against the route's history. Run this
/// before recording today's samples, so the comparison baseline is not
/// polluted by the price being judged.
pub fn evaluate(
    route: &RouteKey,
    current_price: f64,
    history: &[PriceSample],
    rules: &AlertRules,
) -> Vec<PriceAlert> {
    if history.is_empty() {
        return Vec::new();
    }

    let mut alerts = Vec::new();
    let mean = history.iter().map(|s| s.price).sum::<f64>() / history.len() as f64;
    let minimum = history
        .iter()
        .map(|s| s.price)
        .fold(f64::INFINITY, f64::min);

    let drop_amount = mean - current_price;
    let drop_percent = if mean > 0.0 {
        drop_amount / mean * 100.0
    } else {
        0.0
    };

    if drop_amount >= rules.drop_absolute || drop_percent >= rules.drop_percent {
        alerts.push(PriceAlert {
            kind: AlertKind::PriceDrop,
            route: route.clone(),
            current_price,
            reference_price: mean,
            drop_amount,
            drop_percent,
            message: format!(
                "price drop: {current_price:.0} vs {mean:.0} recent average ({drop_percent:.0}% below)"
            ),
        });
    }

    if current_price <= minimum * (1.0 + rules.historical_low_margin) {
        alerts.push(PriceAlert {
            kind: AlertKind::HistoricalLow,
            route: route.clone(),
            current_price,
            reference_price: minimum,
            drop_amount: minimum - current_price,
            drop_percent: if minimum > 0.0 {
                (minimum - current_price) / minimum * 100.0
            } else {
                0.0
            },
            message: format!(
                "near historical low: {current_price:.0} (window minimum {minimum:.0})"
            ),
        });
    }

    alerts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::history::DateBucket;
    use chrono::Utc;

    fn route() -> RouteKey {
        RouteKey {
            origin: "LAX".to_string(),
            destination_group: "arizona".to_string(),
            bucket: DateBucket::Weekday,
        }
    }

    fn samples(prices: &[f64]) -> Vec<PriceSample> {
        prices
            .iter()
            .map(|&price| PriceSample {
                route: route(),
                price,
                observed_at: Utc::now(),
            })
            .collect()
    }

    #[test]
    fn no_history_no_alerts() {
        assert!(evaluate(&route(), 100.0, &[], &AlertRules::default()).is_empty());
    }

    #[test]
    fn absolute_drop_triggers() {
        // mean 250; 190 is 60 below, over the 50 threshold.
        let history = samples(&[240.0, 250.0, 260.0]);
        let alerts = evaluate(&route(), 190.0, &history, &AlertRules::default());
        assert!(alerts.iter().any(|a| a.kind == AlertKind::PriceDrop));
    }

    #[test]
    fn percent_drop_triggers_without_absolute() {
        // mean 200; 168 is 16% below but only 32 in absolute terms.
        let history = samples(&[100.0, 200.0, 300.0]);
        let mut rules = AlertRules::default();
        rules.drop_absolute = 500.0;
        let alerts = evaluate(&route(), 168.0, &history, &rules);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::PriceDrop);
        assert!((alerts[0].drop_percent - 16.0).abs() < 1e-9);
    }

    #[test]
    fn unremarkable_price_stays_quiet() {
        let history = samples(&[195.0, 200.0, 205.0]);
        let alerts = evaluate(&route(), 210.0, &history, &AlertRules::default());
        assert!(alerts.is_empty());
    }

    #[test]
    fn near_window_minimum_flags_historical_low() {
        let history = samples(&[180.0, 240.0, 260.0, 300.0]);
        let alerts = evaluate(&route(), 185.0, &history, &AlertRules::default());
        assert!(alerts.iter().any(|a| a.kind == AlertKind::HistoricalLow));
    }
}
