use crate::domain::bundle::ScoredOption;
use crate::domain::flight::FlightOption;
use crate::search::ScoringWeights;
use std::cmp::Ordering;

/// Extremes of the current candidate batch. Scores are relative to the
/// search at hand, never absolute.
#[derive(Debug, Clone, Copy)]
pub struct BatchExtremes {
    pub min_price: f64,
    pub max_price: f64,
    pub min_duration: i64,
    pub max_duration: i64,
    pub min_stops: usize,
    pub max_stops: usize,
}

impl BatchExtremes {
    pub fn from_options(options: &[FlightOption]) -> Option<Self> {
        let first = options.first()?;
        let mut out = Self {
            min_price: first.price,
            max_price: first.price,
            min_duration: first.duration_minutes,
            max_duration: first.duration_minutes,
            min_stops: first.stops,
            max_stops: first.stops,
        };
        for option in &options[1..] {
            out.min_price = out.min_price.min(option.price);
            out.max_price = out.max_price.max(option.price);
            out.min_duration = out.min_duration.min(option.duration_minutes);
            out.max_duration = out.max_duration.max(option.duration_minutes);
            out.min_stops = out.min_stops.min(option.stops);
            out.max_stops = out.max_stops.max(option.stops);
        }
        Some(out)
    }
}

/// Weighted composite in [0, 1]: cheaper, faster, fewer stops, better
/// layovers. Each dimension is min-max normalized within the batch; a
/// dimension with no spread contributes its full favorable value uniformly so
/// it cannot distort the ranking.
pub fn composite_score(
    option: &FlightOption,
    layover_score: f64,
    extremes: &BatchExtremes,
    weights: &ScoringWeights,
) -> f64 {
    let price = favorable(option.price, extremes.min_price, extremes.max_price);
    let duration = favorable(
        option.duration_minutes as f64,
        extremes.min_duration as f64,
        extremes.max_duration as f64,
    );
    let stops = favorable(
        option.stops as f64,
        extremes.min_stops as f64,
        extremes.max_stops as f64,
    );

    weights.price * price
        + weights.duration * duration
        + weights.stops * stops
        + weights.layover * layover_score
}

// 1 at the batch minimum, 0 at the maximum; 1 uniformly when the batch has no
// spread in this dimension.
fn favorable(value: f64, min: f64, max: f64) -> f64 {
    if max <= min {
        return 1.0;
    }
    1.0 - (value - min) / (max - min)
}

/// Sort best-first and assign 1-based ranks. Ties in composite score break by
/// fewer stops, then shorter duration, then lower price; the sort is stable,
/// so input order is the final tiebreaker and identical inputs always produce
/// identical output.
pub fn sort_and_rank(options: &mut [ScoredOption]) {
    options.sort_by(compare);
    for (i, option) in options.iter_mut().enumerate() {
        option.rank = i + 1;
    }
}

fn compare(a: &ScoredOption, b: &ScoredOption) -> Ordering {
    b.composite_score
        .partial_cmp(&a.composite_score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.option.stops.cmp(&b.option.stops))
        .then_with(|| a.option.duration_minutes.cmp(&b.option.duration_minutes))
        .then_with(|| {
            a.option
                .price
                .partial_cmp(&b.option.price)
                .unwrap_or(Ordering::Equal)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::bundle::DealSignificance;
    use chrono::{Duration, Utc};

    fn option(price: f64, duration_minutes: i64, stops: usize) -> FlightOption {
        let departs_at = Utc::now();
        FlightOption {
            origin: "LAX".to_string(),
            destination: "PHX".to_string(),
            departs_at,
            arrives_at: departs_at + Duration::minutes(duration_minutes),
            segments: Vec::new(),
            duration_minutes,
            price,
            stops,
            source: "test".to_string(),
        }
    }

    fn scored(price: f64, duration_minutes: i64, stops: usize, composite: f64) -> ScoredOption {
        ScoredOption {
            option: option(price, duration_minutes, stops),
            layover_score: 1.0,
            deal: DealSignificance::InsufficientHistory,
            composite_score: composite,
            rank: 0,
        }
    }

    #[test]
    fn price_extremes_map_to_one_and_zero() {
        let batch = vec![
            option(200.0, 90, 0),
            option(150.0, 90, 0),
            option(300.0, 90, 0),
        ];
        let extremes = BatchExtremes::from_options(&batch).unwrap();
        let weights = ScoringWeights::default();

        let cheap = composite_score(&batch[1], 1.0, &extremes, &weights);
        let dear = composite_score(&batch[2], 1.0, &extremes, &weights);
        let middle = composite_score(&batch[0], 1.0, &extremes, &weights);

        // Equal duration/stops contribute their full weight; layover is 1.0.
        assert!((cheap - 1.0).abs() < 1e-9);
        assert!((dear - 0.6).abs() < 1e-9);
        assert!(cheap > middle && middle > dear);
    }

    #[test]
    fn no_spread_dimension_does_not_distort() {
        let batch = vec![option(250.0, 120, 1), option(250.0, 120, 1)];
        let extremes = BatchExtremes::from_options(&batch).unwrap();
        let weights = ScoringWeights::default();

        let a = composite_score(&batch[0], 0.8, &extremes, &weights);
        let b = composite_score(&batch[1], 0.3, &extremes, &weights);

        // Identical price/duration/stops: composites differ only by layover.
        assert!(((a - b) - weights.layover * 0.5).abs() < 1e-9);
    }

    #[test]
    fn ranked_order_for_price_scenario() {
        let mut batch = vec![
            scored(200.0, 90, 0, 0.0),
            scored(150.0, 90, 0, 0.0),
            scored(300.0, 90, 0, 0.0),
        ];
        let options: Vec<FlightOption> = batch.iter().map(|s| s.option.clone()).collect();
        let extremes = BatchExtremes::from_options(&options).unwrap();
        let weights = ScoringWeights::default();
        for s in batch.iter_mut() {
            s.composite_score = composite_score(&s.option, s.layover_score, &extremes, &weights);
        }

        sort_and_rank(&mut batch);
        let prices: Vec<f64> = batch.iter().map(|s| s.option.price).collect();
        assert_eq!(prices, vec![150.0, 200.0, 300.0]);
        assert_eq!(batch[0].rank, 1);
        assert_eq!(batch[2].rank, 3);
    }

    #[test]
    fn ties_break_by_stops_then_duration_then_price() {
        let mut batch = vec![
            scored(200.0, 120, 1, 0.5),
            scored(200.0, 120, 0, 0.5),
            scored(200.0, 100, 1, 0.5),
            scored(180.0, 120, 1, 0.5),
        ];
        sort_and_rank(&mut batch);

        assert_eq!(batch[0].option.stops, 0);
        assert_eq!(batch[1].option.duration_minutes, 100);
        assert_eq!(batch[2].option.price, 180.0);
        assert_eq!(batch[3].option.price, 200.0);
    }

    #[test]
    fn stable_order_is_final_tiebreaker() {
        let mut batch = vec![
            scored(200.0, 120, 1, 0.5),
            scored(200.0, 120, 1, 0.5),
        ];
        batch[0].option.source = "first".to_string();
        batch[1].option.source = "second".to_string();
        sort_and_rank(&mut batch);
        assert_eq!(batch[0].option.source, "first");
    }
}
