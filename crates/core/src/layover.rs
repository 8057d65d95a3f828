use crate::domain::flight::FlightOption;
use crate::search::{LayoverRules, SearchConfig};

/// Connection quality in [0, 1]. Direct flights score exactly 1.0.
///
/// Each inter-segment gap contributes a penalty: below the minimum connection
/// time the connection is unmakeable (penalty 1); between minimum and the
/// short threshold the missed-connection risk grows quadratically as the gap
/// shrinks; the [short, long] window is free; beyond the long threshold the
/// wasted-time penalty grows linearly up to a cap. The gap side is then
/// damped by the average convenience of the layover airports.
pub fn layover_score(option: &FlightOption, config: &SearchConfig) -> f64 {
    let layovers = option.layovers();
    if layovers.is_empty() {
        return 1.0;
    }

    let mut penalty_sum = 0.0;
    let mut convenience_sum = 0.0;
    for (airport, minutes) in &layovers {
        penalty_sum += gap_penalty(*minutes, &config.layover);
        convenience_sum += config.convenience_for(airport);
    }

    let n = layovers.len() as f64;
    let avg_penalty = penalty_sum / n;
    let avg_convenience = convenience_sum / n;

    ((1.0 - avg_penalty) * avg_convenience).max(0.0)
}

fn gap_penalty(minutes: i64, rules: &LayoverRules) -> f64 {
    if minutes < rules.min_connection_minutes {
        return 1.0;
    }
    if minutes < rules.short_threshold_minutes {
        let span = (rules.short_threshold_minutes - rules.min_connection_minutes) as f64;
        let shortfall = (rules.short_threshold_minutes - minutes) as f64;
        let frac = shortfall / span;
        return frac * frac;
    }
    if minutes <= rules.long_threshold_minutes {
        return 0.0;
    }
    let excess = (minutes - rules.long_threshold_minutes) as f64;
    (excess / rules.long_penalty_span_minutes as f64 * rules.long_penalty_cap)
        .min(rules.long_penalty_cap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::flight::Segment;
    use chrono::{DateTime, Duration, Utc};

    fn ts(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn option_with_layovers(layovers: &[(&str, i64)]) -> FlightOption {
        let mut segments = Vec::new();
        let mut departs_at = ts("2026-09-01T08:00:00Z");
        let mut from = "LAX".to_string();
        for (i, (airport, gap)) in layovers.iter().enumerate() {
            let arrives_at = departs_at + Duration::minutes(90);
            segments.push(Segment {
                carrier: "AA".to_string(),
                flight_number: format!("AA{}", 100 + i),
                origin: from.clone(),
                destination: airport.to_string(),
                departs_at,
                arrives_at,
                layover_after_minutes: Some(*gap),
            });
            departs_at = arrives_at + Duration::minutes(*gap);
            from = airport.to_string();
        }
        let arrives_at = departs_at + Duration::minutes(90);
        segments.push(Segment {
            carrier: "AA".to_string(),
            flight_number: format!("AA{}", 100 + layovers.len()),
            origin: from,
            destination: "PHX".to_string(),
            departs_at,
            arrives_at,
            layover_after_minutes: None,
        });

        let first_departure = segments[0].departs_at;
        FlightOption {
            origin: "LAX".to_string(),
            destination: "PHX".to_string(),
            departs_at: first_departure,
            arrives_at,
            stops: segments.len() - 1,
            duration_minutes: (arrives_at - first_departure).num_minutes(),
            price: 200.0,
            segments,
            source: "test".to_string(),
        }
    }

    #[test]
    fn direct_flight_scores_exactly_one() {
        let option = option_with_layovers(&[]);
        assert_eq!(layover_score(&option, &SearchConfig::default()), 1.0);
    }

    #[test]
    fn ideal_window_costs_only_convenience() {
        let config = SearchConfig::default();
        // DEN is a configured hub at 0.9; a 2h layover sits in the free window.
        let option = option_with_layovers(&[("DEN", 120)]);
        let score = layover_score(&option, &config);
        assert!((score - 0.9).abs() < 1e-9);
    }

    #[test]
    fn unknown_airport_uses_neutral_midpoint() {
        let config = SearchConfig::default();
        let option = option_with_layovers(&[("XNA", 120)]);
        assert!((layover_score(&option, &config) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn penalty_rises_sharply_toward_minimum_connection() {
        let rules = LayoverRules::default();
        let near_min = gap_penalty(45, &rules);
        let near_ok = gap_penalty(85, &rules);
        assert!(near_min > 0.7, "got {near_min}");
        assert!(near_ok < 0.05, "got {near_ok}");
        // Quadratic: halving the distance to safety quarters the penalty.
        let mid = gap_penalty(65, &rules);
        assert!(mid < near_min / 2.0);
    }

    #[test]
    fn below_minimum_is_fully_penalized() {
        let rules = LayoverRules::default();
        assert_eq!(gap_penalty(20, &rules), 1.0);
    }

    #[test]
    fn long_gap_penalty_is_linear_and_capped() {
        let rules = LayoverRules::default();
        assert_eq!(gap_penalty(240, &rules), 0.0);
        let three_extra_hours = gap_penalty(240 + 180, &rules);
        assert!((three_extra_hours - 0.3).abs() < 1e-9);
        assert_eq!(gap_penalty(240 + 360, &rules), rules.long_penalty_cap);
        assert_eq!(gap_penalty(240 + 9000, &rules), rules.long_penalty_cap);
    }

    #[test]
    fn score_floors_at_zero() {
        let mut config = SearchConfig::default();
        config.convenience.insert("BAD".to_string(), 0.0);
        let option = option_with_layovers(&[("BAD", 30)]);
        assert_eq!(layover_score(&option, &config), 0.0);
    }
}
