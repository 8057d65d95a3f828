use crate::domain::flight::{FlightOption, Segment};
use crate::ingest::types::RawOfferRecord;
use crate::search::SearchConfig;
use std::fmt;

/// A single malformed offer. Carries the offending field so rejections can be
/// traced back to the upstream record; never aborts the batch it came from.
#[derive(Debug, Clone)]
pub struct NormalizeError {
    pub field: &'static str,
    pub detail: String,
}

impl NormalizeError {
    fn new(field: &'static str, detail: impl Into<String>) -> Self {
        Self {
            field,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for NormalizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid offer field {}: {}", self.field, self.detail)
    }
}

impl std::error::Error for NormalizeError {}

/// Convert one raw record into a canonical `FlightOption`.
pub fn normalize_offer(
    raw: &RawOfferRecord,
    config: &SearchConfig,
) -> Result<FlightOption, NormalizeError> {
    if raw.source.trim().is_empty() {
        return Err(NormalizeError::new("source", "missing source identifier"));
    }

    if !raw.price.is_finite() || raw.price <= 0.0 {
        return Err(NormalizeError::new(
            "price",
            format!("price must be positive and finite (got {})", raw.price),
        ));
    }

    let price = config
        .to_reference_currency(raw.price, &raw.currency)
        .ok_or_else(|| {
            NormalizeError::new("currency", format!("unknown currency {:?}", raw.currency))
        })?;

    if raw.segments.is_empty() {
        return Err(NormalizeError::new("segments", "offer has no segments"));
    }

    for (i, segment) in raw.segments.iter().enumerate() {
        if segment.carrier.trim().is_empty() {
            return Err(NormalizeError::new(
                "segments.carrier",
                format!("segment {i} has no carrier"),
            ));
        }
        if segment.flight_number.trim().is_empty() {
            return Err(NormalizeError::new(
                "segments.flight_number",
                format!("segment {i} has no flight number"),
            ));
        }
        if segment.origin.trim().is_empty() || segment.destination.trim().is_empty() {
            return Err(NormalizeError::new(
                "segments.airport",
                format!("segment {i} has a missing airport code"),
            ));
        }
        if segment.arrives_at <= segment.departs_at {
            return Err(NormalizeError::new(
                "segments.arrives_at",
                format!("segment {i} arrives before it departs"),
            ));
        }
        if i > 0 && segment.departs_at < raw.segments[i - 1].arrives_at {
            return Err(NormalizeError::new(
                "segments.departs_at",
                format!("segment {i} departs before segment {} arrives", i - 1),
            ));
        }
    }

    let first = &raw.segments[0];
    let last = &raw.segments[raw.segments.len() - 1];
    let duration_minutes = (last.arrives_at - first.departs_at).num_minutes();

    let mut segments = Vec::with_capacity(raw.segments.len());
    for (i, s) in raw.segments.iter().enumerate() {
        let layover_after_minutes = raw
            .segments
            .get(i + 1)
            .map(|next| (next.departs_at - s.arrives_at).num_minutes());
        segments.push(Segment {
            carrier: s.carrier.clone(),
            flight_number: s.flight_number.clone(),
            origin: s.origin.clone(),
            destination: s.destination.clone(),
            departs_at: s.departs_at,
            arrives_at: s.arrives_at,
            layover_after_minutes,
        });
    }

    Ok(FlightOption {
        origin: first.origin.clone(),
        destination: last.destination.clone(),
        departs_at: first.departs_at,
        arrives_at: last.arrives_at,
        stops: segments.len() - 1,
        duration_minutes,
        price,
        segments,
        source: raw.source.clone(),
    })
}

/// Normalize a whole fetch result. Malformed records are logged and skipped.
pub fn normalize_batch(raws: &[RawOfferRecord], config: &SearchConfig) -> Vec<FlightOption> {
    let mut out = Vec::with_capacity(raws.len());
    for raw in raws {
        match normalize_offer(raw, config) {
            Ok(option) => out.push(option),
            Err(err) => {
                tracing::warn!(source = %raw.source, field = err.field, error = %err, "skipping malformed offer");
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::RawSegmentRecord;
    use chrono::{DateTime, Utc};

    fn ts(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn segment(num: &str, from: &str, to: &str, dep: &str, arr: &str) -> RawSegmentRecord {
        RawSegmentRecord {
            carrier: num[..2].to_string(),
            flight_number: num.to_string(),
            origin: from.to_string(),
            destination: to.to_string(),
            departs_at: ts(dep),
            arrives_at: ts(arr),
        }
    }

    fn one_stop_offer() -> RawOfferRecord {
        RawOfferRecord {
            source: "amadeus".to_string(),
            price: 240.0,
            currency: "USD".to_string(),
            segments: vec![
                segment(
                    "AA100",
                    "LAX",
                    "DEN",
                    "2026-09-01T08:00:00Z",
                    "2026-09-01T10:00:00Z",
                ),
                segment(
                    "AA200",
                    "DEN",
                    "PHX",
                    "2026-09-01T12:00:00Z",
                    "2026-09-01T13:30:00Z",
                ),
            ],
        }
    }

    #[test]
    fn computes_stops_duration_and_layovers() {
        let option = normalize_offer(&one_stop_offer(), &SearchConfig::default()).unwrap();
        assert_eq!(option.stops, 1);
        assert_eq!(option.duration_minutes, 330);
        assert_eq!(option.origin, "LAX");
        assert_eq!(option.destination, "PHX");
        assert_eq!(option.segments[0].layover_after_minutes, Some(120));
        assert_eq!(option.segments[1].layover_after_minutes, None);
        assert_eq!(option.layovers(), vec![("DEN", 120)]);
    }

    #[test]
    fn converts_price_to_reference_currency() {
        let mut raw = one_stop_offer();
        raw.currency = "EUR".to_string();
        raw.price = 100.0;
        let option = normalize_offer(&raw, &SearchConfig::default()).unwrap();
        assert!((option.price - 108.0).abs() < 1e-9);
    }

    #[test]
    fn rejects_non_positive_price() {
        let mut raw = one_stop_offer();
        raw.price = 0.0;
        let err = normalize_offer(&raw, &SearchConfig::default()).unwrap_err();
        assert_eq!(err.field, "price");
    }

    #[test]
    fn rejects_nan_price() {
        let mut raw = one_stop_offer();
        raw.price = f64::NAN;
        let err = normalize_offer(&raw, &SearchConfig::default()).unwrap_err();
        assert_eq!(err.field, "price");
    }

    #[test]
    fn rejects_unknown_currency() {
        let mut raw = one_stop_offer();
        raw.currency = "JPY".to_string();
        let err = normalize_offer(&raw, &SearchConfig::default()).unwrap_err();
        assert_eq!(err.field, "currency");
    }

    #[test]
    fn rejects_empty_segments() {
        let mut raw = one_stop_offer();
        raw.segments.clear();
        let err = normalize_offer(&raw, &SearchConfig::default()).unwrap_err();
        assert_eq!(err.field, "segments");
    }

    #[test]
    fn rejects_segment_arriving_before_departure() {
        let mut raw = one_stop_offer();
        raw.segments[0].arrives_at = ts("2026-09-01T07:00:00Z");
        let err = normalize_offer(&raw, &SearchConfig::default()).unwrap_err();
        assert_eq!(err.field, "segments.arrives_at");
    }

    #[test]
    fn rejects_overlapping_segments() {
        let mut raw = one_stop_offer();
        raw.segments[1].departs_at = ts("2026-09-01T09:00:00Z");
        let err = normalize_offer(&raw, &SearchConfig::default()).unwrap_err();
        assert_eq!(err.field, "segments.departs_at");
    }

    #[test]
    fn batch_skips_bad_records_and_keeps_good() {
        let mut bad = one_stop_offer();
        bad.price = -5.0;
        let batch = vec![bad, one_stop_offer()];
        let out = normalize_batch(&batch, &SearchConfig::default());
        assert_eq!(out.len(), 1);
    }
}
