use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One non-stop leg of an itinerary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    pub carrier: String,
    pub flight_number: String,
    pub origin: String,
    pub destination: String,
    pub departs_at: DateTime<Utc>,
    pub arrives_at: DateTime<Utc>,
    /// Ground time before the next segment, in minutes. None on the final segment.
    pub layover_after_minutes: Option<i64>,
}

/// A complete priced itinerary, produced only by the normalizer.
///
/// Invariants held by construction: `stops == segments.len() - 1`, segments are
/// time-ordered and non-overlapping, and `price` is positive and expressed in
/// the reference currency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlightOption {
    pub origin: String,
    pub destination: String,
    pub departs_at: DateTime<Utc>,
    pub arrives_at: DateTime<Utc>,
    pub segments: Vec<Segment>,
    pub duration_minutes: i64,
    pub price: f64,
    pub stops: usize,
    pub source: String,
}

impl FlightOption {
    pub fn departure_date(&self) -> NaiveDate {
        self.departs_at.date_naive()
    }

    /// Identity used to collapse the same physical itinerary seen through
    /// different sources: every flight number plus the departure instant.
    pub fn dedup_key(&self) -> String {
        let mut key = String::new();
        for segment in &self.segments {
            key.push_str(&segment.flight_number);
            key.push('|');
        }
        key.push_str(&self.departs_at.to_rfc3339());
        key
    }

    /// (airport, minutes) per layover. The wait happens at the arrival airport
    /// of the segment carrying the gap.
    pub fn layovers(&self) -> Vec<(&str, i64)> {
        self.segments
            .iter()
            .filter_map(|s| {
                s.layover_after_minutes
                    .map(|minutes| (s.destination.as_str(), minutes))
            })
            .collect()
    }
}
