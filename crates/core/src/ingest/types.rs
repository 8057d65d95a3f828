use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One leg of a raw offer, as delivered by an upstream source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSegmentRecord {
    pub carrier: String,
    pub flight_number: String,
    pub origin: String,
    pub destination: String,
    pub departs_at: DateTime<Utc>,
    pub arrives_at: DateTime<Utc>,
}

/// A raw priced itinerary from any upstream source. Untrusted until it passes
/// the normalizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawOfferRecord {
    pub source: String,
    pub price: f64,
    pub currency: String,
    pub segments: Vec<RawSegmentRecord>,
}

/// Wire shape of the offers endpoint: the route/date are echoed back so the
/// client can detect a mismatched response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OffersResponse {
    pub origin: String,
    pub destination: String,
    pub date: NaiveDate,
    pub offers: Vec<RawOfferRecord>,
}
