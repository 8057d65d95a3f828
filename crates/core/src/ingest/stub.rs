use crate::ingest::provider::OfferProvider;
use crate::ingest::types::{RawOfferRecord, RawSegmentRecord};
use anyhow::Result;
use chrono::{DateTime, Duration, NaiveDate, Utc};

/// Deterministic synthetic offers for dry runs and tests. The same
/// (origin, destination, date) always produces the same offer list, so ranked
/// output is reproducible without any upstream credentials.
#[derive(Debug, Clone, Default)]
pub struct StubOfferProvider;

const CARRIERS: &[&str] = &["AA", "DL", "UA", "WN", "AS", "B6"];
const HUBS: &[&str] = &["DEN", "DFW", "ORD", "ATL", "LAS", "SLC"];

#[async_trait::async_trait]
impl OfferProvider for StubOfferProvider {
    fn provider_name(&self) -> &'static str {
        "stub"
    }

    async fn fetch_offers(
        &self,
        origin: &str,
        destination: &str,
        date: NaiveDate,
    ) -> Result<Vec<RawOfferRecord>> {
        Ok(synthesize_offers(origin, destination, date))
    }
}

pub fn synthesize_offers(origin: &str, destination: &str, date: NaiveDate) -> Vec<RawOfferRecord> {
    let mut rng = Lcg::seeded(origin, destination, date);
    let base_price = base_price(origin, destination);
    let base_duration = base_duration_minutes(origin, destination);

    let count = 6 + (rng.next() % 4) as usize;
    let mut offers = Vec::with_capacity(count);

    for i in 0..count {
        let carrier = CARRIERS[(rng.next() as usize) % CARRIERS.len()];
        // Roughly 40% direct, 40% one stop, 20% two stops.
        let stops = match rng.next() % 10 {
            0..=3 => 0usize,
            4..=7 => 1,
            _ => 2,
        };

        let depart_hour = 6 + (rng.next() % 16) as i64;
        let mut departs_at = midnight_utc(date) + Duration::hours(depart_hour);

        let mut segments = Vec::with_capacity(stops + 1);
        let mut from = origin.to_string();
        for leg in 0..=stops {
            let to = if leg == stops {
                destination.to_string()
            } else {
                HUBS[(rng.next() as usize) % HUBS.len()].to_string()
            };
            let leg_minutes = (base_duration / (stops as i64 + 1)).max(45)
                + (rng.next() % 40) as i64;
            let arrives_at = departs_at + Duration::minutes(leg_minutes);

            segments.push(RawSegmentRecord {
                carrier: carrier.to_string(),
                flight_number: format!("{carrier}{}", 100 + (rng.next() % 8900)),
                origin: from.clone(),
                destination: to.clone(),
                departs_at,
                arrives_at,
            });

            if leg < stops {
                let layover_minutes = 50 + (rng.next() % 160) as i64;
                departs_at = arrives_at + Duration::minutes(layover_minutes);
                from = to;
            }
        }

        // Price spreads around the route base, slightly up per stop and
        // drifting across the batch so rankings are never all-tied.
        let spread = 0.75 + 0.08 * (i as f64) + 0.01 * (rng.next() % 20) as f64;
        let price = (base_price * spread * (1.0 + 0.05 * stops as f64) / 10.0).round() * 10.0;

        offers.push(RawOfferRecord {
            source: "stub".to_string(),
            price,
            currency: "USD".to_string(),
            segments,
        });
    }

    offers
}

fn midnight_utc(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

fn base_price(origin: &str, destination: &str) -> f64 {
    match (origin, destination) {
        ("LAX", "PHX") | ("PHX", "LAX") => 180.0,
        ("LAX", "TUS") | ("TUS", "LAX") => 220.0,
        ("BUR", "PHX") | ("PHX", "BUR") => 160.0,
        ("SNA", "PHX") | ("PHX", "SNA") => 190.0,
        ("LGB", "PHX") | ("PHX", "LGB") => 170.0,
        _ => 250.0,
    }
}

fn base_duration_minutes(origin: &str, destination: &str) -> i64 {
    match (origin, destination) {
        ("LAX", "PHX") | ("PHX", "LAX") => 70,
        ("LAX", "TUS") | ("TUS", "LAX") => 80,
        ("BUR", "PHX") | ("PHX", "BUR") => 75,
        ("SNA", "PHX") | ("PHX", "SNA") => 75,
        ("LGB", "PHX") | ("PHX", "LGB") => 75,
        _ => 120,
    }
}

/// Tiny deterministic generator; seeded from the route and date so the stub
/// needs no global randomness.
struct Lcg {
    state: u64,
}

impl Lcg {
    fn seeded(origin: &str, destination: &str, date: NaiveDate) -> Self {
        // FNV-1a over the route key, mixed with the day number.
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in origin.bytes().chain(destination.bytes()) {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
        }
        let days = chrono::Datelike::num_days_from_ce(&date) as u64;
        Self {
            state: hash ^ days.wrapping_mul(0x9e37_79b9_7f4a_7c15),
        }
    }

    fn next(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.state >> 33
    }
}
