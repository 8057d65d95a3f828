use anyhow::ensure;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A named destination cluster, e.g. "arizona" -> {PHX, TUS, FLG} with PHX as
/// the primary. Widens the search without fragmenting the user-facing
/// destination concept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AirportGroup {
    pub name: String,
    pub primary: String,
    pub members: Vec<String>,
}

impl AirportGroup {
    pub fn new(name: &str, primary: &str, members: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            primary: primary.to_string(),
            members: members.iter().map(|m| m.to_string()).collect(),
        }
    }
}

/// One ranking request: a fixed origin, a destination group, a target date
/// with a ± flexibility window, dates the traveller cannot fly, and the
/// shortlist size.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingRequest {
    pub origin: String,
    pub destination_group: String,
    pub target_date: NaiveDate,
    pub flex_days: u32,
    pub excluded_dates: BTreeSet<NaiveDate>,
    pub result_size: usize,
}

impl RankingRequest {
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(!self.origin.trim().is_empty(), "origin must be non-empty");
        ensure!(
            !self.destination_group.trim().is_empty(),
            "destination_group must be non-empty"
        );
        ensure!(self.result_size >= 1, "result_size must be at least 1");
        ensure!(
            self.flex_days <= 14,
            "flex_days must be at most 14 (got {})",
            self.flex_days
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> RankingRequest {
        RankingRequest {
            origin: "LAX".to_string(),
            destination_group: "arizona".to_string(),
            target_date: NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
            flex_days: 3,
            excluded_dates: BTreeSet::new(),
            result_size: 5,
        }
    }

    #[test]
    fn accepts_well_formed_request() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn rejects_zero_result_size() {
        let mut r = request();
        r.result_size = 0;
        assert!(r.validate().is_err());
    }

    #[test]
    fn rejects_blank_origin() {
        let mut r = request();
        r.origin = "  ".to_string();
        assert!(r.validate().is_err());
    }
}
