use crate::domain::request::AirportGroup;
use anyhow::ensure;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// Weights of the composite rank score. Must sum to 1.
#[derive(Debug, Clone, Copy)]
pub struct ScoringWeights {
    pub price: f64,
    pub duration: f64,
    pub stops: f64,
    pub layover: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            price: 0.40,
            duration: 0.30,
            stops: 0.20,
            layover: 0.10,
        }
    }
}

impl ScoringWeights {
    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, w) in [
            ("price", self.price),
            ("duration", self.duration),
            ("stops", self.stops),
            ("layover", self.layover),
        ] {
            ensure!(
                (0.0..=1.0).contains(&w),
                "weight {name} must be in [0, 1] (got {w})"
            );
        }
        let sum = self.price + self.duration + self.stops + self.layover;
        ensure!(
            (sum - 1.0).abs() < 1e-9,
            "scoring weights must sum to 1 (got {sum})"
        );
        Ok(())
    }
}

/// Connection-time thresholds, all in minutes.
#[derive(Debug, Clone, Copy)]
pub struct LayoverRules {
    /// Below this a connection is considered unmakeable.
    pub min_connection_minutes: i64,
    /// Gaps between `min_connection_minutes` and this carry missed-connection
    /// risk; the penalty rises sharply toward the minimum.
    pub short_threshold_minutes: i64,
    /// Gaps beyond this start wasting ground time.
    pub long_threshold_minutes: i64,
    /// Excess over the long threshold at which the waste penalty stops growing.
    pub long_penalty_span_minutes: i64,
    pub long_penalty_cap: f64,
}

impl Default for LayoverRules {
    fn default() -> Self {
        Self {
            min_connection_minutes: 40,
            short_threshold_minutes: 90,
            long_threshold_minutes: 240,
            long_penalty_span_minutes: 360,
            long_penalty_cap: 0.6,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DealRules {
    /// A price whose z-score is at or below this is flagged as a deal.
    pub z_score_threshold: f64,
    /// Fewer historical samples than this yields "insufficient history".
    pub min_samples: usize,
    /// How many recent samples to pull from the oracle per route key.
    pub history_window: usize,
}

impl Default for DealRules {
    fn default() -> Self {
        Self {
            z_score_threshold: -1.0,
            min_samples: 5,
            history_window: 60,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AlertRules {
    /// Alert when the current cheapest price drops this many percent below
    /// the historical mean.
    pub drop_percent: f64,
    /// Alert when it drops this many currency units below the mean.
    pub drop_absolute: f64,
    /// "Near historical low" margin: within (1 + margin) of the window minimum.
    pub historical_low_margin: f64,
}

impl Default for AlertRules {
    fn default() -> Self {
        Self {
            drop_percent: 15.0,
            drop_absolute: 50.0,
            historical_low_margin: 0.05,
        }
    }
}

/// The immutable tuning surface consumed by the ranking core. Constructed
/// once per process (defaults + env overrides) and passed into the pipeline,
/// so scoring stays a pure function of its inputs.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub weights: ScoringWeights,
    pub layover: LayoverRules,
    pub deal: DealRules,
    pub alert: AlertRules,
    /// Hard transfer-count ceiling: options with more stops are dropped, not
    /// down-scored.
    pub max_stops: usize,
    pub fetch_deadline: Duration,
    pub reference_currency: String,
    /// Conversion rates into the reference currency.
    pub currency_rates: HashMap<String, f64>,
    /// Per-airport layover convenience in [0, 1].
    pub convenience: HashMap<String, f64>,
    pub default_convenience: f64,
    pub groups: BTreeMap<String, AirportGroup>,
}

const MAJOR_HUBS: &[&str] = &[
    "ATL", "ORD", "DFW", "DEN", "LAX", "PHX", "LAS", "DTW", "MSP", "SEA", "EWR", "JFK", "LGA",
    "BOS", "IAD", "DCA", "MIA", "FLL", "MCO", "SFO", "SJC", "PDX", "SLC",
];

impl Default for SearchConfig {
    fn default() -> Self {
        let mut currency_rates = HashMap::new();
        currency_rates.insert("USD".to_string(), 1.0);
        currency_rates.insert("EUR".to_string(), 1.08);
        currency_rates.insert("GBP".to_string(), 1.27);
        currency_rates.insert("CAD".to_string(), 0.73);
        currency_rates.insert("MXN".to_string(), 0.055);

        let mut convenience = HashMap::new();
        for hub in MAJOR_HUBS {
            convenience.insert(hub.to_string(), 0.9);
        }

        let mut groups = BTreeMap::new();
        groups.insert(
            "arizona".to_string(),
            AirportGroup::new("arizona", "PHX", &["PHX", "TUS", "FLG"]),
        );
        groups.insert(
            "los_angeles".to_string(),
            AirportGroup::new("los_angeles", "LAX", &["LAX", "BUR", "LGB", "SNA"]),
        );

        Self {
            weights: ScoringWeights::default(),
            layover: LayoverRules::default(),
            deal: DealRules::default(),
            alert: AlertRules::default(),
            max_stops: 2,
            fetch_deadline: Duration::from_secs(45),
            reference_currency: "USD".to_string(),
            currency_rates,
            convenience,
            default_convenience: 0.5,
            groups,
        }
    }
}

impl SearchConfig {
    pub fn from_env() -> Self {
        let mut out = Self::default();

        if let Ok(s) = std::env::var("SEARCH_MAX_STOPS") {
            if let Ok(n) = s.parse::<usize>() {
                out.max_stops = n;
            }
        }

        if let Ok(s) = std::env::var("SEARCH_FETCH_DEADLINE_SECS") {
            if let Ok(n) = s.parse::<u64>() {
                out.fetch_deadline = Duration::from_secs(n);
            }
        }

        if let Ok(s) = std::env::var("SEARCH_DEAL_Z_THRESHOLD") {
            if let Ok(z) = s.parse::<f64>() {
                out.deal.z_score_threshold = z;
            }
        }

        if let Ok(s) = std::env::var("SEARCH_DEAL_MIN_SAMPLES") {
            if let Ok(n) = s.parse::<usize>() {
                out.deal.min_samples = n;
            }
        }

        out
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.weights.validate()?;
        ensure!(self.max_stops <= 4, "max_stops ceiling is implausibly high");
        ensure!(
            (0.0..=1.0).contains(&self.default_convenience),
            "default_convenience must be in [0, 1]"
        );
        ensure!(
            self.layover.min_connection_minutes < self.layover.short_threshold_minutes,
            "min connection must be below the short threshold"
        );
        ensure!(
            self.layover.short_threshold_minutes < self.layover.long_threshold_minutes,
            "short threshold must be below the long threshold"
        );
        ensure!(
            self.deal.z_score_threshold < 0.0,
            "deal threshold must be negative (a drop below the mean)"
        );
        ensure!(
            self.currency_rates.contains_key(&self.reference_currency),
            "currency table must contain the reference currency"
        );
        for (name, group) in &self.groups {
            ensure!(
                group.members.contains(&group.primary),
                "group {name}: primary {} is not a member",
                group.primary
            );
        }
        Ok(())
    }

    pub fn group(&self, name: &str) -> Option<&AirportGroup> {
        self.groups.get(name)
    }

    pub fn convenience_for(&self, airport: &str) -> f64 {
        self.convenience
            .get(airport)
            .copied()
            .unwrap_or(self.default_convenience)
    }

    /// Convert an amount into the reference currency. None for unknown codes.
    pub fn to_reference_currency(&self, amount: f64, currency: &str) -> Option<f64> {
        self.currency_rates.get(currency).map(|rate| amount * rate)
    }
}
