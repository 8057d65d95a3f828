use crate::deal::DealDetector;
use crate::domain::bundle::{FetchWarning, RankingBundle, RankingOutcome, ScoredOption};
use crate::domain::history::{PriceHistory, RouteKey};
use crate::domain::request::RankingRequest;
use crate::ingest::provider::OfferProvider;
use crate::ingest::types::RawOfferRecord;
use crate::layover::layover_score;
use crate::normalize::normalize_batch;
use crate::rank;
use crate::scoring::{composite_score, BatchExtremes};
use crate::search::SearchConfig;
use crate::time::search_dates::search_window;
use anyhow::Context;
use chrono::{NaiveDate, Utc};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio::time::Instant;

/// The ranking pipeline: expand the destination group, fetch every
/// (airport, date) combination, and turn whatever arrives into a ranked
/// recommendation bundle.
///
/// Fetches run as independent tasks joined at a barrier before scoring, since
/// batch-relative normalization needs the complete candidate set. Scoring
/// itself is a pure function of that set, so concurrent and sequential
/// acquisition produce identical output.
pub struct Pipeline {
    provider: Arc<dyn OfferProvider>,
    history: Arc<dyn PriceHistory>,
    config: SearchConfig,
}

impl Pipeline {
    pub fn new(
        provider: Arc<dyn OfferProvider>,
        history: Arc<dyn PriceHistory>,
        config: SearchConfig,
    ) -> anyhow::Result<Self> {
        config.validate()?;
        Ok(Self {
            provider,
            history,
            config,
        })
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// The sole public decision surface. Errors only when acquisition failed
    /// for every single combination; anything less degrades to warnings on
    /// the bundle or a `NoOptions` outcome.
    pub async fn rank(&self, request: &RankingRequest) -> anyhow::Result<RankingOutcome> {
        request.validate()?;
        let group = self
            .config
            .group(&request.destination_group)
            .with_context(|| format!("unknown destination group {:?}", request.destination_group))?
            .clone();

        // Excluded dates are dropped before acquisition; nothing fetched for
        // them could ever be ranked.
        let dates: Vec<NaiveDate> = search_window(request.target_date, request.flex_days)
            .into_iter()
            .filter(|d| !request.excluded_dates.contains(d))
            .collect();

        let combos: Vec<(String, NaiveDate)> = group
            .members
            .iter()
            .flat_map(|airport| dates.iter().map(move |date| (airport.clone(), *date)))
            .collect();

        if combos.is_empty() {
            return Ok(RankingOutcome::NoOptions {
                warnings: Vec::new(),
            });
        }

        let (fetched, warnings) = self.fetch_all(request, &combos).await;

        if fetched.is_empty() {
            anyhow::bail!(
                "offer acquisition failed for all {} airport/date combinations: {}",
                combos.len(),
                warnings
                    .iter()
                    .map(|w| format!("{}@{}", w.airport, w.date))
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }

        let by_date = self.score_batches(request, &group.name, fetched).await;

        let Some(selection) = rank::select(by_date, request) else {
            return Ok(RankingOutcome::NoOptions { warnings });
        };

        let mut shortlist = selection.shortlist.into_iter();
        let primary = shortlist.next().context("selection produced an empty shortlist")?;

        Ok(RankingOutcome::Ranked(RankingBundle {
            origin: request.origin.clone(),
            destination_group: request.destination_group.clone(),
            target_date: request.target_date,
            generated_at: Utc::now(),
            primary_date: selection.primary_date,
            primary,
            alternatives: shortlist.collect(),
            flexible_dates: selection.flexible,
            price_stats: selection.price_stats,
            substitution: selection.substitution,
            warnings,
        }))
    }

    /// Fan out one fetch task per combination and join them all, bounded by
    /// the overall deadline. Combinations that fail or miss the deadline
    /// become warnings; the rest are merged in deterministic (date, airport)
    /// order.
    async fn fetch_all(
        &self,
        request: &RankingRequest,
        combos: &[(String, NaiveDate)],
    ) -> (
        BTreeMap<(NaiveDate, String), Vec<RawOfferRecord>>,
        Vec<FetchWarning>,
    ) {
        let mut tasks = JoinSet::new();
        for (airport, date) in combos.iter().cloned() {
            let provider = Arc::clone(&self.provider);
            let origin = request.origin.clone();
            tasks.spawn(async move {
                let result = provider.fetch_offers(&origin, &airport, date).await;
                (airport, date, result)
            });
        }

        let deadline = Instant::now() + self.config.fetch_deadline;
        let mut fetched: BTreeMap<(NaiveDate, String), Vec<RawOfferRecord>> = BTreeMap::new();
        let mut warnings = Vec::new();
        let mut settled: HashSet<(String, NaiveDate)> = HashSet::new();

        loop {
            let joined = match tokio::time::timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(joined)) => joined,
                Ok(None) => break,
                Err(_) => {
                    tasks.abort_all();
                    break;
                }
            };

            match joined {
                Ok((airport, date, Ok(offers))) => {
                    tracing::debug!(%airport, %date, offers = offers.len(), "fetched offers");
                    settled.insert((airport.clone(), date));
                    fetched.insert((date, airport), offers);
                }
                Ok((airport, date, Err(err))) => {
                    tracing::warn!(%airport, %date, error = %err, "offer fetch failed; continuing with partial results");
                    settled.insert((airport.clone(), date));
                    warnings.push(FetchWarning {
                        airport,
                        date,
                        reason: format!("{err:#}"),
                    });
                }
                Err(join_err) => {
                    // A panicked fetch task loses its combo identity; it is
                    // accounted for below with the unsettled ones.
                    tracing::error!(error = %join_err, "offer fetch task aborted");
                }
            }
        }

        for (airport, date) in combos {
            if !settled.contains(&(airport.clone(), *date)) {
                warnings.push(FetchWarning {
                    airport: airport.clone(),
                    date: *date,
                    reason: "did not complete before the fetch deadline".to_string(),
                });
            }
        }

        (fetched, warnings)
    }

    /// Normalize, hard-filter, and score each date's merged candidate batch.
    async fn score_batches(
        &self,
        request: &RankingRequest,
        group_name: &str,
        fetched: BTreeMap<(NaiveDate, String), Vec<RawOfferRecord>>,
    ) -> BTreeMap<NaiveDate, Vec<ScoredOption>> {
        let mut raw_by_date: BTreeMap<NaiveDate, Vec<RawOfferRecord>> = BTreeMap::new();
        for ((date, _airport), offers) in fetched {
            raw_by_date.entry(date).or_default().extend(offers);
        }

        let mut detector = DealDetector::new(self.history.as_ref(), self.config.deal);
        let mut by_date = BTreeMap::new();

        for (date, raw) in raw_by_date {
            let mut options = normalize_batch(&raw, &self.config);
            options.retain(|option| {
                let keep = option.stops <= self.config.max_stops;
                if !keep {
                    tracing::debug!(
                        stops = option.stops,
                        price = option.price,
                        "dropping option over the transfer ceiling"
                    );
                }
                keep
            });

            let Some(extremes) = BatchExtremes::from_options(&options) else {
                continue;
            };

            let route = RouteKey::new(&request.origin, group_name, date);
            let mut scored = Vec::with_capacity(options.len());
            for option in options {
                let layover = layover_score(&option, &self.config);
                let deal = detector.evaluate(&route, option.price).await;
                let composite =
                    composite_score(&option, layover, &extremes, &self.config.weights);
                scored.push(ScoredOption {
                    option,
                    layover_score: layover,
                    deal,
                    composite_score: composite,
                    rank: 0,
                });
            }

            by_date.insert(date, scored);
        }

        by_date
    }
}
