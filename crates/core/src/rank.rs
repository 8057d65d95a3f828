use crate::domain::bundle::{
    DateSubstitution, FlexibleDateOption, PriceStatistics, ScoredOption,
};
use crate::domain::request::RankingRequest;
use crate::scoring::sort_and_rank;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};

/// Shortlist and comparison rows selected from scored per-date batches.
#[derive(Debug, Clone)]
pub struct Selection {
    /// Date the shortlist is drawn from (the target date unless substituted).
    pub primary_date: NaiveDate,
    /// Top-N for the primary date, best first, ranks assigned.
    pub shortlist: Vec<ScoredOption>,
    /// Best option per remaining window date, ascending by date.
    pub flexible: Vec<FlexibleDateOption>,
    pub price_stats: PriceStatistics,
    pub substitution: Option<DateSubstitution>,
}

/// Deduplicate, sort, and select from per-date candidate batches.
///
/// Excluded dates are removed before anything else. Within a date, options
/// that are the same physical itinerary seen through different sources
/// (same flight numbers and departure instant) collapse to the cheapest copy.
/// Returns None when no date has any candidate left.
pub fn select(
    by_date: BTreeMap<NaiveDate, Vec<ScoredOption>>,
    request: &RankingRequest,
) -> Option<Selection> {
    let mut ranked: BTreeMap<NaiveDate, Vec<ScoredOption>> = BTreeMap::new();
    for (date, options) in by_date {
        if request.excluded_dates.contains(&date) {
            tracing::debug!(%date, "dropping excluded date from consideration");
            continue;
        }
        let mut options = dedupe(options);
        if options.is_empty() {
            continue;
        }
        sort_and_rank(&mut options);
        ranked.insert(date, options);
    }

    if ranked.is_empty() {
        return None;
    }

    let (primary_date, substitution) = if ranked.contains_key(&request.target_date) {
        (request.target_date, None)
    } else {
        // The target date is excluded or empty; promote the window date whose
        // best option scores highest. Prefer dates closer to the target on a
        // tie, then the earlier one. Never silent: the caller gets an
        // explicit substitution notice.
        let substituted = best_substitute_date(&ranked, request.target_date)?;
        (
            substituted,
            Some(DateSubstitution {
                requested: request.target_date,
                substituted,
            }),
        )
    };

    let primary_batch = ranked.remove(&primary_date)?;
    let price_stats = PriceStatistics::from_prices(
        &primary_batch.iter().map(|o| o.option.price).collect::<Vec<_>>(),
    )?;

    let shortlist: Vec<ScoredOption> = primary_batch
        .into_iter()
        .take(request.result_size)
        .collect();

    let flexible: Vec<FlexibleDateOption> = ranked
        .into_iter()
        .filter_map(|(date, mut options)| {
            if options.is_empty() {
                return None;
            }
            Some(FlexibleDateOption {
                date,
                option: options.swap_remove(0),
            })
        })
        .collect();

    Some(Selection {
        primary_date,
        shortlist,
        flexible,
        price_stats,
        substitution,
    })
}

/// Keep the cheapest copy of each duplicated itinerary, preserving first-seen
/// order so the stable tiebreaker stays deterministic.
fn dedupe(options: Vec<ScoredOption>) -> Vec<ScoredOption> {
    let mut kept: Vec<ScoredOption> = Vec::with_capacity(options.len());
    let mut index_by_key: HashMap<String, usize> = HashMap::new();

    for option in options {
        let key = option.option.dedup_key();
        match index_by_key.get(&key) {
            Some(&i) => {
                if option.option.price < kept[i].option.price {
                    kept[i] = option;
                }
            }
            None => {
                index_by_key.insert(key, kept.len());
                kept.push(option);
            }
        }
    }

    kept
}

fn best_substitute_date(
    ranked: &BTreeMap<NaiveDate, Vec<ScoredOption>>,
    target: NaiveDate,
) -> Option<NaiveDate> {
    ranked
        .iter()
        .filter_map(|(date, options)| options.first().map(|best| (*date, best.composite_score)))
        .max_by(|(a_date, a_score), (b_date, b_score)| {
            a_score
                .partial_cmp(b_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| {
                    distance_days(*b_date, target).cmp(&distance_days(*a_date, target))
                })
                .then_with(|| b_date.cmp(a_date))
        })
        .map(|(date, _)| date)
}

fn distance_days(date: NaiveDate, target: NaiveDate) -> i64 {
    (date - target).num_days().abs()
}
