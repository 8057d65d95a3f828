use farescout_core::alert;
use farescout_core::domain::bundle::{RankingBundle, RankingOutcome};
use farescout_core::domain::history::{PriceHistory, RouteKey};
use farescout_core::domain::request::RankingRequest;
use farescout_core::ingest::provider::OfferProvider;
use farescout_core::pipeline::Pipeline;
use farescout_core::search::SearchConfig;
use farescout_core::storage;
use farescout_core::storage::price_history::PgPriceHistory;
use std::sync::Arc;

/// One monitoring pass: rank, persist the snapshot, raise alerts, and append
/// today's observations to the price history. The pass itself never fails the
/// process for a degraded run; the snapshot row records what happened.
pub async fn run(
    pool: &sqlx::PgPool,
    provider: Arc<dyn OfferProvider>,
    config: SearchConfig,
    request: &RankingRequest,
) -> anyhow::Result<()> {
    let history = Arc::new(PgPriceHistory::new(pool.clone()));
    let pipeline = Pipeline::new(provider, history.clone(), config.clone())?;

    match pipeline.rank(request).await {
        Ok(RankingOutcome::Ranked(bundle)) => {
            let snapshot_id = storage::rankings::persist_success(pool, &bundle).await?;
            tracing::info!(
                %snapshot_id,
                primary_date = %bundle.primary_date,
                primary_price = bundle.primary.option.price,
                alternatives = bundle.alternatives.len(),
                warnings = bundle.warnings.len(),
                substituted = bundle.substitution.is_some(),
                "persisted ranking snapshot"
            );

            raise_alerts(pool, history.as_ref(), &config, request, &bundle).await?;
            record_samples(history.as_ref(), request, &bundle).await?;
            Ok(())
        }
        Ok(RankingOutcome::NoOptions { warnings }) => {
            let detail = if warnings.is_empty() {
                "no options survived filtering".to_string()
            } else {
                format!(
                    "no options survived filtering ({} fetch warnings)",
                    warnings.len()
                )
            };
            let snapshot_id = storage::rankings::persist_failure(
                pool,
                &request.origin,
                &request.destination_group,
                request.target_date,
                chrono::Utc::now(),
                "no_options",
                &detail,
            )
            .await?;
            tracing::warn!(%snapshot_id, detail = %detail, "monitoring pass found nothing rankable");
            Ok(())
        }
        Err(err) => {
            sentry_anyhow::capture_anyhow(&err);
            let snapshot_id = storage::rankings::persist_failure(
                pool,
                &request.origin,
                &request.destination_group,
                request.target_date,
                chrono::Utc::now(),
                "error",
                &format!("{err:#}"),
            )
            .await?;
            tracing::error!(%snapshot_id, error = %err, "monitoring pass failed");
            Ok(())
        }
    }
}

/// Alerts compare against history as it stood before this pass, so they must
/// run before `record_samples` appends today's prices.
async fn raise_alerts(
    pool: &sqlx::PgPool,
    history: &dyn PriceHistory,
    config: &SearchConfig,
    request: &RankingRequest,
    bundle: &RankingBundle,
) -> anyhow::Result<()> {
    let route = RouteKey::new(
        &request.origin,
        &request.destination_group,
        bundle.primary_date,
    );
    let samples = history.samples(&route, config.deal.history_window).await?;
    let alerts = alert::evaluate(&route, bundle.cheapest_price(), &samples, &config.alert);
    if alerts.is_empty() {
        return Ok(());
    }

    let inserted = storage::alerts::persist_alerts(pool, &alerts).await?;
    for alert in &alerts {
        tracing::info!(kind = alert.kind.as_str(), message = %alert.message, "price alert");
    }
    tracing::info!(inserted, "persisted price alerts");
    Ok(())
}

/// Append every surfaced option's price to the route history: the shortlist
/// under the primary date's bucket, each flexible row under its own date.
async fn record_samples(
    history: &dyn PriceHistory,
    request: &RankingRequest,
    bundle: &RankingBundle,
) -> anyhow::Result<()> {
    let observed_at = bundle.generated_at;
    let primary_route = RouteKey::new(
        &request.origin,
        &request.destination_group,
        bundle.primary_date,
    );

    let mut recorded: usize = 0;
    history
        .record(&primary_route, bundle.primary.option.price, observed_at)
        .await?;
    recorded += 1;

    for option in &bundle.alternatives {
        history
            .record(&primary_route, option.option.price, observed_at)
            .await?;
        recorded += 1;
    }

    for row in &bundle.flexible_dates {
        let route = RouteKey::new(&request.origin, &request.destination_group, row.date);
        history
            .record(&route, row.option.option.price, observed_at)
            .await?;
        recorded += 1;
    }

    tracing::info!(recorded, "appended price samples");
    Ok(())
}
