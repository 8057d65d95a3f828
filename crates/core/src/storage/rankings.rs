use crate::domain::bundle::RankingBundle;
use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};

pub async fn persist_success(
    pool: &sqlx::PgPool,
    bundle: &RankingBundle,
) -> anyhow::Result<uuid::Uuid> {
    let raw = serde_json::to_value(bundle).context("serialize ranking bundle failed")?;

    let snapshot_id: uuid::Uuid = sqlx::query_scalar(
        "INSERT INTO ranking_snapshots (origin, destination_group, target_date, generated_at, status, error, bundle) \
         VALUES ($1, $2, $3, $4, 'success', NULL, $5) \
         RETURNING id",
    )
    .bind(&bundle.origin)
    .bind(&bundle.destination_group)
    .bind(bundle.target_date)
    .bind(bundle.generated_at)
    .bind(raw)
    .fetch_one(pool)
    .await
    .context("insert ranking_snapshots failed")?;

    Ok(snapshot_id)
}

/// Record a pass that produced nothing rankable. `status` distinguishes "the
/// run errored" from "the run worked and nothing was available".
pub async fn persist_failure(
    pool: &sqlx::PgPool,
    origin: &str,
    destination_group: &str,
    target_date: NaiveDate,
    generated_at: DateTime<Utc>,
    status: &str,
    error: &str,
) -> anyhow::Result<uuid::Uuid> {
    let snapshot_id: uuid::Uuid = sqlx::query_scalar(
        "INSERT INTO ranking_snapshots (origin, destination_group, target_date, generated_at, status, error, bundle) \
         VALUES ($1, $2, $3, $4, $5, $6, NULL) \
         RETURNING id",
    )
    .bind(origin)
    .bind(destination_group)
    .bind(target_date)
    .bind(generated_at)
    .bind(status)
    .bind(error)
    .fetch_one(pool)
    .await
    .context("insert error ranking_snapshots failed")?;

    Ok(snapshot_id)
}
