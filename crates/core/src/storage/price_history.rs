use crate::domain::history::{DateBucket, PriceHistory, PriceSample, RouteKey};
use anyhow::Context;
use chrono::{DateTime, Utc};

/// Postgres-backed price oracle. Reads feed deal detection; writes happen
/// only from the worker after a successful pass.
#[derive(Debug, Clone)]
pub struct PgPriceHistory {
    pool: sqlx::PgPool,
}

impl PgPriceHistory {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl PriceHistory for PgPriceHistory {
    async fn samples(&self, key: &RouteKey, window: usize) -> anyhow::Result<Vec<PriceSample>> {
        let rows = sqlx::query_as::<_, (String, f64, DateTime<Utc>)>(
            "SELECT date_bucket, price, observed_at \
             FROM price_samples \
             WHERE origin = $1 AND destination_group = $2 AND date_bucket = $3 \
             ORDER BY observed_at DESC \
             LIMIT $4",
        )
        .bind(&key.origin)
        .bind(&key.destination_group)
        .bind(key.bucket.as_str())
        .bind(window as i64)
        .fetch_all(&self.pool)
        .await
        .context("select price_samples failed")?;

        let mut out = Vec::with_capacity(rows.len());
        for (bucket, price, observed_at) in rows {
            let bucket = DateBucket::parse(&bucket)
                .with_context(|| format!("unknown date_bucket {bucket:?} in price_samples"))?;
            out.push(PriceSample {
                route: RouteKey {
                    origin: key.origin.clone(),
                    destination_group: key.destination_group.clone(),
                    bucket,
                },
                price,
                observed_at,
            });
        }
        Ok(out)
    }

    async fn record(
        &self,
        key: &RouteKey,
        price: f64,
        observed_at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO price_samples (origin, destination_group, date_bucket, price, observed_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&key.origin)
        .bind(&key.destination_group)
        .bind(key.bucket.as_str())
        .bind(price)
        .bind(observed_at)
        .execute(&self.pool)
        .await
        .context("insert price_samples failed")?;
        Ok(())
    }
}
