use crate::alert::PriceAlert;
use anyhow::Context;

pub async fn persist_alerts(pool: &sqlx::PgPool, alerts: &[PriceAlert]) -> anyhow::Result<u64> {
    let mut inserted: u64 = 0;
    for alert in alerts {
        let res = sqlx::query(
            "INSERT INTO price_alerts \
             (kind, origin, destination_group, date_bucket, current_price, reference_price, drop_amount, drop_percent, message) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(alert.kind.as_str())
        .bind(&alert.route.origin)
        .bind(&alert.route.destination_group)
        .bind(alert.route.bucket.as_str())
        .bind(alert.current_price)
        .bind(alert.reference_price)
        .bind(alert.drop_amount)
        .bind(alert.drop_percent)
        .bind(&alert.message)
        .execute(pool)
        .await
        .context("insert price_alerts failed")?;

        inserted += res.rows_affected();
    }
    Ok(inserted)
}
