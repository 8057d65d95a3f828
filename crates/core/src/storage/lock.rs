use anyhow::Context;
use chrono::{Datelike, NaiveDate};

// Advisory locks are scoped to the Postgres session. Best-effort guard
// against two monitoring passes racing on the same route and target date.
const LOCK_NAMESPACE: i64 = 0x4641_5245_5343; // "FARESC" as hex-ish namespace.

fn lock_key(origin: &str, destination_group: &str, target_date: NaiveDate) -> i64 {
    // FNV-1a over the route, mixed with the day number. Must be stable across
    // processes, so no std hasher.
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in origin.bytes().chain([b':']).chain(destination_group.bytes()) {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    LOCK_NAMESPACE ^ (hash as i64) ^ (target_date.num_days_from_ce() as i64)
}

pub async fn try_acquire_pass_lock(
    pool: &sqlx::PgPool,
    origin: &str,
    destination_group: &str,
    target_date: NaiveDate,
) -> anyhow::Result<bool> {
    let key = lock_key(origin, destination_group, target_date);
    let acquired: (bool,) = sqlx::query_as("SELECT pg_try_advisory_lock($1)")
        .persistent(false)
        .bind(key)
        .fetch_one(pool)
        .await
        .with_context(|| format!("failed to acquire advisory lock (key={key})"))?;
    Ok(acquired.0)
}

pub async fn release_pass_lock(
    pool: &sqlx::PgPool,
    origin: &str,
    destination_group: &str,
    target_date: NaiveDate,
) -> anyhow::Result<()> {
    let key = lock_key(origin, destination_group, target_date);
    sqlx::query("SELECT pg_advisory_unlock($1)")
        .persistent(false)
        .bind(key)
        .execute(pool)
        .await
        .with_context(|| format!("failed to release advisory lock (key={key})"))?;
    Ok(())
}
