use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use farescout_core::domain::bundle::RankingBundle;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = farescout_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let pool: Option<PgPool> = match settings.require_database_url() {
        Ok(db_url) => match sqlx::postgres::PgPoolOptions::new()
            .max_connections(5)
            .connect(db_url)
            .await
        {
            Ok(pool) => match farescout_core::storage::migrate(&pool).await {
                Ok(()) => Some(pool),
                Err(e) => {
                    sentry_anyhow::capture_anyhow(&e);
                    tracing::error!(error = %e, "db migrations failed; starting API in degraded mode");
                    None
                }
            },
            Err(e) => {
                let err = anyhow::Error::new(e);
                sentry_anyhow::capture_anyhow(&err);
                tracing::error!(error = %err, "db connect failed; starting API in degraded mode");
                None
            }
        },
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "DATABASE_URL missing; starting API in degraded mode");
            None
        }
    };

    let state = AppState { pool };

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/rankings/latest", get(get_latest_ranking))
        .route("/rankings/:target_date", get(get_ranking_by_date))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Debug, Clone)]
struct AppState {
    pool: Option<PgPool>,
}

#[derive(Debug, Deserialize)]
struct RouteFilter {
    origin: Option<String>,
    destination: Option<String>,
}

#[derive(Debug, Serialize)]
struct ApiRanking {
    snapshot_id: Uuid,
    origin: String,
    destination_group: String,
    target_date: NaiveDate,
    generated_at: DateTime<Utc>,
    bundle: RankingBundle,
}

async fn get_latest_ranking(
    State(state): State<AppState>,
    Query(filter): Query<RouteFilter>,
) -> Result<Json<ApiRanking>, StatusCode> {
    let Some(pool) = &state.pool else {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    };

    let ranking = fetch_ranking(pool, None, &filter)
        .await
        .map_err(|e| {
            sentry_anyhow::capture_anyhow(&e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(ranking))
}

async fn get_ranking_by_date(
    State(state): State<AppState>,
    Path(target_date): Path<String>,
    Query(filter): Query<RouteFilter>,
) -> Result<Json<ApiRanking>, StatusCode> {
    let Some(pool) = &state.pool else {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    };

    let target_date = NaiveDate::parse_from_str(&target_date, "%Y-%m-%d")
        .map_err(|_| StatusCode::BAD_REQUEST)?;

    let ranking = fetch_ranking(pool, Some(target_date), &filter)
        .await
        .map_err(|e| {
            sentry_anyhow::capture_anyhow(&e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(ranking))
}

async fn fetch_ranking(
    pool: &PgPool,
    target_date: Option<NaiveDate>,
    filter: &RouteFilter,
) -> anyhow::Result<Option<ApiRanking>> {
    let row = sqlx::query_as::<
        _,
        (
            Uuid,
            String,
            String,
            NaiveDate,
            DateTime<Utc>,
            Option<serde_json::Value>,
        ),
    >(
        "SELECT id, origin, destination_group, target_date, generated_at, bundle \
         FROM ranking_snapshots \
         WHERE status = 'success' \
           AND ($1::date IS NULL OR target_date = $1) \
           AND ($2::text IS NULL OR origin = $2) \
           AND ($3::text IS NULL OR destination_group = $3) \
         ORDER BY target_date DESC, generated_at DESC \
         LIMIT 1",
    )
    .bind(target_date)
    .bind(filter.origin.as_deref())
    .bind(filter.destination.as_deref())
    .fetch_optional(pool)
    .await?;

    let Some((snapshot_id, origin, destination_group, target_date, generated_at, bundle)) = row
    else {
        return Ok(None);
    };

    let bundle = bundle
        .ok_or_else(|| anyhow::anyhow!("success snapshot {snapshot_id} has no bundle payload"))?;
    let bundle: RankingBundle = serde_json::from_value(bundle)
        .map_err(|e| anyhow::anyhow!("snapshot {snapshot_id} bundle failed to decode: {e}"))?;

    Ok(Some(ApiRanking {
        snapshot_id,
        origin,
        destination_group,
        target_date,
        generated_at,
        bundle,
    }))
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &farescout_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
