use anyhow::Context;
use clap::Parser;
use farescout_core::domain::history::NullPriceHistory;
use farescout_core::domain::request::RankingRequest;
use farescout_core::ingest::provider::{HttpJsonOfferProvider, OfferProvider};
use farescout_core::ingest::stub::StubOfferProvider;
use farescout_core::pipeline::Pipeline;
use farescout_core::search::SearchConfig;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod pass;

#[derive(Debug, Parser)]
#[command(name = "farescout_worker")]
struct Args {
    /// Departure airport code.
    #[arg(long, default_value = "LAX")]
    origin: String,

    /// Destination group name (e.g. arizona, los_angeles).
    #[arg(long, default_value = "arizona")]
    destination: String,

    /// Target departure date (YYYY-MM-DD). Defaults to two weeks out.
    #[arg(long)]
    date: Option<String>,

    /// ± days around the target date to compare.
    #[arg(long, default_value_t = 3)]
    flex_days: u32,

    /// Dates the traveller cannot fly (YYYY-MM-DD, repeatable).
    #[arg(long = "exclude")]
    excluded: Vec<String>,

    /// Shortlist size for the primary date.
    #[arg(long, default_value_t = 5)]
    top: usize,

    /// Offer source: "http" (needs OFFERS_BASE_URL) or "stub" (offline).
    #[arg(long, default_value = "http")]
    provider: String,

    /// Rank against the stub provider and skip every database write.
    #[arg(long)]
    dry_run: bool,
}

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

    let args = Args::parse();

    let target_date = farescout_core::time::search_dates::resolve_target_date(
        args.date.as_deref(),
        chrono::Utc::now(),
    )?;

    let mut excluded_dates = BTreeSet::new();
    for s in &args.excluded {
        let date = chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .with_context(|| format!("invalid excluded date {s:?}"))?;
        excluded_dates.insert(date);
    }

    let config = SearchConfig::from_env();
    let request = RankingRequest {
        origin: args.origin.clone(),
        destination_group: args.destination.clone(),
        target_date,
        flex_days: args.flex_days,
        excluded_dates,
        result_size: args.top,
    };

    if args.dry_run {
        let pipeline = Pipeline::new(
            Arc::new(StubOfferProvider),
            Arc::new(NullPriceHistory),
            config,
        )?;
        let outcome = pipeline.rank(&request).await?;
        tracing::info!(
            %target_date,
            dry_run = true,
            outcome = %serde_json::to_string(&outcome)?,
            "monitoring pass (dry-run)"
        );
        return Ok(());
    }

    let provider: Arc<dyn OfferProvider> = match args.provider.as_str() {
        "http" => Arc::new(HttpJsonOfferProvider::from_settings(&settings)?),
        "stub" => Arc::new(StubOfferProvider),
        other => anyhow::bail!("unknown provider {other:?} (expected \"http\" or \"stub\")"),
    };

    let db_url = settings.require_database_url()?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(db_url)
        .await
        .context("connect DATABASE_URL failed")?;

    farescout_core::storage::migrate(&pool).await?;

    let acquired = farescout_core::storage::lock::try_acquire_pass_lock(
        &pool,
        &request.origin,
        &request.destination_group,
        request.target_date,
    )
    .await?;
    if !acquired {
        tracing::warn!(
            origin = %request.origin,
            destination = %request.destination_group,
            %target_date,
            "pass lock not acquired; another run in progress"
        );
        return Ok(());
    }

    let result = pass::run(&pool, provider, config, &request).await;

    let _ = farescout_core::storage::lock::release_pass_lock(
        &pool,
        &request.origin,
        &request.destination_group,
        request.target_date,
    )
    .await;

    result
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
