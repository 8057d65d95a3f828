pub mod alert;
pub mod deal;
pub mod domain;
pub mod ingest;
pub mod layover;
pub mod normalize;
pub mod pipeline;
pub mod rank;
pub mod scoring;
pub mod search;
pub mod storage;
pub mod time;

pub mod config {
    use anyhow::Context;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub database_url: Option<String>,
        pub sentry_dsn: Option<String>,
        pub offers_base_url: Option<String>,
        pub offers_api_key: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                database_url: std::env::var("DATABASE_URL").ok(),
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
                offers_base_url: std::env::var("OFFERS_BASE_URL").ok(),
                offers_api_key: std::env::var("OFFERS_API_KEY").ok(),
            })
        }

        pub fn require_database_url(&self) -> anyhow::Result<&str> {
            self.database_url
                .as_deref()
                .context("DATABASE_URL is required")
        }

        pub fn require_offers_base_url(&self) -> anyhow::Result<&str> {
            self.offers_base_url
                .as_deref()
                .context("OFFERS_BASE_URL is required")
        }
    }
}
