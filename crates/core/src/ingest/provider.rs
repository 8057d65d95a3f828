use crate::config::Settings;
use crate::ingest::types::{OffersResponse, RawOfferRecord};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use reqwest::header::{HeaderMap, HeaderValue};
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_PATH: &str = "/v1/offers";
const DEFAULT_RETRIES: u32 = 3;

/// Black-box acquisition seam. Any real-world API shape is adapted to this
/// contract; the pipeline never sees anything upstream of it.
#[async_trait::async_trait]
pub trait OfferProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;

    async fn fetch_offers(
        &self,
        origin: &str,
        destination: &str,
        date: NaiveDate,
    ) -> Result<Vec<RawOfferRecord>>;
}

#[derive(Debug, Clone)]
pub struct HttpJsonOfferProvider {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    path: String,
    retries: u32,
}

impl HttpJsonOfferProvider {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let base_url = settings.require_offers_base_url()?.to_string();
        let api_key = settings.offers_api_key.clone();

        let timeout_secs = std::env::var("OFFERS_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let retries = std::env::var("OFFERS_RETRIES")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_RETRIES);

        let path = std::env::var("OFFERS_PATH")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_PATH.to_string());

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build offers http client")?;

        Ok(Self {
            http,
            base_url,
            api_key,
            path,
            retries,
        })
    }

    fn url(&self) -> String {
        let path = if self.path.starts_with('/') {
            self.path.clone()
        } else {
            format!("/{}", self.path)
        };

        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        if let Some(api_key) = &self.api_key {
            headers.insert("x-api-key", HeaderValue::from_str(api_key)?);
        }
        Ok(headers)
    }

    async fn fetch_once(
        &self,
        origin: &str,
        destination: &str,
        date: NaiveDate,
    ) -> Result<OffersResponse> {
        let url = self.url();
        let headers = self.headers()?;

        let res = self
            .http
            .get(url)
            .headers(headers)
            .query(&[
                ("origin", origin.to_string()),
                ("destination", destination.to_string()),
                ("date", date.to_string()),
            ])
            .send()
            .await
            .context("offers request failed")?;

        let status = res.status();
        let text = res.text().await.context("failed to read offers response")?;
        let raw_json = serde_json::from_str::<serde_json::Value>(&text)
            .with_context(|| format!("offers response is not valid JSON: {text}"))?;

        if !status.is_success() {
            anyhow::bail!("offers HTTP {status}: {raw_json}");
        }

        serde_json::from_value::<OffersResponse>(raw_json)
            .context("failed to parse offers response into OffersResponse")
    }

    fn validate(
        &self,
        resp: &OffersResponse,
        origin: &str,
        destination: &str,
        date: NaiveDate,
    ) -> Result<()> {
        anyhow::ensure!(
            resp.origin == origin && resp.destination == destination,
            "offers route mismatch: expected {origin}->{destination}, got {}->{}",
            resp.origin,
            resp.destination
        );
        anyhow::ensure!(
            resp.date == date,
            "offers date mismatch: expected {date}, got {}",
            resp.date
        );
        Ok(())
    }
}

#[async_trait::async_trait]
impl OfferProvider for HttpJsonOfferProvider {
    fn provider_name(&self) -> &'static str {
        "external_http_json"
    }

    async fn fetch_offers(
        &self,
        origin: &str,
        destination: &str,
        date: NaiveDate,
    ) -> Result<Vec<RawOfferRecord>> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let res = self.fetch_once(origin, destination, date).await;
            match res {
                Ok(parsed) => {
                    self.validate(&parsed, origin, destination, date)?;
                    return Ok(parsed.offers);
                }
                Err(err) => {
                    if attempt >= self.retries {
                        return Err(err);
                    }
                    let backoff = Duration::from_secs(1 << (attempt - 1));
                    tracing::warn!(attempt, ?backoff, error = %err, "offers fetch failed; retrying");
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_expected_offer_shape() {
        let date = NaiveDate::from_ymd_opt(2026, 9, 1).unwrap();
        let v = json!({
            "origin": "LAX",
            "destination": "PHX",
            "date": date,
            "offers": [
                {
                    "source": "amadeus",
                    "price": 184.0,
                    "currency": "USD",
                    "segments": [
                        {
                            "carrier": "AA",
                            "flight_number": "AA1021",
                            "origin": "LAX",
                            "destination": "PHX",
                            "departs_at": "2026-09-01T15:30:00Z",
                            "arrives_at": "2026-09-01T16:45:00Z"
                        }
                    ]
                }
            ]
        });

        let parsed: OffersResponse = serde_json::from_value(v).unwrap();
        assert_eq!(parsed.date, date);
        assert_eq!(parsed.offers.len(), 1);
        assert_eq!(parsed.offers[0].segments[0].flight_number, "AA1021");
    }

    #[test]
    fn rejects_string_price_via_deserialize() {
        let v = json!({
            "origin": "LAX",
            "destination": "PHX",
            "date": "2026-09-01",
            "offers": [
                {"source": "amadeus", "price": "184.0", "currency": "USD", "segments": []}
            ]
        });

        assert!(serde_json::from_value::<OffersResponse>(v).is_err());
    }
}
