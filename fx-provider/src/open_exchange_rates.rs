//! Open Exchange Rates HTTP adapter.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use serde::Deserialize;
use tracing::{debug, instrument};

use fx_types::{CurrencyCode, ProviderError, ProviderRates, RateProvider};

pub const DEFAULT_BASE_URL: &str = "https://openexchangerates.org/api";

/// Body of `GET /latest.json`. `disclaimer` and `license` are ignored.
#[derive(Debug, Deserialize)]
struct LatestResponse {
    timestamp: i64,
    base: CurrencyCode,
    rates: BTreeMap<CurrencyCode, f64>,
}

/// Fetches `latest.json` from an Open Exchange Rates compatible API.
pub struct OpenExchangeRatesProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    base_currency: Option<CurrencyCode>,
    timeout: Duration,
}

impl OpenExchangeRatesProvider {
    /// Creates a new provider. The API key is sent as the `app_id` query parameter.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            base_currency: None,
            timeout,
        })
    }

    /// Requests rates relative to `base` instead of the provider default (USD).
    pub fn with_base_currency(mut self, base: CurrencyCode) -> Self {
        self.base_currency = Some(base);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn transport_error(&self, err: reqwest::Error) -> ProviderError {
        if err.is_timeout() {
            ProviderError::Timeout(self.timeout)
        } else {
            ProviderError::Transport(err.to_string())
        }
    }
}

#[async_trait]
impl RateProvider for OpenExchangeRatesProvider {
    #[instrument(skip(self), fields(base_url = %self.base_url))]
    async fn fetch_latest(&self) -> Result<ProviderRates, ProviderError> {
        let mut req = self
            .client
            .get(format!("{}/latest.json", self.base_url))
            .query(&[("app_id", self.api_key.as_str())]);
        if let Some(base) = &self.base_currency {
            req = req.query(&[("base", base.as_str())]);
        }

        let resp = req.send().await.map_err(|e| self.transport_error(e))?;
        let status = resp.status();
        let body = resp.text().await.map_err(|e| self.transport_error(e))?;

        match status.as_u16() {
            401 => return Err(ProviderError::Unauthorized),
            429 => return Err(ProviderError::RateLimited),
            _ if !status.is_success() => {
                return Err(ProviderError::Status {
                    status: status.as_u16(),
                    message: error_message(&body),
                });
            }
            _ => {}
        }

        let payload: LatestResponse =
            serde_json::from_str(&body).map_err(|e| ProviderError::Malformed(e.to_string()))?;
        let timestamp = DateTime::from_timestamp(payload.timestamp, 0).ok_or_else(|| {
            ProviderError::Malformed(format!("timestamp out of range: {}", payload.timestamp))
        })?;

        debug!(
            base = %payload.base,
            currencies = payload.rates.len(),
            "Decoded latest rates"
        );

        Ok(ProviderRates {
            timestamp,
            base: payload.base,
            rates: payload.rates,
        })
    }

    fn name(&self) -> &'static str {
        "openexchangerates"
    }
}

/// Pulls a human readable message out of an upstream error body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("description")
                .or_else(|| v.get("message"))
                .and_then(|m| m.as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| body.chars().take(200).collect())
}
