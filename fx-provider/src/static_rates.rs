//! Fixed rate table for development and offline testing.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;

use fx_types::{CurrencyCode, ProviderError, ProviderRates, RateProvider};

/// Units of each currency per 1 USD.
const DEFAULT_TABLE: &[(&str, f64)] = &[
    ("AUD", 1.52),
    ("CAD", 1.36),
    ("CHF", 0.88),
    ("CNY", 7.24),
    ("EUR", 0.92),
    ("GBP", 0.79),
    ("INR", 83.12),
    ("JPY", 149.82),
    ("USD", 1.0),
];

/// Serves a hardcoded table, optionally jittered on every fetch.
pub struct StaticRateProvider {
    base: CurrencyCode,
    rates: BTreeMap<CurrencyCode, f64>,
    max_variance_percent: f64,
    unavailable: AtomicBool,
}

impl Default for StaticRateProvider {
    fn default() -> Self {
        Self::from_table("USD", DEFAULT_TABLE)
    }
}

impl StaticRateProvider {
    pub fn from_table(base: &str, table: &[(&str, f64)]) -> Self {
        Self {
            base: CurrencyCode::normalize(base),
            rates: table
                .iter()
                .map(|(code, rate)| (CurrencyCode::normalize(code), *rate))
                .collect(),
            max_variance_percent: 0.0,
            unavailable: AtomicBool::new(false),
        }
    }

    /// Jitters every non-base rate by up to `percent` per fetch.
    pub fn with_variance(mut self, percent: f64) -> Self {
        self.max_variance_percent = percent.abs();
        self
    }

    /// Simulates an upstream outage until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::Relaxed);
    }

    fn fluctuate(&self, rate: f64) -> f64 {
        if self.max_variance_percent == 0.0 {
            return rate;
        }
        let nanos = Utc::now().timestamp_subsec_nanos();
        let random_factor = ((nanos % 2001) as f64 / 1000.0) - 1.0;
        rate + rate * (self.max_variance_percent / 100.0) * random_factor
    }
}

#[async_trait]
impl RateProvider for StaticRateProvider {
    async fn fetch_latest(&self) -> Result<ProviderRates, ProviderError> {
        if self.unavailable.load(Ordering::Relaxed) {
            return Err(ProviderError::Transport("static provider switched off".into()));
        }

        let rates = self
            .rates
            .iter()
            .map(|(code, &rate)| {
                let rate = if *code == self.base {
                    rate
                } else {
                    self.fluctuate(rate)
                };
                (code.clone(), rate)
            })
            .collect();

        Ok(ProviderRates {
            timestamp: Utc::now(),
            base: self.base.clone(),
            rates,
        })
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_default_table_is_usd_based() {
        let provider = StaticRateProvider::default();
        let latest = provider.fetch_latest().await.unwrap();

        assert_eq!(latest.base.as_str(), "USD");
        assert_eq!(latest.rates[&CurrencyCode::from("USD")], 1.0);
        assert_eq!(latest.rates[&CurrencyCode::from("INR")], 83.12);
    }

    #[tokio::test]
    async fn test_variance_stays_within_bounds() {
        let provider = StaticRateProvider::default().with_variance(0.5);

        for _ in 0..20 {
            let latest = provider.fetch_latest().await.unwrap();
            let eur = latest.rates[&CurrencyCode::from("EUR")];
            assert!((eur - 0.92).abs() <= 0.92 * 0.005 + 1e-12);
            assert_eq!(latest.rates[&CurrencyCode::from("USD")], 1.0);
        }
    }

    #[tokio::test]
    async fn test_unavailable_switch() {
        let provider = StaticRateProvider::default();
        provider.set_unavailable(true);
        assert!(matches!(
            provider.fetch_latest().await,
            Err(ProviderError::Transport(_))
        ));

        provider.set_unavailable(false);
        assert!(provider.fetch_latest().await.is_ok());
    }
}
