//! # FX Provider
//!
//! Concrete rate provider implementations (adapters) for the currency rates service.
//! This crate provides upstream adapters that implement the `RateProvider` port.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use fx_types::{CurrencyCode, ProviderError, ProviderRates, RateProvider};

pub mod open_exchange_rates;
pub mod static_rates;

pub use open_exchange_rates::OpenExchangeRatesProvider;
pub use static_rates::StaticRateProvider;

/// Which upstream adapter to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenExchangeRates,
    Static,
}

impl FromStr for ProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openexchangerates" | "oxr" => Ok(ProviderKind::OpenExchangeRates),
            "static" => Ok(ProviderKind::Static),
            other => anyhow::bail!(
                "Unknown rate provider '{}'. Supported: openexchangerates, static",
                other
            ),
        }
    }
}

/// Settings needed to construct a provider.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub base_url: String,
    pub api_key: Option<String>,
    pub base_currency: CurrencyCode,
    pub timeout: Duration,
    /// Jitter applied by the static provider, in percent.
    pub static_variance_percent: f64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::OpenExchangeRates,
            base_url: open_exchange_rates::DEFAULT_BASE_URL.to_string(),
            api_key: None,
            base_currency: CurrencyCode::from("USD"),
            timeout: Duration::from_secs(10),
            static_variance_percent: 0.0,
        }
    }
}

/// Unified provider wrapper so the service can stay generic over one type.
pub enum Provider {
    OpenExchangeRates(OpenExchangeRatesProvider),
    Static(StaticRateProvider),
}

/// Build a provider from configuration.
///
/// # Examples
///
/// ```ignore
/// let provider = build_provider(&ProviderConfig {
///     api_key: Some("your-app-id".into()),
///     ..ProviderConfig::default()
/// })?;
/// ```
pub fn build_provider(config: &ProviderConfig) -> anyhow::Result<Provider> {
    match config.kind {
        ProviderKind::OpenExchangeRates => {
            let api_key = config
                .api_key
                .as_deref()
                .filter(|k| !k.trim().is_empty())
                .ok_or_else(|| anyhow::anyhow!("EXCHANGE_API_KEY is required"))?;

            let mut provider =
                OpenExchangeRatesProvider::new(&config.base_url, api_key, config.timeout)?;
            // USD is the provider default; other bases need a paid plan.
            if config.base_currency.as_str() != "USD" {
                provider = provider.with_base_currency(config.base_currency.clone());
            }
            Ok(Provider::OpenExchangeRates(provider))
        }
        ProviderKind::Static => Ok(Provider::Static(
            StaticRateProvider::default().with_variance(config.static_variance_percent),
        )),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Implement RateProvider for Provider (delegation)
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl RateProvider for Provider {
    async fn fetch_latest(&self) -> Result<ProviderRates, ProviderError> {
        match self {
            Provider::OpenExchangeRates(inner) => inner.fetch_latest().await,
            Provider::Static(inner) => inner.fetch_latest().await,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Provider::OpenExchangeRates(inner) => inner.name(),
            Provider::Static(inner) => inner.name(),
        }
    }
}
