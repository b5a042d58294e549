//! Rate Application Service
//!
//! The only component that talks to the rate provider. Enforces the cache
//! policy (fresh hit, refresh on expiry, stale fallback) and implements the
//! re-basing and conversion arithmetic.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, info, instrument, warn};

use fx_types::domain::conversion::{AMOUNT_DECIMALS, RATE_DECIMALS};
use fx_types::{
    ConversionResult, CurrencyCode, ProviderError, RateError, RateProvider, RateSnapshot, round_to,
};

use crate::cache::{RateCache, age_of};

/// Cache and upstream policy for [`RateService`].
#[derive(Debug, Clone)]
pub struct RateServiceConfig {
    /// How long a fetched snapshot is served without asking upstream again.
    pub cache_ttl: Duration,
    /// Upper bound on a single provider call.
    pub upstream_timeout: Duration,
    /// Oldest snapshot still served as a fallback while upstream is failing.
    /// `None` serves stale data indefinitely.
    pub max_staleness: Option<Duration>,
}

impl Default for RateServiceConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(2 * 60 * 60),
            upstream_timeout: Duration::from_secs(10),
            max_staleness: None,
        }
    }
}

/// A snapshot together with whether it is being served past its TTL.
#[derive(Debug, Clone)]
pub struct FetchedRates {
    pub snapshot: Arc<RateSnapshot>,
    pub stale: bool,
}

/// Application service for rate lookups and conversions.
///
/// Generic over `P: RateProvider` - the upstream adapter is injected at
/// construction, which keeps test doubles free of global state.
pub struct RateService<P: RateProvider> {
    provider: P,
    cache: RateCache,
    config: RateServiceConfig,
}

impl<P: RateProvider> RateService<P> {
    pub fn new(provider: P, config: RateServiceConfig) -> Self {
        info!(
            provider = provider.name(),
            ttl_secs = config.cache_ttl.as_secs(),
            "Exchange rate service initialized"
        );
        Self {
            provider,
            cache: RateCache::new(),
            config,
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn cache(&self) -> &RateCache {
        &self.cache
    }

    pub fn config(&self) -> &RateServiceConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Snapshot Access
    // ─────────────────────────────────────────────────────────────────────────────

    /// Returns the current snapshot, refreshing it when the TTL has elapsed.
    ///
    /// When the provider fails, a previously cached snapshot is served
    /// (flagged `stale`) as long as it is within `max_staleness`.
    #[instrument(skip(self))]
    pub async fn fetch_rates(&self) -> Result<FetchedRates, RateError> {
        if self.cache.is_fresh(self.config.cache_ttl) {
            if let Some(snapshot) = self.cache.get() {
                debug!("Returning cached exchange rates");
                return Ok(FetchedRates {
                    snapshot,
                    stale: false,
                });
            }
        }

        let err = match self.load_from_provider().await {
            Ok(snapshot) => {
                return Ok(FetchedRates {
                    snapshot,
                    stale: false,
                });
            }
            Err(err) => err,
        };

        // Another caller may have refreshed while this one was waiting.
        let Some(snapshot) = self.cache.get() else {
            return Err(RateError::from_provider(&err));
        };

        let age = age_of(&snapshot);
        if self.config.max_staleness.is_some_and(|ceiling| age > ceiling) {
            error!(
                age_secs = age.as_secs(),
                "Cached exchange rates exceed the staleness ceiling, refusing to serve them"
            );
            return Err(RateError::from_provider(&err));
        }

        let stale = age >= self.config.cache_ttl;
        if stale {
            warn!(
                age_secs = age.as_secs(),
                error = %err,
                "Using expired cache as fallback"
            );
        }
        Ok(FetchedRates { snapshot, stale })
    }

    /// Same as [`fetch_rates`](Self::fetch_rates) without the staleness flag.
    pub async fn fetch_latest_rates(&self) -> Result<Arc<RateSnapshot>, RateError> {
        self.fetch_rates().await.map(|fetched| fetched.snapshot)
    }

    /// Forces an upstream call, bypassing the TTL and the stale fallback.
    pub async fn refresh(&self) -> Result<Arc<RateSnapshot>, RateError> {
        self.load_from_provider()
            .await
            .map_err(|err| RateError::from_provider(&err))
    }

    /// Clears the cache. Does not trigger a refetch.
    pub fn clear_cache(&self) {
        self.cache.clear();
        info!("Cache cleared manually");
    }

    async fn load_from_provider(&self) -> Result<Arc<RateSnapshot>, ProviderError> {
        info!(
            provider = self.provider.name(),
            "Fetching fresh exchange rates from provider"
        );

        let result = match tokio::time::timeout(
            self.config.upstream_timeout,
            self.provider.fetch_latest(),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(self.config.upstream_timeout)),
        }
        .and_then(|raw| {
            RateSnapshot::new(raw.base, raw.rates, Utc::now(), raw.timestamp)
                .map_err(ProviderError::from)
        });

        match result {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                self.cache.set(snapshot.clone());
                info!(
                    "Successfully fetched rates for {} currencies",
                    snapshot.len()
                );
                Ok(snapshot)
            }
            Err(err) => {
                error!(error = %err, "Failed to fetch exchange rates");
                Err(err)
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Conversion Operations
    // ─────────────────────────────────────────────────────────────────────────────

    /// Converts `amount` of `from` into `to` using the current snapshot.
    ///
    /// `from` is validated before `to`, so the first unknown code is reported.
    #[instrument(skip(self))]
    pub async fn convert_currency(
        &self,
        amount: f64,
        from: &str,
        to: &str,
    ) -> Result<ConversionResult, RateError> {
        if !amount.is_finite() {
            return Err(RateError::InvalidAmount(amount));
        }

        let from = CurrencyCode::normalize(from);
        let to = CurrencyCode::normalize(to);
        let snapshot = self.fetch_latest_rates().await?;

        let from_rate = lookup(&snapshot, &from)?;
        let to_rate = lookup(&snapshot, &to)?;

        let rate = round_to(to_rate / from_rate, RATE_DECIMALS);
        let converted = amount * rate;
        if !converted.is_finite() {
            return Err(RateError::InvalidAmount(amount));
        }
        let result = ConversionResult {
            from,
            to,
            amount,
            result: round_to(converted, AMOUNT_DECIMALS),
            rate,
            as_of: snapshot.fetched_at,
        };

        debug!(result = result.result, rate, "Currency conversion successful");
        Ok(result)
    }

    /// Re-expresses the whole table relative to `base`.
    #[instrument(skip(self))]
    pub async fn get_rates_for_base(
        &self,
        base: &str,
    ) -> Result<BTreeMap<CurrencyCode, f64>, RateError> {
        let base = CurrencyCode::normalize(base);
        let snapshot = self.fetch_latest_rates().await?;
        rates_relative_to(&snapshot, &base)
    }

    /// Codes in the current snapshot, sorted.
    pub async fn get_supported_currencies(&self) -> Result<Vec<CurrencyCode>, RateError> {
        let snapshot = self.fetch_latest_rates().await?;
        let currencies: Vec<CurrencyCode> = snapshot.currencies().cloned().collect();
        debug!("Retrieved {} supported currencies", currencies.len());
        Ok(currencies)
    }
}

fn lookup(snapshot: &RateSnapshot, code: &CurrencyCode) -> Result<f64, RateError> {
    snapshot.rate_of(code).ok_or_else(|| {
        debug!(currency = %code, "Currency not present in snapshot");
        RateError::InvalidCurrency(code.clone())
    })
}

/// Re-expresses `snapshot` relative to `base`, rounding every rate to 6 places.
///
/// `base` itself always maps to exactly `1.0`.
pub fn rates_relative_to(
    snapshot: &RateSnapshot,
    base: &CurrencyCode,
) -> Result<BTreeMap<CurrencyCode, f64>, RateError> {
    let base_rate = lookup(snapshot, base)?;
    Ok(snapshot
        .rates()
        .iter()
        .map(|(code, rate)| (code.clone(), round_to(rate / base_rate, RATE_DECIMALS)))
        .collect())
}
