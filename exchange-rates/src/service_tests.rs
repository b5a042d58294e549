//! RateService unit tests.

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::{DateTime, TimeDelta, Utc};

    use fx_types::{CurrencyCode, ProviderError, ProviderRates, RateError, RateProvider, RateSnapshot};

    use crate::{RateService, RateServiceConfig};

    /// Scripted provider for exercising the service and scheduler.
    pub struct MockProvider {
        rates: Mutex<BTreeMap<CurrencyCode, f64>>,
        failure: Mutex<Option<ProviderError>>,
        delay: Mutex<Option<Duration>>,
        calls: AtomicUsize,
    }

    impl MockProvider {
        pub fn with_rates(entries: &[(&str, f64)]) -> Self {
            Self {
                rates: Mutex::new(table(entries)),
                failure: Mutex::new(None),
                delay: Mutex::new(None),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn set_rates(&self, entries: &[(&str, f64)]) {
            *self.rates.lock().unwrap() = table(entries);
        }

        pub fn fail_with(&self, err: ProviderError) {
            *self.failure.lock().unwrap() = Some(err);
        }

        pub fn succeed(&self) {
            *self.failure.lock().unwrap() = None;
        }

        pub fn delay_by(&self, delay: Duration) {
            *self.delay.lock().unwrap() = Some(delay);
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RateProvider for MockProvider {
        async fn fetch_latest(&self) -> Result<ProviderRates, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);

            let delay = *self.delay.lock().unwrap();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            if let Some(err) = self.failure.lock().unwrap().clone() {
                return Err(err);
            }

            Ok(ProviderRates {
                timestamp: Utc::now(),
                base: "USD".into(),
                rates: self.rates.lock().unwrap().clone(),
            })
        }

        fn name(&self) -> &'static str {
            "mock"
        }
    }

    pub fn usd_eur_gbp() -> Vec<(&'static str, f64)> {
        vec![("USD", 1.0), ("EUR", 0.85), ("GBP", 0.73)]
    }

    fn table(entries: &[(&str, f64)]) -> BTreeMap<CurrencyCode, f64> {
        entries
            .iter()
            .map(|(code, rate)| (CurrencyCode::from(*code), *rate))
            .collect()
    }

    fn snapshot_at(entries: &[(&str, f64)], fetched_at: DateTime<Utc>) -> Arc<RateSnapshot> {
        Arc::new(RateSnapshot::new("USD".into(), table(entries), fetched_at, fetched_at).unwrap())
    }

    fn service(provider: MockProvider) -> RateService<MockProvider> {
        RateService::new(provider, RateServiceConfig::default())
    }

    fn expired() -> DateTime<Utc> {
        Utc::now() - TimeDelta::hours(3)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Conversion Arithmetic
    // ─────────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_convert_usd_to_eur() {
        let service = service(MockProvider::with_rates(&usd_eur_gbp()));

        let result = service.convert_currency(100.0, "USD", "EUR").await.unwrap();

        assert_eq!(result.from.as_str(), "USD");
        assert_eq!(result.to.as_str(), "EUR");
        assert_eq!(result.amount, 100.0);
        assert_eq!(result.result, 85.0);
        assert_eq!(result.rate, 0.85);
        assert_eq!(result.as_of, service.cache().get().unwrap().fetched_at);
    }

    #[tokio::test]
    async fn test_rates_for_eur_base() {
        let service = service(MockProvider::with_rates(&usd_eur_gbp()));

        let rates = service.get_rates_for_base("EUR").await.unwrap();

        assert_eq!(rates[&CurrencyCode::from("USD")], 1.176471);
        assert_eq!(rates[&CurrencyCode::from("EUR")], 1.0);
        assert_eq!(rates[&CurrencyCode::from("GBP")], 0.858824);
    }

    #[tokio::test]
    async fn test_base_maps_to_exactly_one() {
        let provider = MockProvider::with_rates(&[
            ("USD", 1.0),
            ("EUR", 0.9213),
            ("JPY", 149.82),
            ("BTC", 0.0000154),
            ("INR", 83.12),
        ]);
        let service = service(provider);

        for base in service.get_supported_currencies().await.unwrap() {
            let rates = service.get_rates_for_base(base.as_str()).await.unwrap();
            assert_eq!(rates[&base], 1.0, "base {}", base);
        }
    }

    #[tokio::test]
    async fn test_conversion_rate_matches_snapshot() {
        let service = service(MockProvider::with_rates(&[
            ("USD", 1.0),
            ("EUR", 0.9213),
            ("JPY", 149.82),
            ("GBP", 0.79),
        ]));
        let snapshot = service.fetch_latest_rates().await.unwrap();
        let codes: Vec<CurrencyCode> = snapshot.currencies().cloned().collect();

        for from in &codes {
            for to in &codes {
                let result = service
                    .convert_currency(37.5, from.as_str(), to.as_str())
                    .await
                    .unwrap();
                let expected = fx_types::round_to(
                    snapshot.rate_of(to).unwrap() / snapshot.rate_of(from).unwrap(),
                    6,
                );
                assert_eq!(result.rate, expected);
                assert_eq!(result.result, fx_types::round_to(37.5 * expected, 2));
            }
        }
        assert_eq!(service.provider().calls(), 1);
    }

    #[tokio::test]
    async fn test_codes_are_normalized() {
        let service = service(MockProvider::with_rates(&usd_eur_gbp()));

        let result = service.convert_currency(10.0, "usd", " gbp").await.unwrap();

        assert_eq!(result.to.as_str(), "GBP");
        assert_eq!(result.result, 7.3);
    }

    #[tokio::test]
    async fn test_zero_and_negative_amounts_are_allowed() {
        let service = service(MockProvider::with_rates(&usd_eur_gbp()));

        let zero = service.convert_currency(0.0, "USD", "EUR").await.unwrap();
        assert_eq!(zero.result, 0.0);

        let negative = service.convert_currency(-50.0, "USD", "EUR").await.unwrap();
        assert_eq!(negative.result, -42.5);
    }

    #[tokio::test]
    async fn test_non_finite_amount_fails_before_fetch() {
        let service = service(MockProvider::with_rates(&usd_eur_gbp()));

        let nan = service.convert_currency(f64::NAN, "USD", "EUR").await;
        assert!(matches!(nan, Err(RateError::InvalidAmount(_))));

        let inf = service.convert_currency(f64::INFINITY, "USD", "EUR").await;
        assert!(matches!(inf, Err(RateError::InvalidAmount(_))));

        assert_eq!(service.provider().calls(), 0);
    }

    #[tokio::test]
    async fn test_huge_amount_keeps_a_finite_result() {
        let service = service(MockProvider::with_rates(&usd_eur_gbp()));

        let same = service.convert_currency(1e307, "USD", "USD").await.unwrap();
        assert_eq!(same.rate, 1.0);
        assert_eq!(same.result, 1e307);

        let eur = service.convert_currency(1e307, "USD", "EUR").await.unwrap();
        assert!(eur.result.is_finite());
        assert_eq!(eur.result, 1e307 * 0.85);
    }

    #[tokio::test]
    async fn test_overflowing_conversion_is_invalid_amount() {
        let service = service(MockProvider::with_rates(&usd_eur_gbp()));

        let result = service.convert_currency(f64::MAX, "EUR", "USD").await;

        assert!(matches!(result, Err(RateError::InvalidAmount(_))));
    }

    #[tokio::test]
    async fn test_unknown_from_reported_before_unknown_to() {
        let service = service(MockProvider::with_rates(&usd_eur_gbp()));

        let result = service.convert_currency(1.0, "XXX", "YYY").await;
        assert!(matches!(result, Err(RateError::InvalidCurrency(code)) if code.as_str() == "XXX"));

        let result = service.convert_currency(1.0, "USD", "YYY").await;
        assert!(matches!(result, Err(RateError::InvalidCurrency(code)) if code.as_str() == "YYY"));
    }

    #[tokio::test]
    async fn test_unknown_base_is_invalid_currency() {
        let service = service(MockProvider::with_rates(&usd_eur_gbp()));

        let result = service.get_rates_for_base("ABC").await;

        assert!(matches!(result, Err(RateError::InvalidCurrency(code)) if code.as_str() == "ABC"));
    }

    #[tokio::test]
    async fn test_supported_currencies_sorted() {
        let service = service(MockProvider::with_rates(&[
            ("USD", 1.0),
            ("JPY", 149.82),
            ("AUD", 1.52),
            ("EUR", 0.92),
        ]));

        let currencies = service.get_supported_currencies().await.unwrap();
        let codes: Vec<&str> = currencies.iter().map(|c| c.as_str()).collect();

        assert_eq!(codes, vec!["AUD", "EUR", "JPY", "USD"]);
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Cache Policy
    // ─────────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_second_fetch_within_ttl_is_cached() {
        let service = service(MockProvider::with_rates(&usd_eur_gbp()));

        let first = service.fetch_latest_rates().await.unwrap();
        let second = service.fetch_latest_rates().await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(service.provider().calls(), 1);
    }

    #[tokio::test]
    async fn test_expired_cache_refreshes_once() {
        let service = service(MockProvider::with_rates(&[("USD", 1.0), ("EUR", 0.90)]));
        service
            .cache()
            .set(snapshot_at(&[("USD", 1.0), ("EUR", 0.85)], expired()));

        let fetched = service.fetch_rates().await.unwrap();

        assert!(!fetched.stale);
        assert_eq!(fetched.snapshot.rate_of(&"EUR".into()), Some(0.90));
        assert_eq!(service.provider().calls(), 1);

        service.fetch_latest_rates().await.unwrap();
        assert_eq!(service.provider().calls(), 1);
    }

    #[tokio::test]
    async fn test_expired_cache_served_when_upstream_fails() {
        let provider = MockProvider::with_rates(&usd_eur_gbp());
        provider.fail_with(ProviderError::Status {
            status: 502,
            message: "bad gateway".into(),
        });
        let service = service(provider);
        let cached = snapshot_at(&usd_eur_gbp(), expired());
        service.cache().set(cached.clone());

        let fetched = service.fetch_rates().await.unwrap();

        assert!(fetched.stale);
        assert!(Arc::ptr_eq(&fetched.snapshot, &cached));
        assert_eq!(service.provider().calls(), 1);
    }

    #[tokio::test]
    async fn test_failure_without_cache_is_upstream_unavailable() {
        let provider = MockProvider::with_rates(&usd_eur_gbp());
        provider.fail_with(ProviderError::Transport("connection refused".into()));
        let service = service(provider);

        let result = service.fetch_latest_rates().await;

        assert!(matches!(result, Err(RateError::UpstreamUnavailable(_))));
    }

    #[tokio::test]
    async fn test_cleared_cache_then_failure_is_upstream_unavailable() {
        let service = service(MockProvider::with_rates(&usd_eur_gbp()));
        service.fetch_latest_rates().await.unwrap();

        service.clear_cache();
        assert!(service.cache().get().is_none());
        assert_eq!(service.provider().calls(), 1);

        service
            .provider()
            .fail_with(ProviderError::Transport("connection reset".into()));
        let result = service.fetch_latest_rates().await;

        assert!(matches!(result, Err(RateError::UpstreamUnavailable(_))));
        assert_eq!(service.provider().calls(), 2);
    }

    #[tokio::test]
    async fn test_provider_classes_surface_without_cache() {
        let provider = MockProvider::with_rates(&usd_eur_gbp());
        provider.fail_with(ProviderError::RateLimited);
        let service = service(provider);

        let result = service.fetch_latest_rates().await;
        assert!(matches!(result, Err(RateError::ProviderRateLimited)));

        service.provider().fail_with(ProviderError::Unauthorized);
        let result = service.get_supported_currencies().await;
        assert!(matches!(result, Err(RateError::ProviderUnauthorized)));
    }

    #[tokio::test]
    async fn test_rate_limited_provider_falls_back_to_cache() {
        let provider = MockProvider::with_rates(&usd_eur_gbp());
        provider.fail_with(ProviderError::RateLimited);
        let service = service(provider);
        service.cache().set(snapshot_at(&usd_eur_gbp(), expired()));

        let result = service.convert_currency(100.0, "USD", "GBP").await.unwrap();

        assert_eq!(result.result, 73.0);
    }

    #[tokio::test]
    async fn test_staleness_ceiling_refuses_old_cache() {
        let provider = MockProvider::with_rates(&usd_eur_gbp());
        provider.fail_with(ProviderError::Transport("connection refused".into()));
        let service = RateService::new(
            provider,
            RateServiceConfig {
                max_staleness: Some(Duration::from_secs(4 * 3600)),
                ..RateServiceConfig::default()
            },
        );

        service.cache().set(snapshot_at(&usd_eur_gbp(), expired()));
        assert!(service.fetch_rates().await.unwrap().stale);

        service.cache().set(snapshot_at(
            &usd_eur_gbp(),
            Utc::now() - TimeDelta::hours(5),
        ));
        let result = service.fetch_rates().await;
        assert!(matches!(result, Err(RateError::UpstreamUnavailable(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_a_provider_failure() {
        let provider = MockProvider::with_rates(&usd_eur_gbp());
        provider.delay_by(Duration::from_secs(30));
        let service = service(provider);

        let result = service.fetch_latest_rates().await;

        assert!(matches!(result, Err(RateError::UpstreamUnavailable(msg)) if msg.contains("timed out")));
        assert!(service.cache().get().is_none());
    }

    #[tokio::test]
    async fn test_malformed_payload_keeps_previous_snapshot() {
        let provider = MockProvider::with_rates(&[("USD", 1.0), ("EUR", -0.85)]);
        let service = service(provider);
        let cached = snapshot_at(&usd_eur_gbp(), expired());
        service.cache().set(cached.clone());

        let fetched = service.fetch_rates().await.unwrap();

        assert!(fetched.stale);
        assert!(Arc::ptr_eq(&service.cache().get().unwrap(), &cached));
    }

    #[tokio::test]
    async fn test_refresh_bypasses_fresh_cache() {
        let service = service(MockProvider::with_rates(&usd_eur_gbp()));
        service.fetch_latest_rates().await.unwrap();

        service.provider().set_rates(&[("USD", 1.0), ("EUR", 0.80)]);
        let refreshed = service.refresh().await.unwrap();

        assert_eq!(refreshed.rate_of(&"EUR".into()), Some(0.80));
        assert_eq!(service.provider().calls(), 2);
    }

    #[tokio::test]
    async fn test_refresh_does_not_fall_back_to_cache() {
        let service = service(MockProvider::with_rates(&usd_eur_gbp()));
        service.fetch_latest_rates().await.unwrap();

        service
            .provider()
            .fail_with(ProviderError::Malformed("unexpected EOF".into()));

        assert!(service.refresh().await.is_err());
        assert!(service.cache().get().is_some());
    }
}
