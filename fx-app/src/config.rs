//! Configuration loading from environment.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;

use exchange_rates::{RateServiceConfig, SchedulerConfig};
use fx_hex::{AuthConfig, RateLimitConfig, ServerOptions};
use fx_provider::{ProviderConfig, ProviderKind, open_exchange_rates::DEFAULT_BASE_URL};
use fx_types::CurrencyCode;

/// Application configuration.
#[derive(Debug)]
pub struct Config {
    pub port: u16,
    pub environment: String,
    pub provider: ProviderConfig,
    pub service: RateServiceConfig,
    pub scheduler: SchedulerConfig,
    pub rate_limit: RateLimitConfig,
    pub proxy_secret: Option<String>,
    /// Operator token for `/api/admin/*`. Admin routes are disabled without it.
    pub admin_token: Option<String>,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = parse_or(&var, "PORT", 3000u16)?;
        let environment = var("APP_ENV").unwrap_or_else(|| "development".to_string());

        let kind = match var("RATE_PROVIDER") {
            Some(raw) => raw.parse::<ProviderKind>()?,
            None => ProviderKind::OpenExchangeRates,
        };
        let api_key = var("EXCHANGE_API_KEY");
        if kind == ProviderKind::OpenExchangeRates && api_key.is_none() {
            anyhow::bail!("EXCHANGE_API_KEY environment variable is required");
        }

        let base_currency = match var("BASE_CURRENCY") {
            Some(raw) => CurrencyCode::parse(&raw)
                .map_err(|e| anyhow::anyhow!("BASE_CURRENCY: {}", e))?,
            None => CurrencyCode::from("USD"),
        };

        let upstream_timeout = millis_or(&var, "UPSTREAM_TIMEOUT_MS", 10_000)?;
        let provider = ProviderConfig {
            kind,
            base_url: var("EXCHANGE_API_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key,
            base_currency,
            timeout: upstream_timeout,
            static_variance_percent: parse_or(&var, "STATIC_RATE_VARIANCE", 0.0f64)?,
        };

        let service = RateServiceConfig {
            cache_ttl: millis_or(&var, "CACHE_TTL", 2 * 60 * 60 * 1000)?,
            upstream_timeout,
            max_staleness: var("MAX_STALENESS_MS")
                .map(|raw| parse_value::<u64>("MAX_STALENESS_MS", &raw))
                .transpose()?
                .map(Duration::from_millis),
        };

        let scheduler = SchedulerConfig {
            interval: Duration::from_secs(parse_or(&var, "REFRESH_INTERVAL_SECS", 2 * 60 * 60)?),
            max_retries: parse_or(&var, "REFRESH_MAX_RETRIES", 3u32)?,
            retry_delay: millis_or(&var, "REFRESH_RETRY_DELAY_MS", 5 * 60 * 1000)?,
        };
        if scheduler.interval.is_zero() {
            anyhow::bail!("REFRESH_INTERVAL_SECS must be greater than zero");
        }

        let rate_limit = RateLimitConfig {
            max_requests: parse_or(&var, "RATE_LIMIT_MAX_REQUESTS", 100u32)?,
            window: millis_or(&var, "RATE_LIMIT_WINDOW", 15 * 60 * 1000)?,
        };

        Ok(Self {
            port,
            environment,
            provider,
            service,
            scheduler,
            rate_limit,
            proxy_secret: var("RAPIDAPI_PROXY_SECRET"),
            admin_token: var("ADMIN_TOKEN"),
        })
    }

    pub fn server_options(&self) -> ServerOptions {
        ServerOptions {
            environment: self.environment.clone(),
            auth: AuthConfig {
                proxy_secret: self.proxy_secret.clone(),
                admin_token: self.admin_token.clone(),
            },
            rate_limit: self.rate_limit,
        }
    }
}

fn parse_value<T>(key: &str, raw: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse()
        .with_context(|| format!("{} has an invalid value '{}'", key, raw))
}

fn parse_or<T>(var: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(key) {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}

fn millis_or(
    var: &impl Fn(&str) -> Option<String>,
    key: &str,
    default_ms: u64,
) -> anyhow::Result<Duration> {
    parse_or(var, key, default_ms).map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("EXCHANGE_API_KEY", "app-id")]).unwrap();

        assert_eq!(config.port, 3000);
        assert_eq!(config.environment, "development");
        assert_eq!(config.provider.kind, ProviderKind::OpenExchangeRates);
        assert_eq!(config.provider.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.service.cache_ttl, Duration::from_secs(7200));
        assert_eq!(config.service.upstream_timeout, Duration::from_secs(10));
        assert_eq!(config.service.max_staleness, None);
        assert_eq!(config.scheduler.interval, Duration::from_secs(7200));
        assert_eq!(config.scheduler.max_retries, 3);
        assert_eq!(config.scheduler.retry_delay, Duration::from_secs(300));
        assert_eq!(config.rate_limit.max_requests, 100);
        assert_eq!(config.rate_limit.window, Duration::from_secs(900));
        assert!(config.proxy_secret.is_none());
        assert!(config.admin_token.is_none());
    }

    #[test]
    fn test_api_key_required_for_http_provider() {
        assert!(load(&[]).is_err());
        assert!(load(&[("EXCHANGE_API_KEY", "  ")]).is_err());
        assert!(load(&[("RATE_PROVIDER", "static")]).is_ok());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("PORT", "8080"),
            ("APP_ENV", "production"),
            ("RATE_PROVIDER", "static"),
            ("BASE_CURRENCY", "eur"),
            ("CACHE_TTL", "60000"),
            ("MAX_STALENESS_MS", "86400000"),
            ("REFRESH_INTERVAL_SECS", "600"),
            ("REFRESH_MAX_RETRIES", "0"),
            ("RAPIDAPI_PROXY_SECRET", "shh"),
            ("ADMIN_TOKEN", "op-token"),
        ])
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.provider.kind, ProviderKind::Static);
        assert_eq!(config.provider.base_currency.as_str(), "EUR");
        assert_eq!(config.service.cache_ttl, Duration::from_secs(60));
        assert_eq!(
            config.service.max_staleness,
            Some(Duration::from_secs(86_400))
        );
        assert_eq!(config.scheduler.interval, Duration::from_secs(600));
        assert_eq!(config.scheduler.max_retries, 0);

        let options = config.server_options();
        assert_eq!(options.environment, "production");
        assert_eq!(options.auth.proxy_secret.as_deref(), Some("shh"));
        assert_eq!(options.auth.admin_token.as_deref(), Some("op-token"));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let base = [("RATE_PROVIDER", "static")];
        assert!(load(&[base[0], ("PORT", "http")]).is_err());
        assert!(load(&[base[0], ("BASE_CURRENCY", "EURO")]).is_err());
        assert!(load(&[base[0], ("CACHE_TTL", "-5")]).is_err());
        assert!(load(&[base[0], ("REFRESH_INTERVAL_SECS", "0")]).is_err());
        assert!(load(&[("RATE_PROVIDER", "fixer")]).is_err());
    }
}
