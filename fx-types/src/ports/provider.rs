//! Rate provider port.
//!
//! This trait defines the interface for upstream rate sources.
//! Implementations can be HTTP clients, static tables, mocks, etc.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::domain::CurrencyCode;
use crate::error::ProviderError;

/// Raw rate table as reported by a provider, before snapshot validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderRates {
    /// Timestamp declared by the provider.
    pub timestamp: DateTime<Utc>,
    /// Currency all rates are relative to.
    pub base: CurrencyCode,
    pub rates: BTreeMap<CurrencyCode, f64>,
}

/// Port trait for upstream rate providers.
#[async_trait::async_trait]
pub trait RateProvider: Send + Sync + 'static {
    /// Fetches the latest full rate table.
    async fn fetch_latest(&self) -> Result<ProviderRates, ProviderError>;

    /// Short identifier used in logs and health output.
    fn name(&self) -> &'static str;
}
