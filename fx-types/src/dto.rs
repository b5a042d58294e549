//! Data Transfer Objects (DTOs) for requests and responses.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::CurrencyCode;

// ─────────────────────────────────────────────────────────────────────────────
// Rates DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Full rate table expressed in `base`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RatesResponse {
    pub base: CurrencyCode,
    /// When the underlying snapshot was fetched from the provider
    #[schema(value_type = String, example = "2024-01-01T00:00:00Z")]
    pub timestamp: DateTime<Utc>,
    /// True when the provider is failing and cached rates past their TTL are served
    pub stale: bool,
    #[schema(value_type = Object, example = json!({"USD": 1.0, "EUR": 0.85}))]
    pub rates: BTreeMap<CurrencyCode, f64>,
}

/// Currencies present in the current snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CurrenciesResponse {
    #[schema(example = 3)]
    pub count: usize,
    pub currencies: Vec<CurrencyCode>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Conversion DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Query string for `/api/convert`.
///
/// `amount` is kept as text so that a malformed number is reported as a
/// validation error instead of a generic extractor rejection.
#[derive(Debug, Clone, Serialize, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ConvertQuery {
    /// Source currency (3 letters)
    #[param(example = "USD")]
    pub from: String,
    /// Target currency (3 letters)
    #[param(example = "EUR")]
    pub to: String,
    /// Amount in the source currency
    #[param(example = "100")]
    pub amount: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Operational DTOs
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "OK")]
    pub status: String,
    #[schema(value_type = String, example = "2024-01-01T00:00:00Z")]
    pub timestamp: DateTime<Utc>,
    #[schema(example = "currency-converter-api")]
    pub service: String,
    #[schema(example = "development")]
    pub environment: String,
    #[schema(example = "openexchangerates")]
    pub provider: String,
    pub stale: bool,
}

/// Outcome of an administrative refresh.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RefreshResponse {
    #[schema(example = "refreshed")]
    pub status: String,
    #[schema(value_type = String, example = "2024-01-01T00:00:00Z")]
    pub as_of: DateTime<Utc>,
    #[schema(example = 170)]
    pub currencies: usize,
}
