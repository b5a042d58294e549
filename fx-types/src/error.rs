//! Error types for the currency rates service.

use std::time::Duration;

use crate::domain::CurrencyCode;

/// Violations of the rate snapshot invariants.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SnapshotError {
    #[error("Rate table is empty")]
    Empty,

    #[error("Invalid rate for {currency}: {rate}")]
    InvalidRate { currency: CurrencyCode, rate: f64 },

    #[error("Reference currency {reference} must map to 1.0, got {rate}")]
    ReferenceNotUnit { reference: CurrencyCode, rate: f64 },
}

/// Failures reported by a rate provider adapter.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    #[error("Upstream request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Upstream rate limit exceeded")]
    RateLimited,

    #[error("Upstream rejected the API key")]
    Unauthorized,

    #[error("Upstream returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Malformed upstream payload: {0}")]
    Malformed(String),
}

impl From<SnapshotError> for ProviderError {
    fn from(err: SnapshotError) -> Self {
        ProviderError::Malformed(err.to_string())
    }
}

/// Errors surfaced by the rate service.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RateError {
    #[error("Exchange rates unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Invalid currency: {0}")]
    InvalidCurrency(CurrencyCode),

    #[error("Invalid amount: {0}")]
    InvalidAmount(f64),

    #[error("Rate limit exceeded at the rate provider. Please try again later.")]
    ProviderRateLimited,

    #[error("Rate provider rejected the configured API key")]
    ProviderUnauthorized,
}

impl RateError {
    /// Error to surface when a provider call failed and no usable cache exists.
    pub fn from_provider(err: &ProviderError) -> Self {
        match err {
            ProviderError::RateLimited => RateError::ProviderRateLimited,
            ProviderError::Unauthorized => RateError::ProviderUnauthorized,
            other => RateError::UpstreamUnavailable(other.to_string()),
        }
    }
}

/// Application-level errors (for HTTP responses).
///
/// Maps cleanly to HTTP status codes.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad gateway: {0}")]
    BadGateway(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<RateError> for AppError {
    fn from(err: RateError) -> Self {
        match err {
            RateError::InvalidCurrency(code) => {
                AppError::BadRequest(format!("Invalid currency: {}", code))
            }
            RateError::InvalidAmount(_) => {
                AppError::BadRequest("Amount must be a finite number".into())
            }
            RateError::ProviderUnauthorized => AppError::BadGateway(err.to_string()),
            RateError::ProviderRateLimited | RateError::UpstreamUnavailable(_) => {
                AppError::ServiceUnavailable(err.to_string())
            }
        }
    }
}
