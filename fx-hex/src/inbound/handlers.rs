//! HTTP request handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;

use exchange_rates::{RateService, RefreshScheduler, rates_relative_to};
use fx_types::{
    AppError, ConvertQuery, CurrenciesResponse, CurrencyCode, HealthResponse, RateProvider,
    RatesResponse, RefreshResponse,
};

pub const SERVICE_NAME: &str = "currency-converter-api";

/// Application state shared across handlers.
pub struct AppState<P: RateProvider> {
    pub service: Arc<RateService<P>>,
    pub scheduler: Arc<RefreshScheduler<P>>,
    pub environment: String,
}

/// Wrapper to implement IntoResponse for AppError (orphan rule workaround).
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl From<fx_types::RateError> for ApiError {
    fn from(err: fx_types::RateError) -> Self {
        ApiError(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self.0 {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = serde_json::json!({
            "error": message,
            "code": status.as_u16()
        });

        (status, Json(body)).into_response()
    }
}

fn parse_code(raw: &str) -> Result<CurrencyCode, ApiError> {
    CurrencyCode::parse(raw).map_err(ApiError)
}

/// Health check endpoint. Reports 503 when no rates can be served.
#[tracing::instrument(skip(state))]
pub async fn health<P: RateProvider>(
    State(state): State<Arc<AppState<P>>>,
) -> Result<impl IntoResponse, ApiError> {
    let fetched = state.service.fetch_rates().await?;
    Ok(Json(HealthResponse {
        status: "OK".into(),
        timestamp: Utc::now(),
        service: SERVICE_NAME.into(),
        environment: state.environment.clone(),
        provider: state.service.provider().name().into(),
        stale: fetched.stale,
    }))
}

/// Full table in the reference currency.
#[tracing::instrument(skip(state))]
pub async fn get_all_rates<P: RateProvider>(
    State(state): State<Arc<AppState<P>>>,
) -> Result<impl IntoResponse, ApiError> {
    let fetched = state.service.fetch_rates().await?;
    let snapshot = &fetched.snapshot;
    Ok(Json(RatesResponse {
        base: snapshot.reference.clone(),
        timestamp: snapshot.fetched_at,
        stale: fetched.stale,
        rates: snapshot.rates().clone(),
    }))
}

#[tracing::instrument(skip(state))]
pub async fn get_rates_for_base<P: RateProvider>(
    State(state): State<Arc<AppState<P>>>,
    Path(base): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let base = parse_code(&base)?;
    let fetched = state.service.fetch_rates().await?;
    let rates = rates_relative_to(&fetched.snapshot, &base)?;
    Ok(Json(RatesResponse {
        base,
        timestamp: fetched.snapshot.fetched_at,
        stale: fetched.stale,
        rates,
    }))
}

#[tracing::instrument(skip(state), fields(from = %query.from, to = %query.to))]
pub async fn convert<P: RateProvider>(
    State(state): State<Arc<AppState<P>>>,
    Query(query): Query<ConvertQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let from = parse_code(&query.from)?;
    let to = parse_code(&query.to)?;
    let amount: f64 = query
        .amount
        .trim()
        .parse()
        .map_err(|_| AppError::BadRequest("Amount must be a valid number".into()))?;

    let result = state
        .service
        .convert_currency(amount, from.as_str(), to.as_str())
        .await?;
    Ok(Json(result))
}

#[tracing::instrument(skip(state))]
pub async fn get_supported_currencies<P: RateProvider>(
    State(state): State<Arc<AppState<P>>>,
) -> Result<impl IntoResponse, ApiError> {
    let currencies = state.service.get_supported_currencies().await?;
    Ok(Json(CurrenciesResponse {
        count: currencies.len(),
        currencies,
    }))
}

/// Drops the cached snapshot. The next read goes upstream.
#[tracing::instrument(skip(state))]
pub async fn clear_cache<P: RateProvider>(State(state): State<Arc<AppState<P>>>) -> StatusCode {
    state.service.clear_cache();
    StatusCode::NO_CONTENT
}

/// Refreshes from upstream right away; failed attempts keep retrying in the background.
#[tracing::instrument(skip(state))]
pub async fn force_refresh<P: RateProvider>(
    State(state): State<Arc<AppState<P>>>,
) -> Result<impl IntoResponse, ApiError> {
    let snapshot = state.scheduler.force_update().await?;
    Ok(Json(RefreshResponse {
        status: "refreshed".into(),
        as_of: snapshot.fetched_at,
        currencies: snapshot.len(),
    }))
}
