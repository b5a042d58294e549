//! OpenAPI specification and documentation.

#![allow(dead_code)] // Path functions are only used by utoipa for documentation generation

use fx_types::dto::{
    ConvertQuery, CurrenciesResponse, HealthResponse, RatesResponse, RefreshResponse,
};
use fx_types::{ConversionResult, CurrencyCode};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
};

// Dummy functions to generate path documentation
// These are not the actual handlers, just for OpenAPI path generation

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Rates are being served", body = HealthResponse),
        (status = 503, description = "No rates available from cache or provider")
    )
)]
async fn health() {}

/// Health check under the API prefix
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "health",
    responses(
        (status = 200, description = "Rates are being served", body = HealthResponse),
        (status = 503, description = "No rates available from cache or provider")
    )
)]
async fn api_health() {}

/// Latest rates in the reference currency
#[utoipa::path(
    get,
    path = "/api/rates",
    tag = "rates",
    security(("rapidapi_key" = []), ("rapidapi_proxy_secret" = [])),
    responses(
        (status = 200, description = "Full rate table", body = RatesResponse),
        (status = 401, description = "Missing or invalid RapidAPI credentials"),
        (status = 429, description = "Too many requests"),
        (status = 503, description = "Exchange rates unavailable")
    )
)]
async fn get_all_rates() {}

/// Rates re-expressed relative to another currency
#[utoipa::path(
    get,
    path = "/api/rates/{base}",
    tag = "rates",
    security(("rapidapi_key" = []), ("rapidapi_proxy_secret" = [])),
    params(
        ("base" = String, Path, description = "Three letter currency code", example = "EUR")
    ),
    responses(
        (status = 200, description = "Rate table in the requested base", body = RatesResponse),
        (status = 400, description = "Unknown or malformed currency code"),
        (status = 401, description = "Missing or invalid RapidAPI credentials"),
        (status = 503, description = "Exchange rates unavailable")
    )
)]
async fn get_rates_for_base() {}

/// Convert an amount between two currencies
#[utoipa::path(
    get,
    path = "/api/convert",
    tag = "conversion",
    security(("rapidapi_key" = []), ("rapidapi_proxy_secret" = [])),
    params(ConvertQuery),
    responses(
        (status = 200, description = "Conversion result", body = ConversionResult),
        (status = 400, description = "Invalid currency or amount"),
        (status = 401, description = "Missing or invalid RapidAPI credentials"),
        (status = 503, description = "Exchange rates unavailable")
    )
)]
async fn convert() {}

/// Currencies present in the current snapshot
#[utoipa::path(
    get,
    path = "/api/currencies",
    tag = "rates",
    security(("rapidapi_key" = []), ("rapidapi_proxy_secret" = [])),
    responses(
        (status = 200, description = "Sorted currency codes", body = CurrenciesResponse),
        (status = 401, description = "Missing or invalid RapidAPI credentials"),
        (status = 503, description = "Exchange rates unavailable")
    )
)]
async fn get_supported_currencies() {}

/// Drop the cached snapshot
#[utoipa::path(
    post,
    path = "/api/admin/cache/clear",
    tag = "admin",
    security(("rapidapi_key" = [], "rapidapi_proxy_secret" = [], "admin_token" = [])),
    responses(
        (status = 204, description = "Cache cleared"),
        (status = 401, description = "Missing or invalid credentials or admin token"),
        (status = 403, description = "Admin endpoints are disabled")
    )
)]
async fn clear_cache() {}

/// Refresh rates from the provider immediately
#[utoipa::path(
    post,
    path = "/api/admin/refresh",
    tag = "admin",
    security(("rapidapi_key" = [], "rapidapi_proxy_secret" = [], "admin_token" = [])),
    responses(
        (status = 200, description = "Rates refreshed", body = RefreshResponse),
        (status = 401, description = "Missing or invalid credentials or admin token"),
        (status = 403, description = "Admin endpoints are disabled"),
        (status = 502, description = "Provider rejected the configured API key"),
        (status = 503, description = "Provider unavailable, retries continue in the background")
    )
)]
async fn force_refresh() {}

/// OpenAPI documentation for the currency rates API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Currency Converter API",
        version = "1.0.0",
        description = "Cached exchange rates and currency conversion.\n\n## Authentication\n\nWhen deployed behind RapidAPI, every endpoint except the health checks requires the `x-rapidapi-key` and `x-rapidapi-proxy-secret` headers added by the gateway. Admin endpoints additionally require the operator's `x-admin-token` and are disabled when none is configured.",
        license(name = "MIT"),
    ),
    paths(
        health,
        api_health,
        get_all_rates,
        get_rates_for_base,
        convert,
        get_supported_currencies,
        clear_cache,
        force_refresh,
    ),
    components(
        schemas(
            RatesResponse,
            CurrenciesResponse,
            ConversionResult,
            HealthResponse,
            RefreshResponse,
            CurrencyCode,
        )
    ),

    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "rates", description = "Exchange rate tables"),
        (name = "conversion", description = "Currency conversion"),
        (name = "admin", description = "Cache and refresh management"),
    )
)]
pub struct ApiDoc;

/// Security scheme modifier for the RapidAPI gateway headers.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "rapidapi_key",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("x-rapidapi-key"))),
            );
            components.add_security_scheme(
                "rapidapi_proxy_secret",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(
                    "x-rapidapi-proxy-secret",
                ))),
            );
            components.add_security_scheme(
                "admin_token",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("x-admin-token"))),
            );
        }
    }
}
