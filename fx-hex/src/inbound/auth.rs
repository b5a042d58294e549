//! RapidAPI gateway authentication.
//!
//! Requests proxied by RapidAPI carry the caller's `x-rapidapi-key` and the
//! gateway's `x-rapidapi-proxy-secret`. Only the proxy secret is verified here;
//! the key identifies the caller for rate limiting.
//!
//! Admin routes sit behind a separate operator token sent as `x-admin-token`.
//! Gateway subscribers never receive it, so a valid RapidAPI key alone cannot
//! clear the cache or trigger upstream refreshes.

use std::sync::Arc;

use axum::{
    Json,
    body::Body,
    extract::State,
    http::{HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;

pub const RAPIDAPI_KEY_HEADER: &str = "x-rapidapi-key";
pub const RAPIDAPI_PROXY_SECRET_HEADER: &str = "x-rapidapi-proxy-secret";
pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Gateway and operator auth settings.
///
/// Without a proxy secret every non-admin request is let through. Without an
/// admin token the admin routes are disabled outright.
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    pub proxy_secret: Option<String>,
    pub admin_token: Option<String>,
}

impl AuthConfig {
    pub fn with_proxy_secret(secret: impl Into<String>) -> Self {
        Self {
            proxy_secret: Some(secret.into()),
            ..Self::default()
        }
    }

    pub fn admin_token(mut self, token: impl Into<String>) -> Self {
        self.admin_token = Some(token.into());
        self
    }
}

pub(crate) fn is_public(path: &str) -> bool {
    matches!(path, "/health" | "/api/health") || path.starts_with("/api-docs")
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

/// Checks the RapidAPI credentials carried by `headers` against `expected`.
fn verify(headers: &HeaderMap, expected: &str) -> Result<(), &'static str> {
    let (Some(_key), Some(secret)) = (
        header(headers, RAPIDAPI_KEY_HEADER),
        header(headers, RAPIDAPI_PROXY_SECRET_HEADER),
    ) else {
        return Err("Missing RapidAPI authentication credentials");
    };

    if bool::from(secret.as_bytes().ct_eq(expected.as_bytes())) {
        Ok(())
    } else {
        Err("Invalid RapidAPI proxy secret")
    }
}

/// Authentication middleware for RapidAPI proxied traffic.
///
/// Endpoints that bypass authentication:
/// - `/health` - Health check endpoint
/// - `/api-docs` - Swagger UI and the OpenAPI document
pub async fn auth_middleware(
    State(config): State<Arc<AuthConfig>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(expected) = config.proxy_secret.as_deref() else {
        return next.run(request).await;
    };

    if is_public(request.uri().path()) {
        return next.run(request).await;
    }

    match verify(request.headers(), expected) {
        Ok(()) => next.run(request).await,
        Err(message) => {
            tracing::warn!(path = %request.uri().path(), "{}", message);
            unauthorized_response(message)
        }
    }
}

/// Checks the operator token carried by `headers` against `expected`.
fn verify_admin(headers: &HeaderMap, expected: &str) -> Result<(), &'static str> {
    let Some(token) = header(headers, ADMIN_TOKEN_HEADER) else {
        return Err("Missing admin token");
    };

    if bool::from(token.as_bytes().ct_eq(expected.as_bytes())) {
        Ok(())
    } else {
        Err("Invalid admin token")
    }
}

/// Guards the `/api/admin/*` routes with the operator token.
pub async fn admin_middleware(
    State(config): State<Arc<AuthConfig>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(expected) = config.admin_token.as_deref() else {
        tracing::warn!(path = %request.uri().path(), "Admin endpoint called but no admin token is configured");
        return error_response(StatusCode::FORBIDDEN, "Admin endpoints are disabled");
    };

    match verify_admin(request.headers(), expected) {
        Ok(()) => next.run(request).await,
        Err(message) => {
            tracing::warn!(path = %request.uri().path(), "{}", message);
            unauthorized_response(message)
        }
    }
}

fn unauthorized_response(message: &str) -> Response {
    error_response(StatusCode::UNAUTHORIZED, message)
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(serde_json::json!({
            "error": message,
            "code": status.as_u16()
        })),
    )
        .into_response()
}
