//! HTTP Server configuration and startup.

use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use exchange_rates::RefreshScheduler;
use fx_types::RateProvider;

use super::auth::{AuthConfig, admin_middleware, auth_middleware};
use super::handlers::{self, AppState};
use super::rate_limit::{RateLimitConfig, RateLimiterState, rate_limit_middleware};
use crate::openapi::ApiDoc;

/// Deployment-facing knobs of the HTTP layer.
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Reported by `/health`.
    pub environment: String,
    pub auth: AuthConfig,
    pub rate_limit: RateLimitConfig,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            environment: "development".into(),
            auth: AuthConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

/// HTTP Server for the currency rates API.
pub struct HttpServer<P: RateProvider> {
    state: Arc<AppState<P>>,
    auth: Arc<AuthConfig>,
    rate_limiter: Arc<RateLimiterState>,
}

impl<P: RateProvider> HttpServer<P> {
    /// Creates a new HTTP server over the scheduler and the service it refreshes.
    pub fn new(scheduler: Arc<RefreshScheduler<P>>, options: ServerOptions) -> Self {
        Self {
            state: Arc::new(AppState {
                service: scheduler.service().clone(),
                scheduler,
                environment: options.environment,
            }),
            auth: Arc::new(options.auth),
            rate_limiter: Arc::new(RateLimiterState::new(options.rate_limit)),
        }
    }

    /// Builds the Axum router with all routes.
    pub fn router(&self) -> Router {
        // Build HTTP metrics layer (uses globally set MeterProvider)
        let metrics = axum_otel_metrics::HttpMetricsLayerBuilder::new().build();

        let admin = Router::new()
            .route("/api/admin/cache/clear", post(handlers::clear_cache::<P>))
            .route("/api/admin/refresh", post(handlers::force_refresh::<P>))
            .route_layer(middleware::from_fn_with_state(
                self.auth.clone(),
                admin_middleware,
            ));

        Router::new()
            .route("/health", get(handlers::health::<P>))
            .route("/api/health", get(handlers::health::<P>))
            .route("/api/rates", get(handlers::get_all_rates::<P>))
            .route("/api/rates/{base}", get(handlers::get_rates_for_base::<P>))
            .route("/api/convert", get(handlers::convert::<P>))
            .route(
                "/api/currencies",
                get(handlers::get_supported_currencies::<P>),
            )
            .merge(admin)
            .with_state(self.state.clone())
            .merge(SwaggerUi::new("/api-docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
            .layer(metrics)
            .layer(middleware::from_fn_with_state(
                self.rate_limiter.clone(),
                rate_limit_middleware,
            ))
            .layer(middleware::from_fn_with_state(
                self.auth.clone(),
                auth_middleware,
            ))
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
    }

    /// Runs the server on the given address with graceful shutdown.
    pub async fn run(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Server listening on {}", listener.local_addr()?);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown...");
}
