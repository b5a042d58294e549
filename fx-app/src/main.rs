//! # FX Application
//!
//! Binary that wires together all the components:
//! - Load configuration from environment
//! - Build the upstream rate provider
//! - Create the rate service and start the refresh scheduler
//! - Start the HTTP server

mod config;

use std::sync::Arc;

use opentelemetry::global;
use opentelemetry_sdk::{propagation::TraceContextPropagator, trace as sdktrace};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use exchange_rates::{RateService, RefreshScheduler};
use fx_hex::HttpServer;
use fx_provider::build_provider;

fn init_tracer() -> anyhow::Result<(sdktrace::Tracer, sdktrace::SdkTracerProvider)> {
    global::set_text_map_propagator(TraceContextPropagator::new());

    // Use gRPC exporter with batch processing (non-blocking)
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .build()?;

    let provider = sdktrace::SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .build();

    global::set_tracer_provider(provider.clone());

    use opentelemetry::trace::TracerProvider as _;
    Ok((provider.tracer("currency-converter-api"), provider))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // OpenTelemetry export is opt-in
    let otel = if std::env::var_os("OTEL_EXPORTER_OTLP_ENDPOINT").is_some() {
        Some(init_tracer()?)
    } else {
        None
    };
    let telemetry = otel
        .as_ref()
        .map(|(tracer, _)| tracing_opentelemetry::layer().with_tracer(tracer.clone()));

    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "info,fx_app=debug,fx_hex=debug,exchange_rates=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(telemetry)
        .init();

    // Load configuration
    let config = config::Config::from_env()?;

    tracing::info!(
        port = config.port,
        environment = %config.environment,
        "Starting currency rates server"
    );
    tracing::info!(
        provider = ?config.provider.kind,
        base_url = %config.provider.base_url,
        "Using rate provider"
    );
    if config.proxy_secret.is_none() {
        tracing::warn!("RAPIDAPI_PROXY_SECRET not set, gateway authentication disabled");
    }
    if config.admin_token.is_none() {
        tracing::info!("ADMIN_TOKEN not set, admin endpoints disabled");
    }

    let provider = build_provider(&config.provider)?;
    let service = Arc::new(RateService::new(provider, config.service.clone()));
    let scheduler = Arc::new(RefreshScheduler::new(
        service.clone(),
        config.scheduler.clone(),
    ));
    scheduler.start();

    // Warm the cache so the first request does not wait on upstream
    if let Err(err) = service.fetch_rates().await {
        tracing::warn!(error = %err, "Initial rate fetch failed, serving will retry on demand");
    }

    // Create and run the HTTP server
    let server = HttpServer::new(scheduler.clone(), config.server_options());
    let addr = format!("0.0.0.0:{}", config.port);

    let result = server.run(&addr).await;

    scheduler.stop();

    // Ensure traces are flushed before exit
    if let Some((_, provider)) = otel {
        let _ = provider.shutdown();
    }
    result
}
