//! Client example exercising every endpoint against an in-process server.
//!
//! Run with: cargo run -p fx-app --example client_example

use std::net::SocketAddr;
use std::sync::Arc;

use exchange_rates::{RateService, RateServiceConfig, RefreshScheduler, SchedulerConfig};
use fx_client::RatesClient;
use fx_hex::{AuthConfig, HttpServer, ServerOptions};
use fx_provider::StaticRateProvider;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt().with_env_filter("info").init();

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr: SocketAddr = listener.local_addr()?;

    println!("🚀 Starting server on {addr} with the static rate table...");

    let provider = StaticRateProvider::default().with_variance(0.5);
    let service = Arc::new(RateService::new(provider, RateServiceConfig::default()));
    let scheduler = Arc::new(RefreshScheduler::new(service, SchedulerConfig::default()));
    scheduler.start();

    let server = HttpServer::new(
        scheduler.clone(),
        ServerOptions {
            auth: AuthConfig::with_proxy_secret("example-secret").admin_token("example-admin"),
            ..ServerOptions::default()
        },
    );
    let router = server.router();

    tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, router.into_make_service()).await {
            eprintln!("server error: {err}");
        }
    });

    let client = RatesClient::new(format!("http://{addr}"));

    // Health check
    let health = client.health().await?;
    println!("✅ Server health: {} ({})", health.status, health.provider);

    // Gateway headers are required for everything except /health
    let response = client.currencies().await;
    assert!(response.is_err());
    println!("✅ Rejected without RapidAPI headers: {}", response.unwrap_err());

    let client = client.with_rapidapi("example-key", "example-secret");

    let currencies = client.currencies().await?;
    println!("✅ {} currencies: {:?}", currencies.count, currencies.currencies);

    let rates = client.rates(Some("EUR")).await?;
    println!("✅ Rates in {} as of {}:", rates.base, rates.timestamp);
    for (code, rate) in &rates.rates {
        println!("   - {code}: {rate}");
    }

    let result = client.convert(250.0, "USD", "JPY").await?;
    println!(
        "✅ {} {} = {} {} (rate {})",
        result.amount, result.from, result.result, result.to, result.rate
    );

    // Admin routes also need the operator token
    assert!(client.clear_cache().await.is_err());
    println!("✅ Admin route rejected without the operator token");

    let client = client.with_admin_token("example-admin");

    client.clear_cache().await?;
    println!("✅ Cache cleared");

    let refreshed = client.refresh().await?;
    println!(
        "✅ Refreshed {} currencies as of {}",
        refreshed.currencies, refreshed.as_of
    );

    scheduler.stop();
    println!("\n🎉 Example completed successfully!");

    Ok(())
}
