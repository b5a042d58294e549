//! FX CLI
//!
//! Command-line interface for the currency rates API.

use anyhow::Result;
use clap::{Parser, Subcommand};

use fx_client::RatesClient;

#[derive(Parser)]
#[command(name = "fx")]
#[command(author, version, about = "Currency rates API CLI client", long_about = None)]
struct Cli {
    /// Base URL of the currency rates API
    #[arg(long, env = "FX_API_URL", default_value = "http://localhost:3000")]
    api_url: String,

    /// RapidAPI key sent as x-rapidapi-key
    #[arg(long, env = "RAPIDAPI_KEY", requires = "proxy_secret")]
    rapidapi_key: Option<String>,

    /// Gateway secret sent as x-rapidapi-proxy-secret
    #[arg(long, env = "RAPIDAPI_PROXY_SECRET", requires = "rapidapi_key")]
    proxy_secret: Option<String>,

    /// Operator token sent as x-admin-token on admin commands
    #[arg(long, env = "ADMIN_TOKEN")]
    admin_token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check API health
    Health,
    /// Show the latest rate table
    Rates {
        /// Re-express rates relative to this currency
        #[arg(long)]
        base: Option<String>,
    },
    /// Convert an amount between two currencies
    Convert {
        amount: f64,
        /// Source currency (e.g. USD)
        from: String,
        /// Target currency (e.g. EUR)
        to: String,
    },
    /// List supported currencies
    Currencies,
    /// Cache and refresh management
    Admin {
        #[command(subcommand)]
        action: AdminCommands,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Drop the server's cached rates
    ClearCache,
    /// Refresh rates from the provider now
    Refresh,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut client = RatesClient::new(&cli.api_url);
    if let (Some(key), Some(secret)) = (cli.rapidapi_key, cli.proxy_secret) {
        client = client.with_rapidapi(key, secret);
    }
    if let Some(token) = cli.admin_token {
        client = client.with_admin_token(token);
    }

    match cli.command {
        Commands::Health => match client.health().await {
            Ok(health) => {
                println!("✓ API is healthy");
                println!("{}", serde_json::to_string_pretty(&health)?);
            }
            Err(err) => {
                println!("✗ API is not healthy: {}", err);
                std::process::exit(1);
            }
        },

        Commands::Rates { base } => {
            let rates = client.rates(base.as_deref()).await?;
            println!("{}", serde_json::to_string_pretty(&rates)?);
        }

        Commands::Convert { amount, from, to } => {
            let result = client.convert(amount, &from, &to).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }

        Commands::Currencies => {
            let currencies = client.currencies().await?;
            println!("{}", serde_json::to_string_pretty(&currencies)?);
        }

        Commands::Admin { action } => match action {
            AdminCommands::ClearCache => {
                client.clear_cache().await?;
                println!("✓ Cache cleared");
            }
            AdminCommands::Refresh => {
                let refreshed = client.refresh().await?;
                println!("{}", serde_json::to_string_pretty(&refreshed)?);
            }
        },
    }

    Ok(())
}
