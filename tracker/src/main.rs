use anyhow::{Context, Result};
use clap::Parser;
use crypto_tracker::{router, MarketStore, QueryService, Scheduler, UpdateCycle};
use crypto_tracker_common::{TrackerConfig, HISTORY_CAPACITY};
use quote_feed::CoinGeckoClient;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Polls CoinGecko and serves the latest prices, stats and deviation.
#[derive(Parser, Debug)]
#[command(name = "crypto-tracker", version, about)]
struct Cli {
    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen port (overrides config and PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Skip the fetch at startup and wait for the first scheduled tick
    #[arg(long)]
    no_startup_fetch: bool,
}

fn load_config(cli: &Cli) -> Result<TrackerConfig> {
    let mut config = match &cli.config {
        Some(path) => TrackerConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => TrackerConfig::default(),
    };

    config.apply_env().context("reading environment")?;
    if let Some(port) = cli.port {
        config.port = port;
    }
    if cli.no_startup_fetch {
        config.fetch_on_startup = false;
    }

    config.validate()?;
    Ok(config)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let store = Arc::new(MarketStore::new(config.assets.clone(), HISTORY_CAPACITY));
    let fetcher = CoinGeckoClient::with_options(
        config.api_base_url.clone(),
        config.api_key.clone(),
        config.request_timeout(),
    )
    .context("building HTTP client")?;

    let cycle = Arc::new(UpdateCycle::new(Arc::new(fetcher), store.clone()));
    let scheduler = Scheduler::from_config(cycle, &config)
        .context("building scheduler")?
        .spawn();

    let app = router(QueryService::new(store));

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;

    info!("Server is running on http://{}", addr);
    info!("Tracking: {}", config.asset_keys().join(", "));
    info!("Available endpoints:");
    info!("  GET /crypto - latest snapshot per coin");
    info!("  GET /stats?coin=<id> - price, market cap, 24h change");
    info!("  GET /deviation?coin=<id> - std deviation of recent prices");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    scheduler.abort();
    Ok(())
}
