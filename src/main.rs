//! Clima Proxy - caching weather proxy for the dashboard
//!
//! Serves `/weather`, `/weather/current`, `/weather/forecast` and `/health`,
//! fetching from WeatherAPI.com and caching results per location.

use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use clima_proxy::cache::CacheManager;
use clima_proxy::cli::Cli;
use clima_proxy::config::{CacheBackend, ServiceConfig};
use clima_proxy::data::WeatherApiClient;
use clima_proxy::handler::WeatherService;
use clima_proxy::resolver::LocationResolver;
use clima_proxy::server::{router, AppState};

const DEFAULT_LOG_FILTER: &str = "info,clima_proxy=debug";

fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Builds the service from config and serves until a shutdown signal arrives
async fn run(config: ServiceConfig) -> Result<(), Box<dyn std::error::Error>> {
    let provider = WeatherApiClient::new(&config.provider.api_key, config.provider.timeout)?
        .with_base_url(&config.provider.base_url)
        .with_lang(&config.provider.lang);

    let cache = match &config.cache_backend {
        CacheBackend::Memory => CacheManager::in_memory(),
        CacheBackend::Disk(dir) => {
            tracing::info!(dir = %dir.display(), "using file-backed cache");
            CacheManager::with_dir(dir.clone())
        }
    };

    let resolver = LocationResolver::new(
        config.preferred_region.clone(),
        config.preferred_country.clone(),
    );
    let service = WeatherService::new(Arc::new(provider), cache, resolver, config.ttls);
    let app = router(
        AppState::new(service, config.status_mapping),
        &config.cors_origins,
    );

    let listener = TcpListener::bind(config.bind).await?;
    tracing::info!(
        addr = %config.bind,
        provider = %config.provider.base_url,
        status_codes = ?config.status_mapping,
        "clima-proxy listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
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

    tracing::info!("shutdown signal received");
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let config = match ServiceConfig::from_cli(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "server error");
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
