//! Command-line interface parsing for the weather proxy
//!
//! Every flag has an environment fallback so the service can be configured
//! from a `.env` file in deployment and from flags during development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration as StdDuration;

use chrono::Duration;
use clap::Parser;
use reqwest::Url;
use thiserror::Error;

use crate::cache::FileStore;
use crate::config::{CacheBackend, CacheTtls, CorsOrigins, ProviderConfig, ServiceConfig};
use crate::error::StatusMapping;

/// Error types for CLI argument validation
#[derive(Debug, Error)]
pub enum CliError {
    /// The WeatherAPI key is empty
    #[error("A WeatherAPI key is required (--api-key or WEATHERAPI_KEY)")]
    MissingApiKey,

    /// The bind address is not `host:port`
    #[error("Invalid bind address: '{0}'")]
    InvalidBind(String),

    /// The provider base URL does not parse
    #[error("Invalid base URL: '{0}'")]
    InvalidBaseUrl(String),

    /// A duration flag was zero
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),

    /// `--disk-cache` was given but no platform cache directory exists
    #[error("Could not determine a cache directory; pass --cache-dir")]
    NoCacheDir,
}

/// Caching proxy between the weather dashboard and WeatherAPI.com
#[derive(Parser, Debug)]
#[command(name = "clima-proxy")]
#[command(about = "Caching weather proxy for the dashboard (WeatherAPI.com)")]
#[command(version)]
pub struct Cli {
    /// Address to listen on
    #[arg(long, env = "CLIMA_BIND", default_value = "0.0.0.0:8000")]
    pub bind: String,

    /// WeatherAPI.com API key
    #[arg(long, env = "WEATHERAPI_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Provider base URL
    #[arg(long, env = "WEATHERAPI_BASE_URL", default_value = "https://api.weatherapi.com/v1")]
    pub base_url: String,

    /// Language for provider condition texts
    #[arg(long, env = "WEATHERAPI_LANG", default_value = "pt")]
    pub lang: String,

    /// Upstream request timeout in seconds
    #[arg(long, env = "WEATHERAPI_TIMEOUT_SECS", default_value_t = 5)]
    pub timeout_secs: u64,

    /// Region preferred when a city name is ambiguous (empty disables)
    #[arg(long, env = "PREFERRED_REGION", default_value = "Espírito Santo")]
    pub preferred_region: String,

    /// Country preferred when no result is in the preferred region (empty disables)
    #[arg(long, env = "PREFERRED_COUNTRY", default_value = "Brazil")]
    pub preferred_country: String,

    /// Comma-separated list of allowed CORS origins, or `*`
    #[arg(long, env = "CORS_ALLOWED_ORIGINS", default_value = "http://localhost:3000")]
    pub cors_origins: String,

    /// Minutes current conditions stay cached
    #[arg(long, env = "CURRENT_TTL_MINS", default_value_t = 10)]
    pub current_ttl_mins: u32,

    /// Minutes forecasts stay cached
    #[arg(long, env = "FORECAST_TTL_MINS", default_value_t = 60)]
    pub forecast_ttl_mins: u32,

    /// Persist cache entries as files in this directory
    #[arg(long, env = "CLIMA_CACHE_DIR", value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Persist cache entries in the platform cache directory
    #[arg(long, conflicts_with = "cache_dir")]
    pub disk_cache: bool,

    /// How failures map onto HTTP status codes
    #[arg(long, env = "CLIMA_STATUS_CODES", value_enum, default_value_t = StatusMapping::Uniform)]
    pub status_codes: StatusMapping,

    /// Log filter directives
    #[arg(long, env = "RUST_LOG", default_value = "info,clima_proxy=debug")]
    pub log_level: String,
}

impl ServiceConfig {
    /// Creates a ServiceConfig from parsed CLI arguments.
    ///
    /// # Arguments
    /// * `cli` - The parsed CLI struct
    ///
    /// # Returns
    /// * `Ok(ServiceConfig)` with validated settings
    /// * `Err(CliError)` if any value is unusable
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let api_key = cli.api_key.trim();
        if api_key.is_empty() {
            return Err(CliError::MissingApiKey);
        }

        let bind: SocketAddr = cli
            .bind
            .parse()
            .map_err(|_| CliError::InvalidBind(cli.bind.clone()))?;

        let base_url = cli.base_url.trim().trim_end_matches('/');
        Url::parse(base_url).map_err(|_| CliError::InvalidBaseUrl(cli.base_url.clone()))?;

        if cli.timeout_secs == 0 {
            return Err(CliError::ZeroDuration("--timeout-secs"));
        }

        let ttls = CacheTtls {
            current: minutes(cli.current_ttl_mins, "--current-ttl-mins")?,
            forecast: minutes(cli.forecast_ttl_mins, "--forecast-ttl-mins")?,
        };

        let cache_backend = match (&cli.cache_dir, cli.disk_cache) {
            (Some(dir), _) => CacheBackend::Disk(dir.clone()),
            (None, true) => {
                let store = FileStore::new().ok_or(CliError::NoCacheDir)?;
                CacheBackend::Disk(store.dir().to_path_buf())
            }
            (None, false) => CacheBackend::Memory,
        };

        Ok(ServiceConfig {
            bind,
            provider: ProviderConfig {
                api_key: api_key.to_string(),
                base_url: base_url.to_string(),
                lang: cli.lang.trim().to_string(),
                timeout: StdDuration::from_secs(cli.timeout_secs),
            },
            preferred_region: non_empty(&cli.preferred_region),
            preferred_country: non_empty(&cli.preferred_country),
            cors_origins: CorsOrigins::parse(&cli.cors_origins),
            ttls,
            cache_backend,
            status_mapping: cli.status_codes,
        })
    }
}

fn minutes(value: u32, flag: &'static str) -> Result<Duration, CliError> {
    if value == 0 {
        return Err(CliError::ZeroDuration(flag));
    }
    Ok(Duration::minutes(i64::from(value)))
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}
