//! Typed service configuration
//!
//! Built from the command line (see `cli`) and handed to the server at startup.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration as StdDuration;

use chrono::Duration;

use crate::data::weather::{DEFAULT_LANG, DEFAULT_TIMEOUT, WEATHERAPI_BASE_URL};
use crate::error::StatusMapping;

/// How long each kind of lookup stays fresh in the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtls {
    pub current: Duration,
    pub forecast: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            current: Duration::minutes(10),
            forecast: Duration::minutes(60),
        }
    }
}

/// Where cache entries live
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CacheBackend {
    /// Process memory; lost on restart
    #[default]
    Memory,
    /// One JSON file per key under the given directory
    Disk(PathBuf),
}

/// Origins allowed to call the public endpoints from a browser
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsOrigins {
    Any,
    List(Vec<String>),
}

impl CorsOrigins {
    /// Parses a comma-separated list; `*` anywhere means any origin
    pub fn parse(raw: &str) -> Self {
        let origins: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(|o| o.trim_end_matches('/').to_string())
            .collect();

        if origins.iter().any(|o| o == "*") {
            CorsOrigins::Any
        } else {
            CorsOrigins::List(origins)
        }
    }
}

impl Default for CorsOrigins {
    fn default() -> Self {
        CorsOrigins::List(vec!["http://localhost:3000".to_string()])
    }
}

/// Upstream provider settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub api_key: String,
    pub base_url: String,
    pub lang: String,
    pub timeout: StdDuration,
}

impl ProviderConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: WEATHERAPI_BASE_URL.to_string(),
            lang: DEFAULT_LANG.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Everything the service needs to start
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub bind: SocketAddr,
    pub provider: ProviderConfig,
    pub preferred_region: Option<String>,
    pub preferred_country: Option<String>,
    pub cors_origins: CorsOrigins,
    pub ttls: CacheTtls,
    pub cache_backend: CacheBackend,
    pub status_mapping: StatusMapping,
}
