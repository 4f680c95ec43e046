//! Error taxonomy for weather lookups
//!
//! `ProviderError` covers everything that can go wrong talking to the upstream
//! weather API. `WeatherError` is what the request handler surfaces to callers;
//! it wraps provider failures and adds validation and location-resolution errors.

use axum::http::StatusCode;
use thiserror::Error;

/// Errors raised by the upstream weather provider
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Non-success status or an error payload reported by the provider
    #[error("{context}: {message}")]
    Upstream {
        /// Prefix naming the failed operation (e.g. "Erro na API")
        context: &'static str,
        /// Provider message when available, otherwise the raw body
        message: String,
    },

    /// The upstream call exceeded its time bound
    #[error("Tempo esgotado ao consultar o provedor de clima")]
    Timeout,

    /// Connection-level failure
    #[error("Falha na requisição ao provedor de clima: {0}")]
    Transport(#[source] reqwest::Error),

    /// Body could not be read as JSON at all
    #[error("Resposta inválida do provedor de clima: {0}")]
    Decode(String),
}

impl ProviderError {
    /// Returns true when the failure was a timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, ProviderError::Timeout)
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout
        } else if err.is_decode() {
            ProviderError::Decode(err.to_string())
        } else {
            ProviderError::Transport(err)
        }
    }
}

/// Errors surfaced by the weather request handler
#[derive(Debug, Error)]
pub enum WeatherError {
    /// Missing or malformed request parameters
    #[error("{0}")]
    Validation(String),

    /// City search returned no usable match
    #[error("Nenhuma localização encontrada para '{query}'")]
    NoLocationFound {
        /// The free-text query that was searched
        query: String,
    },

    /// Upstream failure, including timeouts
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl WeatherError {
    /// Shorthand for building a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        WeatherError::Validation(message.into())
    }

    /// HTTP status for this error under the given mapping
    pub fn status_code(&self, mapping: StatusMapping) -> StatusCode {
        match mapping {
            StatusMapping::Uniform => StatusCode::BAD_REQUEST,
            StatusMapping::Differentiated => match self {
                WeatherError::Validation(_) => StatusCode::BAD_REQUEST,
                WeatherError::NoLocationFound { .. } => StatusCode::NOT_FOUND,
                WeatherError::Provider(ProviderError::Timeout) => StatusCode::GATEWAY_TIMEOUT,
                WeatherError::Provider(_) => StatusCode::BAD_GATEWAY,
            },
        }
    }
}

/// How failures are mapped onto HTTP status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum StatusMapping {
    /// Every failure is a 400
    #[default]
    Uniform,
    /// 400 for validation, 404 for unknown locations, 502/504 for the provider
    Differentiated,
}
