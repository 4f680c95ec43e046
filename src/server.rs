//! HTTP surface
//!
//! Routes are mounted twice, at the root and under `/api`, so the dashboard
//! works with either base path. Every response body is an `Envelope` except
//! `/health`.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::HeaderValue;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::CorsOrigins;
use crate::data::{CurrentConditions, ForecastDay, WeatherReport};
use crate::error::{StatusMapping, WeatherError};
use crate::handler::{WeatherParams, WeatherQuery, WeatherService};

/// Shared state handed to every route
#[derive(Debug, Clone)]
pub struct AppState {
    pub service: Arc<WeatherService>,
    pub status_mapping: StatusMapping,
}

impl AppState {
    pub fn new(service: WeatherService, status_mapping: StatusMapping) -> Self {
        Self {
            service: Arc::new(service),
            status_mapping,
        }
    }
}

/// Response wrapper shared by all weather endpoints
///
/// Exactly one of `dados` and `erro` is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub sucesso: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dados: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub erro: Option<String>,
}

impl<T> Envelope<T> {
    pub fn success(dados: T) -> Self {
        Self {
            sucesso: true,
            dados: Some(dados),
            erro: None,
        }
    }

    pub fn failure(erro: impl Into<String>) -> Self {
        Self {
            sucesso: false,
            dados: None,
            erro: Some(erro.into()),
        }
    }
}

/// Body of `GET /health`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: String,
}

/// A `WeatherError` paired with the status mapping in force
#[derive(Debug)]
pub struct ApiError {
    error: WeatherError,
    mapping: StatusMapping,
}

impl ApiError {
    fn new(error: WeatherError, mapping: StatusMapping) -> Self {
        Self { error, mapping }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.error.status_code(self.mapping);
        tracing::warn!(status = status.as_u16(), error = %self.error, "request failed");
        let body = Envelope::<()>::failure(self.error.to_string());
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<Envelope<T>>, ApiError>;

/// Validates the query string, mapping extractor failures into the envelope
fn parse_query(
    state: &AppState,
    params: Result<Query<WeatherParams>, QueryRejection>,
) -> Result<WeatherQuery, ApiError> {
    let fail = |e| ApiError::new(e, state.status_mapping);
    let Query(params) = params
        .map_err(|_| fail(WeatherError::validation("Parâmetros de consulta inválidos.")))?;
    WeatherQuery::from_params(&params).map_err(fail)
}

/// `GET /weather`: current conditions and forecast together
async fn weather(
    State(state): State<AppState>,
    params: Result<Query<WeatherParams>, QueryRejection>,
) -> ApiResult<WeatherReport> {
    let query = parse_query(&state, params)?;
    let report = state
        .service
        .weather(&query)
        .await
        .map_err(|e| ApiError::new(e, state.status_mapping))?;
    Ok(Json(Envelope::success(report)))
}

/// `GET /weather/current`
async fn current(
    State(state): State<AppState>,
    params: Result<Query<WeatherParams>, QueryRejection>,
) -> ApiResult<CurrentConditions> {
    let query = parse_query(&state, params)?;
    let fail = |e| ApiError::new(e, state.status_mapping);

    let coords = state.service.locate(&query.location).await.map_err(fail)?;
    let current = state.service.current(coords).await.map_err(fail)?;
    Ok(Json(Envelope::success(current)))
}

/// `GET /weather/forecast`
async fn forecast(
    State(state): State<AppState>,
    params: Result<Query<WeatherParams>, QueryRejection>,
) -> ApiResult<Vec<ForecastDay>> {
    let query = parse_query(&state, params)?;
    let fail = |e| ApiError::new(e, state.status_mapping);

    let coords = state.service.locate(&query.location).await.map_err(fail)?;
    let days = state
        .service
        .forecast(coords, query.days)
        .await
        .map_err(fail)?;
    Ok(Json(Envelope::success(days)))
}

async fn health(State(state): State<AppState>) -> Json<HealthStatus> {
    let now = state.service.cache().clock().now();
    Json(HealthStatus {
        status: "ok".to_string(),
        timestamp: now.to_rfc3339_opts(SecondsFormat::Secs, true),
    })
}

/// Build CORS layer from configured origins.
///
/// Any method and header is allowed; preflight results are not cached by the
/// browser (`max-age: 0`).
pub fn build_cors_layer(origins: &CorsOrigins) -> CorsLayer {
    let allow_origin = match origins {
        CorsOrigins::Any => AllowOrigin::any(),
        CorsOrigins::List(list) => {
            let allowed: Vec<HeaderValue> = list
                .iter()
                .filter_map(|origin| match origin.parse() {
                    Ok(value) => Some(value),
                    Err(_) => {
                        tracing::warn!(%origin, "ignoring unparsable CORS origin");
                        None
                    }
                })
                .collect();
            AllowOrigin::list(allowed)
        }
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(Duration::from_secs(0))
}

/// Builds the application router
pub fn router(state: AppState, cors: &CorsOrigins) -> Router {
    let routes = Router::new()
        .route("/weather", get(weather))
        .route("/weather/current", get(current))
        .route("/weather/forecast", get(forecast))
        .route("/health", get(health));

    Router::new()
        .merge(routes.clone())
        .nest("/api", routes)
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(cors))
        .with_state(state)
}
