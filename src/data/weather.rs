//! WeatherAPI.com client
//!
//! This module fetches current conditions, multi-day forecasts and city search
//! results from WeatherAPI.com and normalizes them into our data structures.
//! Missing fields fall back to documented defaults instead of failing the call.

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Local, NaiveDate, NaiveDateTime};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::{Conditions, Coordinates, CurrentConditions, ForecastDay, LocationMatch};
use crate::error::ProviderError;

/// Base URL for the WeatherAPI.com API
pub const WEATHERAPI_BASE_URL: &str = "https://api.weatherapi.com/v1";

/// Default bound on each upstream call
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default response language
pub const DEFAULT_LANG: &str = "pt";

/// Placeholder for missing place names
const UNKNOWN_PLACE: &str = "N/A";

/// Placeholder for missing condition text
const UNKNOWN_CONDITION: &str = "Desconhecido";

/// Placeholder for missing wind direction
const UNKNOWN_WIND_DIRECTION: &str = "N/D";

/// Format of the provider's `localtime` field
const LOCALTIME_FORMAT: &str = "%Y-%m-%d %H:%M";

const CONTEXT_CURRENT: &str = "Erro na API";
const CONTEXT_FORECAST: &str = "Erro na previsão";
const CONTEXT_SEARCH: &str = "Erro na busca de cidades";

/// Upstream operations the request handler depends on
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    /// Current conditions at `coords`
    async fn current(&self, coords: Coordinates) -> Result<CurrentConditions, ProviderError>;

    /// Up to `days` forecast days at `coords`, ascending by date
    async fn forecast(
        &self,
        coords: Coordinates,
        days: u8,
    ) -> Result<Vec<ForecastDay>, ProviderError>;

    /// Candidate locations for a free-text query, in provider order
    async fn search(&self, query: &str) -> Result<Vec<LocationMatch>, ProviderError>;
}

/// Client for the WeatherAPI.com REST API
#[derive(Debug, Clone)]
pub struct WeatherApiClient {
    client: Client,
    base_url: String,
    api_key: String,
    lang: String,
}

impl WeatherApiClient {
    /// Create a new client whose requests are bounded by `timeout`
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, api_key))
    }

    /// Create a new client with a custom HTTP client
    pub fn with_client(client: Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: WEATHERAPI_BASE_URL.to_string(),
            api_key: api_key.into(),
            lang: DEFAULT_LANG.to_string(),
        }
    }

    /// Point the client at another base URL (trailing slashes are ignored)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET `<base>/<endpoint>` and decode the body, mapping failures to `ProviderError`
    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
        context: &'static str,
    ) -> Result<T, ProviderError> {
        let result = self.get_inner(endpoint, params, context).await;
        if let Err(ref e) = result {
            tracing::warn!(endpoint, timeout = e.is_timeout(), error = %e, "provider call failed");
        }
        result
    }

    async fn get_inner<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
        context: &'static str,
    ) -> Result<T, ProviderError> {
        let url = format!("{}/{}", self.base_url, endpoint);

        let mut query: Vec<(&str, &str)> = vec![("key", self.api_key.as_str())];
        query.extend(params.iter().map(|(k, v)| (*k, v.as_str())));
        query.push(("lang", self.lang.as_str()));

        let response = self.client.get(&url).query(&query).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(upstream_error(context, &text, status));
        }

        let value: serde_json::Value =
            serde_json::from_str(&text).map_err(|e| ProviderError::Decode(e.to_string()))?;

        // The provider may report errors inside a 2xx body too
        if let Some(message) = error_message(&value) {
            return Err(ProviderError::Upstream { context, message });
        }

        serde_json::from_value(value).map_err(|e| ProviderError::Decode(e.to_string()))
    }
}

#[async_trait]
impl WeatherProvider for WeatherApiClient {
    async fn current(&self, coords: Coordinates) -> Result<CurrentConditions, ProviderError> {
        let response: CurrentResponse = self
            .get("current.json", &[("q", coords.query())], CONTEXT_CURRENT)
            .await?;
        Ok(normalize_current(response, Local::now().naive_local()))
    }

    async fn forecast(
        &self,
        coords: Coordinates,
        days: u8,
    ) -> Result<Vec<ForecastDay>, ProviderError> {
        let response: ForecastResponse = self
            .get(
                "forecast.json",
                &[("q", coords.query()), ("days", days.to_string())],
                CONTEXT_FORECAST,
            )
            .await?;
        Ok(normalize_forecast(response, days, Local::now().date_naive()))
    }

    async fn search(&self, query: &str) -> Result<Vec<LocationMatch>, ProviderError> {
        let results: Vec<SearchResult> = self
            .get("search.json", &[("q", query.to_string())], CONTEXT_SEARCH)
            .await?;
        Ok(normalize_matches(results))
    }
}

/// Builds the error for a non-success response
///
/// Uses the provider's `error.message` when the body carries one, otherwise the
/// raw body, otherwise the status line.
fn upstream_error(context: &'static str, body: &str, status: reqwest::StatusCode) -> ProviderError {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| error_message(&value))
        .or_else(|| {
            let trimmed = body.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .unwrap_or_else(|| format!("HTTP {}", status));

    ProviderError::Upstream { context, message }
}

/// Extracts `error.message` from a provider error payload
fn error_message(value: &serde_json::Value) -> Option<String> {
    let error = value.get("error")?;
    Some(
        error
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string()),
    )
}

/// Converts a provider percentage to `u8`, clamped to 0-100
fn percent(value: Option<f64>) -> u8 {
    value.unwrap_or(0.0).round().clamp(0.0, 100.0) as u8
}

fn text_or(value: Option<String>, default: &str) -> String {
    match value {
        Some(s) if !s.trim().is_empty() => s,
        _ => default.to_string(),
    }
}

/// Normalizes a `current.json` response; `now` fills a missing `localtime`
pub fn normalize_current(response: CurrentResponse, now: NaiveDateTime) -> CurrentConditions {
    let location = response.location.unwrap_or_default();
    let current = response.current.unwrap_or_default();
    let condition = current.condition.unwrap_or_default();

    CurrentConditions {
        city: text_or(location.name, UNKNOWN_PLACE),
        region: text_or(location.region, UNKNOWN_PLACE),
        country: text_or(location.country, UNKNOWN_PLACE),
        last_updated: location
            .localtime
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| now.format(LOCALTIME_FORMAT).to_string()),
        conditions: Conditions {
            temperature: current.temp_c.unwrap_or(0.0),
            condition_text: text_or(condition.text, UNKNOWN_CONDITION),
            icon: condition.icon.unwrap_or_default(),
            humidity: percent(current.humidity),
            wind_kph: current.wind_kph.unwrap_or(0.0),
            wind_direction: text_or(current.wind_dir, UNKNOWN_WIND_DIRECTION),
            pressure_mb: current.pressure_mb.unwrap_or(0.0),
            feels_like: current.feelslike_c.unwrap_or(0.0),
            uv: current.uv.unwrap_or(0.0),
        },
    }
}

/// Normalizes a `forecast.json` response into at most `days` days, ascending by date
///
/// `today` fills a missing or unparsable date. Fewer days than requested is
/// returned as-is.
pub fn normalize_forecast(response: ForecastResponse, days: u8, today: NaiveDate) -> Vec<ForecastDay> {
    let raw_days = response
        .forecast
        .and_then(|f| f.forecastday)
        .unwrap_or_default();

    let mut forecast: Vec<ForecastDay> = raw_days
        .into_iter()
        .map(|raw| {
            let day = raw.day.unwrap_or_default();
            let condition = day.condition.unwrap_or_default();
            ForecastDay {
                date: raw
                    .date
                    .as_deref()
                    .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
                    .unwrap_or(today),
                condition: text_or(condition.text, UNKNOWN_CONDITION),
                icon: condition.icon.unwrap_or_default(),
                min_temp: day.mintemp_c.unwrap_or(0.0),
                max_temp: day.maxtemp_c.unwrap_or(0.0),
                chance_of_rain: percent(day.daily_chance_of_rain),
                precipitation_mm: day.totalprecip_mm.unwrap_or(0.0),
                uv: day.uv.unwrap_or(0.0),
            }
        })
        .collect();

    // Stable, so same-date days keep provider order
    forecast.sort_by_key(|day| day.date);
    forecast.truncate(usize::from(days));
    forecast
}

/// Normalizes search results, dropping candidates without coordinates
pub fn normalize_matches(results: Vec<SearchResult>) -> Vec<LocationMatch> {
    results
        .into_iter()
        .filter_map(|r| {
            Some(LocationMatch {
                latitude: r.lat?,
                longitude: r.lon?,
                name: r.name.unwrap_or_default(),
                region: r.region.unwrap_or_default(),
                country: r.country.unwrap_or_default(),
            })
        })
        .collect()
}

/// `current.json` response
#[derive(Debug, Default, Deserialize)]
pub struct CurrentResponse {
    #[serde(default)]
    location: Option<ApiLocation>,
    #[serde(default)]
    current: Option<ApiCurrent>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiLocation {
    name: Option<String>,
    region: Option<String>,
    country: Option<String>,
    localtime: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiCurrent {
    temp_c: Option<f64>,
    condition: Option<ApiCondition>,
    humidity: Option<f64>,
    wind_kph: Option<f64>,
    wind_dir: Option<String>,
    pressure_mb: Option<f64>,
    feelslike_c: Option<f64>,
    uv: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiCondition {
    text: Option<String>,
    icon: Option<String>,
}

/// `forecast.json` response
#[derive(Debug, Default, Deserialize)]
pub struct ForecastResponse {
    #[serde(default)]
    forecast: Option<ApiForecast>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiForecast {
    forecastday: Option<Vec<ApiForecastDay>>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiForecastDay {
    date: Option<String>,
    day: Option<ApiDay>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiDay {
    maxtemp_c: Option<f64>,
    mintemp_c: Option<f64>,
    totalprecip_mm: Option<f64>,
    daily_chance_of_rain: Option<f64>,
    condition: Option<ApiCondition>,
    uv: Option<f64>,
}

/// One `search.json` result
#[derive(Debug, Default, Deserialize)]
pub struct SearchResult {
    name: Option<String>,
    region: Option<String>,
    country: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
}
