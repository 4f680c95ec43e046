//! Core data models for the weather proxy
//!
//! These are the normalized shapes served to the dashboard. Field names on the
//! wire are Portuguese (`cidade`, `previsao`, ...) to match the front-end
//! contract; the Rust names are English.

pub mod weather;

pub use weather::{WeatherApiClient, WeatherProvider};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A latitude/longitude pair, used verbatim in provider queries and cache keys
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Provider query form, `"<lat>,<lon>"`
    pub fn query(&self) -> String {
        format!("{},{}", self.latitude, self.longitude)
    }
}

/// Snapshot of current conditions at a location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    #[serde(rename = "cidade")]
    pub city: String,
    #[serde(rename = "regiao")]
    pub region: String,
    #[serde(rename = "pais")]
    pub country: String,
    /// Provider-local time of the reading, `YYYY-MM-DD HH:MM`
    #[serde(rename = "atualizado_em")]
    pub last_updated: String,
    #[serde(rename = "condicoes")]
    pub conditions: Conditions,
}

/// Measured values inside `CurrentConditions`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conditions {
    /// Temperature in Celsius
    #[serde(rename = "temperatura")]
    pub temperature: f64,
    #[serde(rename = "condicao_texto")]
    pub condition_text: String,
    /// Provider icon URL
    #[serde(rename = "icone")]
    pub icon: String,
    /// Relative humidity percentage (0-100)
    #[serde(rename = "umidade")]
    pub humidity: u8,
    #[serde(rename = "vento_kph")]
    pub wind_kph: f64,
    /// Compass direction, e.g. "SSE"
    #[serde(rename = "direcao_vento")]
    pub wind_direction: String,
    #[serde(rename = "pressao_mb")]
    pub pressure_mb: f64,
    /// Feels-like temperature in Celsius
    #[serde(rename = "sensacao_termica")]
    pub feels_like: f64,
    #[serde(rename = "indice_uv")]
    pub uv: f64,
}

/// Forecast summary for one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastDay {
    #[serde(rename = "data")]
    pub date: NaiveDate,
    #[serde(rename = "condicao")]
    pub condition: String,
    #[serde(rename = "icone")]
    pub icon: String,
    #[serde(rename = "temp_min")]
    pub min_temp: f64,
    #[serde(rename = "temp_max")]
    pub max_temp: f64,
    /// Chance of rain percentage (0-100)
    #[serde(rename = "chance_chuva")]
    pub chance_of_rain: u8,
    #[serde(rename = "precipitacao_mm")]
    pub precipitation_mm: f64,
    #[serde(rename = "indice_uv")]
    pub uv: f64,
}

/// A city search candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationMatch {
    pub name: String,
    pub region: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl LocationMatch {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}

/// Current conditions plus the date-ordered forecast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    #[serde(rename = "atual")]
    pub current: CurrentConditions,
    #[serde(rename = "previsao")]
    pub forecast: Vec<ForecastDay>,
}
