//! Request validation and orchestration
//!
//! `WeatherParams` is the raw query string. `WeatherQuery::from_params` validates
//! it without touching the network, and `WeatherService` resolves the location
//! and fetches conditions and forecast through the cache.

use std::sync::Arc;

use serde::Deserialize;

use crate::cache::{CacheKey, CacheManager};
use crate::config::CacheTtls;
use crate::data::{Coordinates, CurrentConditions, ForecastDay, WeatherProvider, WeatherReport};
use crate::error::WeatherError;
use crate::resolver::LocationResolver;

/// Forecast length when `dias` is omitted
pub const DEFAULT_DAYS: u8 = 3;

/// Longest forecast the provider serves
pub const MAX_DAYS: u8 = 10;

/// Raw query parameters, kept as strings so validation owns the messages
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WeatherParams {
    pub lat: Option<String>,
    pub lon: Option<String>,
    pub cidade: Option<String>,
    pub dias: Option<String>,
}

/// How the caller identified the location
#[derive(Debug, Clone, PartialEq)]
pub enum LocationQuery {
    Coordinates(Coordinates),
    City(String),
}

/// A validated weather request
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherQuery {
    pub location: LocationQuery,
    pub days: u8,
}

impl WeatherQuery {
    /// Validates raw parameters
    ///
    /// Coordinates win when both addressing modes are given. Supplying only one
    /// of `lat`/`lon` is an error even if `cidade` is present.
    pub fn from_params(params: &WeatherParams) -> Result<Self, WeatherError> {
        let location = parse_location(params)?;
        let days = parse_days(params.dias.as_deref())?;
        Ok(Self { location, days })
    }
}

/// Trimmed value, treating blank as absent
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_location(params: &WeatherParams) -> Result<LocationQuery, WeatherError> {
    let lat = present(&params.lat);
    let lon = present(&params.lon);

    if lat.is_some() || lon.is_some() {
        let lat = lat.ok_or_else(|| WeatherError::validation("Latitude é obrigatória."))?;
        let lon = lon.ok_or_else(|| WeatherError::validation("Longitude é obrigatória."))?;
        let latitude = parse_coordinate(lat, "Latitude", 90.0)?;
        let longitude = parse_coordinate(lon, "Longitude", 180.0)?;
        return Ok(LocationQuery::Coordinates(Coordinates::new(latitude, longitude)));
    }

    match params.cidade.as_deref() {
        Some(city) if !city.trim().is_empty() => Ok(LocationQuery::City(city.trim().to_string())),
        Some(_) => Err(WeatherError::validation("O nome da cidade não pode ser vazio.")),
        None => Err(WeatherError::validation(
            "Informe latitude e longitude ou o nome da cidade.",
        )),
    }
}

fn parse_coordinate(raw: &str, name: &str, bound: f64) -> Result<f64, WeatherError> {
    let value: f64 = raw
        .parse()
        .ok()
        .filter(|v: &f64| v.is_finite())
        .ok_or_else(|| WeatherError::validation(format!("{} deve ser um número.", name)))?;

    if !(-bound..=bound).contains(&value) {
        return Err(WeatherError::validation(format!(
            "{} deve estar entre {} e {}.",
            name, -bound, bound
        )));
    }
    Ok(value)
}

fn parse_days(raw: Option<&str>) -> Result<u8, WeatherError> {
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return Ok(DEFAULT_DAYS);
    };

    raw.parse::<u8>()
        .ok()
        .filter(|d| (1..=MAX_DAYS).contains(d))
        .ok_or_else(|| {
            WeatherError::validation(format!(
                "O campo dias deve ser um inteiro entre 1 e {}.",
                MAX_DAYS
            ))
        })
}

/// Orchestrates resolver, cache and provider for one request
#[derive(Debug, Clone)]
pub struct WeatherService {
    provider: Arc<dyn WeatherProvider>,
    cache: CacheManager,
    resolver: LocationResolver,
    ttls: CacheTtls,
}

impl WeatherService {
    pub fn new(
        provider: Arc<dyn WeatherProvider>,
        cache: CacheManager,
        resolver: LocationResolver,
        ttls: CacheTtls,
    ) -> Self {
        Self {
            provider,
            cache,
            resolver,
            ttls,
        }
    }

    pub fn cache(&self) -> &CacheManager {
        &self.cache
    }

    /// Turns a location query into coordinates, searching by name if needed
    pub async fn locate(&self, location: &LocationQuery) -> Result<Coordinates, WeatherError> {
        match location {
            LocationQuery::Coordinates(coords) => Ok(*coords),
            LocationQuery::City(city) => {
                let found = self.resolver.resolve(self.provider.as_ref(), city).await?;
                Ok(found.coordinates())
            }
        }
    }

    /// Current conditions, served from cache while fresh
    pub async fn current(&self, coords: Coordinates) -> Result<CurrentConditions, WeatherError> {
        let provider = &self.provider;
        let current = self
            .cache
            .get_or_compute(&CacheKey::current(coords), self.ttls.current, move || {
                provider.current(coords)
            })
            .await?;
        Ok(current)
    }

    /// Forecast days, served from cache while fresh
    pub async fn forecast(
        &self,
        coords: Coordinates,
        days: u8,
    ) -> Result<Vec<ForecastDay>, WeatherError> {
        let provider = &self.provider;
        let forecast = self
            .cache
            .get_or_compute(&CacheKey::forecast(coords, days), self.ttls.forecast, move || {
                provider.forecast(coords, days)
            })
            .await?;
        Ok(forecast)
    }

    /// Resolves the location, then fetches conditions and forecast
    pub async fn weather(&self, query: &WeatherQuery) -> Result<WeatherReport, WeatherError> {
        let coords = self.locate(&query.location).await?;
        tracing::info!(
            lat = coords.latitude,
            lon = coords.longitude,
            days = query.days,
            "serving weather"
        );

        let (current, forecast) =
            futures::try_join!(self.current(coords), self.forecast(coords, query.days))?;

        Ok(WeatherReport { current, forecast })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{ManualClock, MemoryStore};
    use crate::data::{Conditions, LocationMatch};
    use crate::error::ProviderError;
    use async_trait::async_trait;
    use chrono::{Duration, NaiveDate, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn params(lat: Option<&str>, lon: Option<&str>, cidade: Option<&str>, dias: Option<&str>) -> WeatherParams {
        WeatherParams {
            lat: lat.map(str::to_string),
            lon: lon.map(str::to_string),
            cidade: cidade.map(str::to_string),
            dias: dias.map(str::to_string),
        }
    }

    fn validation_message(result: Result<WeatherQuery, WeatherError>) -> String {
        match result {
            Err(WeatherError::Validation(message)) => message,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[derive(Debug, Default)]
    struct StubProvider {
        matches: Vec<LocationMatch>,
        fail_current: bool,
        current_calls: AtomicUsize,
        forecast_calls: AtomicUsize,
        search_calls: AtomicUsize,
    }

    impl StubProvider {
        fn total_calls(&self) -> usize {
            self.current_calls.load(Ordering::SeqCst)
                + self.forecast_calls.load(Ordering::SeqCst)
                + self.search_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl WeatherProvider for StubProvider {
        async fn current(&self, coords: Coordinates) -> Result<CurrentConditions, ProviderError> {
            self.current_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_current {
                return Err(ProviderError::Timeout);
            }
            Ok(CurrentConditions {
                city: coords.query(),
                region: "Espirito Santo".to_string(),
                country: "Brazil".to_string(),
                last_updated: "2025-05-12 13:00".to_string(),
                conditions: Conditions {
                    temperature: 25.0,
                    condition_text: "Sol".to_string(),
                    icon: String::new(),
                    humidity: 60,
                    wind_kph: 5.0,
                    wind_direction: "N".to_string(),
                    pressure_mb: 1012.0,
                    feels_like: 26.0,
                    uv: 6.0,
                },
            })
        }

        async fn forecast(&self, _: Coordinates, days: u8) -> Result<Vec<ForecastDay>, ProviderError> {
            self.forecast_calls.fetch_add(1, Ordering::SeqCst);
            let start = NaiveDate::from_ymd_opt(2025, 5, 12).unwrap();
            Ok((0..days)
                .map(|i| ForecastDay {
                    date: start + Duration::days(i64::from(i)),
                    condition: "Sol".to_string(),
                    icon: String::new(),
                    min_temp: 18.0,
                    max_temp: 29.0,
                    chance_of_rain: 10,
                    precipitation_mm: 0.0,
                    uv: 7.0,
                })
                .collect())
        }

        async fn search(&self, _: &str) -> Result<Vec<LocationMatch>, ProviderError> {
            self.search_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.matches.clone())
        }
    }

    fn service(provider: Arc<StubProvider>) -> (WeatherService, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = CacheManager::new(Arc::new(MemoryStore::new()), clock.clone());
        let resolver = LocationResolver::new(
            Some("Espírito Santo".to_string()),
            Some("Brazil".to_string()),
        );
        (
            WeatherService::new(provider, cache, resolver, CacheTtls::default()),
            clock,
        )
    }

    #[test]
    fn test_coordinates_query_with_default_days() {
        let query = WeatherQuery::from_params(&params(Some("-20.76"), Some("-41.53"), None, None)).unwrap();
        assert_eq!(
            query.location,
            LocationQuery::Coordinates(Coordinates::new(-20.76, -41.53))
        );
        assert_eq!(query.days, DEFAULT_DAYS);
    }

    #[test]
    fn test_coordinates_take_precedence_over_city() {
        let query =
            WeatherQuery::from_params(&params(Some("1.5"), Some("2.5"), Some("Vitoria"), Some("5"))).unwrap();
        assert_eq!(query.location, LocationQuery::Coordinates(Coordinates::new(1.5, 2.5)));
        assert_eq!(query.days, 5);
    }

    #[test]
    fn test_missing_longitude() {
        let message = validation_message(WeatherQuery::from_params(&params(Some("-20.76"), None, None, None)));
        assert_eq!(message, "Longitude é obrigatória.");
    }

    #[test]
    fn test_missing_latitude_even_with_city() {
        let message =
            validation_message(WeatherQuery::from_params(&params(None, Some("-41.53"), Some("Vitoria"), None)));
        assert_eq!(message, "Latitude é obrigatória.");
    }

    #[test]
    fn test_non_numeric_coordinates() {
        let message = validation_message(WeatherQuery::from_params(&params(Some("abc"), Some("1"), None, None)));
        assert_eq!(message, "Latitude deve ser um número.");

        let message = validation_message(WeatherQuery::from_params(&params(Some("1"), Some("NaN"), None, None)));
        assert_eq!(message, "Longitude deve ser um número.");
    }

    #[test]
    fn test_out_of_range_coordinates() {
        let message = validation_message(WeatherQuery::from_params(&params(Some("91"), Some("1"), None, None)));
        assert!(message.starts_with("Latitude deve estar entre"));

        let message = validation_message(WeatherQuery::from_params(&params(Some("1"), Some("-180.5"), None, None)));
        assert!(message.starts_with("Longitude deve estar entre"));
    }

    #[test]
    fn test_city_is_trimmed() {
        let query = WeatherQuery::from_params(&params(None, None, Some("  Vitoria "), None)).unwrap();
        assert_eq!(query.location, LocationQuery::City("Vitoria".to_string()));
    }

    #[test]
    fn test_blank_city_is_rejected() {
        let message = validation_message(WeatherQuery::from_params(&params(None, None, Some("   "), None)));
        assert_eq!(message, "O nome da cidade não pode ser vazio.");
    }

    #[test]
    fn test_no_location_at_all() {
        let message = validation_message(WeatherQuery::from_params(&WeatherParams::default()));
        assert!(message.contains("latitude e longitude"));
    }

    #[test]
    fn test_days_bounds() {
        for ok in ["1", "10", " 7 "] {
            assert!(WeatherQuery::from_params(&params(Some("1"), Some("1"), None, Some(ok))).is_ok());
        }
        for bad in ["0", "11", "2.5", "-1", "tres", "300"] {
            let message = validation_message(WeatherQuery::from_params(&params(Some("1"), Some("1"), None, Some(bad))));
            assert!(message.contains("dias"), "{bad}: {message}");
        }
    }

    #[tokio::test]
    async fn test_weather_returns_requested_days_in_order() {
        let provider = Arc::new(StubProvider::default());
        let (service, _clock) = service(provider.clone());
        let query = WeatherQuery::from_params(&params(Some("-20.76"), Some("-41.53"), None, Some("5"))).unwrap();

        let report = service.weather(&query).await.unwrap();

        assert_eq!(report.forecast.len(), 5);
        assert!(report.forecast.windows(2).all(|w| w[0].date < w[1].date));
        assert_eq!(report.current.city, "-20.76,-41.53");
    }

    #[tokio::test]
    async fn test_repeated_request_within_ttl_hits_provider_once() {
        let provider = Arc::new(StubProvider::default());
        let (service, clock) = service(provider.clone());
        let query = WeatherQuery::from_params(&params(Some("-20.76"), Some("-41.53"), None, None)).unwrap();

        let first = service.weather(&query).await.unwrap();
        clock.advance(Duration::minutes(5));
        let second = service.weather(&query).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(provider.current_calls.load(Ordering::SeqCst), 1);
        assert_eq!(provider.forecast_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_current_and_forecast_expire_independently() {
        let provider = Arc::new(StubProvider::default());
        let (service, clock) = service(provider.clone());
        let query = WeatherQuery::from_params(&params(Some("1"), Some("2"), None, None)).unwrap();

        service.weather(&query).await.unwrap();
        clock.advance(Duration::minutes(15));
        service.weather(&query).await.unwrap();

        assert_eq!(provider.current_calls.load(Ordering::SeqCst), 2);
        assert_eq!(provider.forecast_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_forecast_key_depends_on_days() {
        let provider = Arc::new(StubProvider::default());
        let (service, _clock) = service(provider.clone());
        let coords = Coordinates::new(1.0, 2.0);

        service.forecast(coords, 3).await.unwrap();
        service.forecast(coords, 5).await.unwrap();
        service.forecast(coords, 3).await.unwrap();

        assert_eq!(provider.forecast_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_city_is_resolved_before_fetching() {
        let provider = Arc::new(StubProvider {
            matches: vec![
                LocationMatch {
                    name: "Vitoria".to_string(),
                    region: "Basque Country".to_string(),
                    country: "Spain".to_string(),
                    latitude: 42.85,
                    longitude: -2.67,
                },
                LocationMatch {
                    name: "Vitoria".to_string(),
                    region: "Espirito Santo".to_string(),
                    country: "Brazil".to_string(),
                    latitude: -20.32,
                    longitude: -40.34,
                },
            ],
            ..Default::default()
        });
        let (service, _clock) = service(provider.clone());
        let query = WeatherQuery::from_params(&params(None, None, Some("Vitoria"), None)).unwrap();

        let report = service.weather(&query).await.unwrap();

        // "Espirito Santo" without the accent is a country match, not a region match
        assert_eq!(report.current.city, "-20.32,-40.34");
        assert_eq!(provider.search_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unknown_city_makes_no_weather_calls() {
        let provider = Arc::new(StubProvider::default());
        let (service, _clock) = service(provider.clone());
        let query = WeatherQuery::from_params(&params(None, None, Some("NoSuchPlace123"), None)).unwrap();

        let err = service.weather(&query).await.unwrap_err();

        assert!(matches!(err, WeatherError::NoLocationFound { .. }));
        assert_eq!(provider.total_calls(), 1);
    }

    #[tokio::test]
    async fn test_provider_failure_is_not_cached() {
        let provider = Arc::new(StubProvider {
            fail_current: true,
            ..Default::default()
        });
        let (service, _clock) = service(provider.clone());
        let coords = Coordinates::new(1.0, 2.0);

        let err = service.current(coords).await.unwrap_err();
        assert!(matches!(err, WeatherError::Provider(ProviderError::Timeout)));

        service.current(coords).await.unwrap_err();
        assert_eq!(provider.current_calls.load(Ordering::SeqCst), 2);
    }
}
