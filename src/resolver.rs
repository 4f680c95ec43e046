//! Free-text location resolution
//!
//! City names are ambiguous ("Vitória" exists in Brazil and Spain), so search
//! results are ranked with a fixed priority: first match in the preferred
//! region, else first match in the preferred country, else the provider's first
//! result.

use crate::data::{LocationMatch, WeatherProvider};
use crate::error::WeatherError;

/// Picks one location out of a city search
#[derive(Debug, Clone, Default)]
pub struct LocationResolver {
    preferred_region: Option<String>,
    preferred_country: Option<String>,
}

impl LocationResolver {
    /// Creates a resolver; empty preferences are treated as unset
    pub fn new(preferred_region: Option<String>, preferred_country: Option<String>) -> Self {
        Self {
            preferred_region: normalize_preference(preferred_region),
            preferred_country: normalize_preference(preferred_country),
        }
    }

    pub fn preferred_region(&self) -> Option<&str> {
        self.preferred_region.as_deref()
    }

    pub fn preferred_country(&self) -> Option<&str> {
        self.preferred_country.as_deref()
    }

    /// Searches for `query` and returns the best candidate
    pub async fn resolve(
        &self,
        provider: &dyn WeatherProvider,
        query: &str,
    ) -> Result<LocationMatch, WeatherError> {
        let matches = provider.search(query).await?;

        let chosen = self
            .pick(&matches)
            .cloned()
            .ok_or_else(|| WeatherError::NoLocationFound {
                query: query.to_string(),
            })?;

        tracing::debug!(
            query,
            candidates = matches.len(),
            name = %chosen.name,
            region = %chosen.region,
            country = %chosen.country,
            "resolved location"
        );
        Ok(chosen)
    }

    /// Applies the region > country > first priority to `matches`
    pub fn pick<'a>(&self, matches: &'a [LocationMatch]) -> Option<&'a LocationMatch> {
        if let Some(region) = &self.preferred_region {
            if let Some(m) = matches.iter().find(|m| contains_ignore_case(&m.region, region)) {
                return Some(m);
            }
        }

        if let Some(country) = &self.preferred_country {
            if let Some(m) = matches.iter().find(|m| contains_ignore_case(&m.country, country)) {
                return Some(m);
            }
        }

        matches.first()
    }
}

fn normalize_preference(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Case-insensitive substring test
fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
