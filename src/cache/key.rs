//! Deterministic cache keys
//!
//! A key is the operation name followed by its parameters exactly as given.
//! Coordinates are not rounded, so `-20.76` and `-20.760001` are different keys.

use std::fmt;

use crate::data::Coordinates;

/// Key identifying one cached upstream lookup
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Builds a key from an operation name and its ordered parameters
    pub fn new<I, P>(operation: &str, params: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: fmt::Display,
    {
        let mut key = operation.to_string();
        for param in params {
            key.push('_');
            key.push_str(&param.to_string());
        }
        Self(key)
    }

    /// Key for a current-conditions lookup
    pub fn current(coords: Coordinates) -> Self {
        Self::new("weatherapi_current", [coords.query()])
    }

    /// Key for an N-day forecast lookup
    pub fn forecast(coords: Coordinates, days: u8) -> Self {
        Self::new("weatherapi_forecast", [coords.query(), days.to_string()])
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File-name-safe rendering of the key
    ///
    /// ASCII alphanumerics and `-` pass through; every other byte becomes
    /// `~xx` (lowercase hex), so distinct keys never share a file.
    pub fn file_stem(&self) -> String {
        let mut stem = String::with_capacity(self.0.len());
        for byte in self.0.bytes() {
            if byte.is_ascii_alphanumeric() || byte == b'-' {
                stem.push(byte as char);
            } else {
                stem.push_str(&format!("~{:02x}", byte));
            }
        }
        stem
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CacheKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_key_uses_exact_coordinates() {
        let key = CacheKey::current(Coordinates::new(-20.76, -41.53));
        assert_eq!(key.as_str(), "weatherapi_current_-20.76,-41.53");
    }

    #[test]
    fn test_forecast_key_includes_days() {
        let key = CacheKey::forecast(Coordinates::new(-20.76, -41.53), 5);
        assert_eq!(key.as_str(), "weatherapi_forecast_-20.76,-41.53_5");
    }

    #[test]
    fn test_identical_requests_produce_identical_keys() {
        let a = CacheKey::forecast(Coordinates::new(1.5, 2.0), 3);
        let b = CacheKey::forecast(Coordinates::new(1.5, 2.0), 3);
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_requests_do_not_collide() {
        let coords = Coordinates::new(-20.76, -41.53);
        let keys = [
            CacheKey::current(coords),
            CacheKey::forecast(coords, 3),
            CacheKey::forecast(coords, 4),
            CacheKey::current(Coordinates::new(-20.76, -41.531)),
            CacheKey::current(Coordinates::new(-41.53, -20.76)),
        ];

        for (i, a) in keys.iter().enumerate() {
            for (j, b) in keys.iter().enumerate() {
                if i != j {
                    assert_ne!(a, b, "{} collides with {}", a, b);
                }
            }
        }
    }

    #[test]
    fn test_file_stem_escapes_separators() {
        let key = CacheKey::current(Coordinates::new(-20.76, -41.53));
        assert_eq!(key.file_stem(), "weatherapi~5fcurrent~5f-20~2e76~2c-41~2e53");
    }

    #[test]
    fn test_file_stem_is_injective_for_punctuation() {
        let a = CacheKey::from("op_1.5,2");
        let b = CacheKey::from("op_1,5.2");
        let c = CacheKey::from("op_1_5_2");
        assert_ne!(a.file_stem(), b.file_stem());
        assert_ne!(a.file_stem(), c.file_stem());
        assert_ne!(b.file_stem(), c.file_stem());
    }
}
