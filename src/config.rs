//! Service configuration
//!
//! Holds the API credentials, endpoint base URLs and cache tuning used by
//! the weather service. Base URLs are plain fields so tests can point the
//! service at a local mock server.

use serde::{Deserialize, Serialize};

/// Default base URL for current conditions and forecast endpoints.
const DEFAULT_API_BASE: &str = "https://api.openweathermap.org/data/2.5";

/// Default base URL for the geocoding endpoint.
const DEFAULT_GEO_BASE: &str = "https://api.openweathermap.org/geo/1.0";

/// Minimum plausible API key length for the sanity check.
const MIN_API_KEY_LEN: usize = 16;

/// Weather service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// API key for the weather and geocoding endpoints.
    #[serde(default)]
    pub api_key: String,

    /// Base URL for the weather endpoints (no trailing slash).
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Base URL for the geocoding endpoint (no trailing slash).
    #[serde(default = "default_geo_base")]
    pub geo_base: String,

    /// Unit system passed to the API ("metric" or "imperial").
    #[serde(default = "default_units")]
    pub units: String,

    /// How long a cache entry counts as fresh, in minutes.
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_minutes: i64,
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_geo_base() -> String {
    DEFAULT_GEO_BASE.to_string()
}

fn default_units() -> String {
    "metric".to_string()
}

fn default_cache_ttl() -> i64 {
    30
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: default_api_base(),
            geo_base: default_geo_base(),
            units: default_units(),
            cache_ttl_minutes: default_cache_ttl(),
        }
    }
}

impl WeatherConfig {
    /// Builds a config with the API key taken from the environment.
    ///
    /// Checks `TRIPCAST_API_KEY` first, then `OPENWEATHER_API_KEY`.
    pub fn from_env() -> Self {
        let api_key = std::env::var("TRIPCAST_API_KEY")
            .or_else(|_| std::env::var("OPENWEATHER_API_KEY"))
            .unwrap_or_default();

        Self {
            api_key,
            ..Self::default()
        }
    }

    /// Sanity check on the configured API key: present and long enough to
    /// plausibly be real. Not a cryptographic validation.
    pub fn api_key_valid(&self) -> bool {
        let key = self.api_key.trim();
        !key.is_empty() && key.len() >= MIN_API_KEY_LEN
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = WeatherConfig::default();
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert_eq!(config.geo_base, DEFAULT_GEO_BASE);
        assert_eq!(config.units, "metric");
        assert_eq!(config.cache_ttl_minutes, 30);
        assert!(config.api_key.is_empty());
    }

    #[test]
    fn test_api_key_valid_rejects_empty() {
        let config = WeatherConfig::default();
        assert!(!config.api_key_valid());
    }

    #[test]
    fn test_api_key_valid_rejects_short_key() {
        let config = WeatherConfig {
            api_key: "abc123".to_string(),
            ..Default::default()
        };
        assert!(!config.api_key_valid());
    }

    #[test]
    fn test_api_key_valid_accepts_plausible_key() {
        let config = WeatherConfig {
            api_key: "0123456789abcdef0123456789abcdef".to_string(),
            ..Default::default()
        };
        assert!(config.api_key_valid());
    }

    #[test]
    fn test_api_key_valid_ignores_whitespace() {
        let config = WeatherConfig {
            api_key: "                ".to_string(),
            ..Default::default()
        };
        assert!(!config.api_key_valid());
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: WeatherConfig =
            serde_json::from_str(r#"{"api_key": "k"}"#).expect("should parse");
        assert_eq!(config.api_key, "k");
        assert_eq!(config.units, "metric");
        assert_eq!(config.cache_ttl_minutes, 30);
    }
}
