//! Current-conditions API client
//!
//! Fetches current weather for a location with a cache-first strategy:
//! fresh cache entries short-circuit the network entirely, successful
//! fetches replace the cached entry, and terminal failures fall back to
//! whatever (possibly stale) entry is still around.

use std::sync::Arc;

use chrono::DateTime;
use reqwest::Client;
use serde::Deserialize;

use crate::cache::{CacheEntry, WeatherCache};
use crate::config::WeatherConfig;
use crate::data::{ensure_success, CurrentConditions, Location, WeatherError};
use crate::retry::RetryPolicy;

/// Client for the current-conditions endpoint.
#[derive(Debug, Clone)]
pub struct CurrentWeatherClient {
    http: Client,
    config: Arc<WeatherConfig>,
    cache: Arc<WeatherCache>,
    retry: RetryPolicy,
}

impl CurrentWeatherClient {
    pub(crate) fn new(
        http: Client,
        config: Arc<WeatherConfig>,
        cache: Arc<WeatherCache>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            http,
            config,
            cache,
            retry,
        }
    }

    /// Cache key for this fetch path.
    ///
    /// Names are trimmed and lower-cased; coordinates get a structural
    /// rendering. The forecast path keys coordinates differently, so the two
    /// namespaces never share keys for the same coordinates, and that
    /// divergence is kept.
    pub(crate) fn cache_key(location: &Location) -> String {
        match location {
            Location::Named(name) => name.trim().to_lowercase(),
            Location::Coordinates { lat, lon } => format!("lat:{},lon:{}", lat, lon),
        }
    }

    /// Fetches current conditions for `location`.
    ///
    /// Returns the cached value without a network call while the entry is
    /// inside the validity window. On terminal failure a stale cached entry
    /// is served as a degraded success; the classified error is returned
    /// only when there is nothing cached at all.
    pub async fn fetch(
        &self,
        location: &Location,
        use_retry: bool,
    ) -> Result<CurrentConditions, WeatherError> {
        if location.is_blank() {
            tracing::warn!("Current weather requested with an empty location");
            return Err(WeatherError::MissingLocation);
        }

        let key = Self::cache_key(location);

        if let Some(entry) = self.cache.current.get(&key) {
            if entry.is_fresh(self.config.cache_ttl_minutes) {
                tracing::debug!(key = %key, "Serving current weather from cache");
                return Ok(entry.data);
            }
        }

        let result = if use_retry {
            self.retry.run(|| self.request(location)).await
        } else {
            self.request(location).await
        };

        match result {
            Ok(conditions) => {
                self.cache.current.put(&key, CacheEntry::new(conditions.clone()));
                Ok(conditions)
            }
            Err(e) => {
                if let Some(entry) = self.cache.current.get(&key) {
                    tracing::warn!(
                        key = %key,
                        "Current weather fetch failed ({}), serving stale cache",
                        e
                    );
                    return Ok(entry.data);
                }
                Err(e)
            }
        }
    }

    /// One request/classify/parse round against the endpoint.
    async fn request(&self, location: &Location) -> Result<CurrentConditions, WeatherError> {
        let url = format!("{}/weather", self.config.api_base);
        let mut request = self.http.get(&url).query(&[
            ("appid", self.config.api_key.as_str()),
            ("units", self.config.units.as_str()),
        ]);

        request = match location {
            Location::Named(name) => request.query(&[("q", name.trim())]),
            Location::Coordinates { lat, lon } => {
                request.query(&[("lat", lat.to_string()), ("lon", lon.to_string())])
            }
        };

        let response = request.send().await?;
        let response = ensure_success(response, location).await?;

        let body: CurrentResponse = response
            .json()
            .await
            .map_err(|e| WeatherError::MalformedPayload(e.to_string()))?;

        body.into_conditions()
    }
}

/// Current-conditions API response structure.
#[derive(Debug, Deserialize)]
struct CurrentResponse {
    #[serde(default)]
    name: String,
    dt: i64,
    main: MainReadings,
    weather: Vec<ConditionTag>,
    wind: WindReadings,
}

#[derive(Debug, Deserialize)]
struct MainReadings {
    temp: f64,
    feels_like: f64,
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct ConditionTag {
    icon: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct WindReadings {
    speed: f64,
}

impl CurrentResponse {
    fn into_conditions(self) -> Result<CurrentConditions, WeatherError> {
        let condition = self
            .weather
            .into_iter()
            .next()
            .ok_or_else(|| WeatherError::MalformedPayload("empty weather array".to_string()))?;

        let observed_at = DateTime::from_timestamp(self.dt, 0)
            .ok_or_else(|| WeatherError::MalformedPayload(format!("invalid timestamp {}", self.dt)))?;

        Ok(CurrentConditions {
            place: self.name,
            temperature: self.main.temp,
            feels_like: self.main.feels_like,
            humidity: self.main.humidity.round() as u8,
            description: condition.description,
            icon: condition.icon,
            wind_speed: self.wind.speed,
            observed_at,
        })
    }
}
