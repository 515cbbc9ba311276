//! Combined weather service
//!
//! `WeatherService` wires the cache, retry policy and per-endpoint clients
//! together and exposes the combined fetch: current conditions and forecast
//! run concurrently, a double "not found" consults the geocoder for
//! alternatives, and partial failure is passed through for the caller to
//! render.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;

use crate::cache::WeatherCache;
use crate::config::WeatherConfig;
use crate::data::{
    CurrentConditions, CurrentWeatherClient, DailyForecast, ForecastClient, GeoCandidate,
    GeocodeClient, Location, WeatherBundle, WeatherError, WeatherReport,
};
use crate::retry::RetryPolicy;

/// Base URL for condition icons.
const ICON_URL_BASE: &str = "https://openweathermap.org/img/wn";

/// Per-request timeout for the underlying HTTP client.
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Builds the image URL for a condition icon code. Pure string templating,
/// no I/O.
pub fn weather_icon_url(icon: &str) -> String {
    format!("{}/{}@2x.png", ICON_URL_BASE, icon)
}

/// The combined weather service.
#[derive(Debug)]
pub struct WeatherService {
    config: Arc<WeatherConfig>,
    current: CurrentWeatherClient,
    forecast: ForecastClient,
    geocode: GeocodeClient,
}

impl WeatherService {
    /// Creates a service with the default retry policy.
    pub fn new(config: WeatherConfig, cache: WeatherCache) -> Result<Self, WeatherError> {
        Self::with_retry_policy(config, cache, RetryPolicy::default())
    }

    /// Creates a service with a custom retry policy. Useful for testing
    /// with short backoff delays.
    pub fn with_retry_policy(
        config: WeatherConfig,
        cache: WeatherCache,
        retry: RetryPolicy,
    ) -> Result<Self, WeatherError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        let config = Arc::new(config);
        let cache = Arc::new(cache);

        Ok(Self {
            current: CurrentWeatherClient::new(
                http.clone(),
                Arc::clone(&config),
                Arc::clone(&cache),
                retry,
            ),
            forecast: ForecastClient::new(
                http.clone(),
                Arc::clone(&config),
                Arc::clone(&cache),
                retry,
            ),
            geocode: GeocodeClient::new(http, Arc::clone(&config)),
            config,
        })
    }

    /// The service configuration.
    pub fn config(&self) -> &WeatherConfig {
        &self.config
    }

    /// Sanity check on the configured API key.
    pub fn api_key_valid(&self) -> bool {
        self.config.api_key_valid()
    }

    /// Fetches current conditions for one location. See
    /// [`CurrentWeatherClient::fetch`] for the cache and fallback contract.
    pub async fn current_weather(
        &self,
        location: &Location,
        use_retry: bool,
    ) -> Result<CurrentConditions, WeatherError> {
        self.current.fetch(location, use_retry).await
    }

    /// Fetches the aggregated daily forecast for one location.
    pub async fn forecast(
        &self,
        location: &Location,
        use_retry: bool,
    ) -> Result<Vec<DailyForecast>, WeatherError> {
        self.forecast.fetch(location, use_retry).await
    }

    /// Looks up nearby city candidates for a place name. Always soft:
    /// failures collapse to an empty list.
    pub async fn find_nearby_cities(&self, name: &str) -> Vec<GeoCandidate> {
        self.geocode.find_nearby_cities(name).await
    }

    /// Fetches the combined weather report for a location.
    ///
    /// The current-conditions and forecast fetches are both in flight
    /// before either is awaited, and one side failing never cancels the
    /// other. Only when both fail does the report collapse: a "not found"
    /// on the current side triggers the nearby-city lookup, otherwise the
    /// current-weather error is reported (the forecast-side error is
    /// discarded in that branch).
    pub async fn weather_data(&self, location: &Location) -> WeatherReport {
        let (current, forecast) = futures::join!(
            self.current.fetch(location, true),
            self.forecast.fetch(location, true),
        );

        match (current, forecast) {
            (Err(current_err), Err(_forecast_err)) => {
                if current_err.is_not_found() {
                    let query = location.to_string();
                    let alternatives = self.geocode.find_nearby_cities(&query).await;
                    if !alternatives.is_empty() {
                        return WeatherReport::NotFound {
                            query,
                            alternatives,
                        };
                    }
                }
                WeatherReport::Failed(current_err)
            }
            (current, forecast) => WeatherReport::Data(WeatherBundle { current, forecast }),
        }
    }
}
