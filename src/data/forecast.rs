//! Forecast API client and daily aggregation
//!
//! Fetches the multi-day forecast (3-hour samples) for a location and
//! condenses it into at most five daily summaries. The fetch path mirrors
//! the current-conditions client: fresh cache short-circuit, classified
//! errors, stale fallback. The cache entry keeps both the aggregated
//! summaries and the raw upstream payload.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::cache::{CacheEntry, WeatherCache};
use crate::config::WeatherConfig;
use crate::data::{ensure_success, DailyForecast, Location, WeatherError};
use crate::retry::RetryPolicy;

/// Number of distinct days a forecast is capped to.
const FORECAST_DAYS: usize = 5;

/// Conversion factor from m/s to km/h.
const MS_TO_KMH: f64 = 3.6;

/// Client for the forecast endpoint.
#[derive(Debug, Clone)]
pub struct ForecastClient {
    http: Client,
    config: Arc<WeatherConfig>,
    cache: Arc<WeatherCache>,
    retry: RetryPolicy,
}

impl ForecastClient {
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
    /// Names are trimmed and lower-cased; coordinates become the literal
    /// `"lat,lon"` string. This rendering is intentionally different from
    /// the current-weather path's coordinate key.
    pub(crate) fn cache_key(location: &Location) -> String {
        match location {
            Location::Named(name) => name.trim().to_lowercase(),
            Location::Coordinates { lat, lon } => format!("{},{}", lat, lon),
        }
    }

    /// Fetches the aggregated daily forecast for `location`.
    ///
    /// Same contract as [`CurrentWeatherClient::fetch`]: fresh cache hits
    /// skip the network, terminal failures fall back to a stale entry when
    /// one exists.
    ///
    /// [`CurrentWeatherClient::fetch`]: crate::data::current::CurrentWeatherClient::fetch
    pub async fn fetch(
        &self,
        location: &Location,
        use_retry: bool,
    ) -> Result<Vec<DailyForecast>, WeatherError> {
        if location.is_blank() {
            tracing::warn!("Forecast requested with an empty location");
            return Err(WeatherError::MissingLocation);
        }

        let key = Self::cache_key(location);

        if let Some(entry) = self.cache.forecast.get(&key) {
            if entry.is_fresh(self.config.cache_ttl_minutes) {
                tracing::debug!(key = %key, "Serving forecast from cache");
                return Ok(entry.data);
            }
        }

        let result = if use_retry {
            self.retry.run(|| self.request(location)).await
        } else {
            self.request(location).await
        };

        match result {
            Ok((response, raw)) => {
                let days = aggregate_daily(&response);
                self.cache
                    .forecast
                    .put(&key, CacheEntry::with_raw(days.clone(), raw));
                Ok(days)
            }
            Err(e) => {
                if let Some(entry) = self.cache.forecast.get(&key) {
                    tracing::warn!(
                        key = %key,
                        "Forecast fetch failed ({}), serving stale cache",
                        e
                    );
                    return Ok(entry.data);
                }
                Err(e)
            }
        }
    }

    /// One request/classify/parse round against the endpoint. Returns the
    /// typed response together with the raw body for cache retention.
    async fn request(
        &self,
        location: &Location,
    ) -> Result<(ForecastResponse, serde_json::Value), WeatherError> {
        let url = format!("{}/forecast", self.config.api_base);
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

        let raw: serde_json::Value = response
            .json()
            .await
            .map_err(|e| WeatherError::MalformedPayload(e.to_string()))?;
        let parsed: ForecastResponse = serde_json::from_value(raw.clone())
            .map_err(|e| WeatherError::MalformedPayload(e.to_string()))?;

        Ok((parsed, raw))
    }
}

/// Forecast API response structure: an ordered list of 3-hour samples.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastResponse {
    /// Raw samples in upstream order.
    #[serde(default)]
    pub list: Vec<ForecastSample>,
}

/// One fine-grained forecast sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastSample {
    /// Sample timestamp, unix seconds.
    pub dt: i64,
    pub main: TempReading,
    /// Precipitation probability, 0.0 to 1.0.
    #[serde(default)]
    pub pop: f64,
    #[serde(default)]
    pub weather: Vec<ConditionTag>,
    pub wind: WindReading,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TempReading {
    /// Temperature in the configured units.
    pub temp: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionTag {
    pub icon: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindReading {
    /// Wind speed in m/s.
    pub speed: f64,
}

/// Buckets raw samples into daily summaries.
///
/// Days are emitted in the order they are first encountered in the sample
/// sequence (not re-sorted chronologically) and capped to the first five
/// distinct days. A payload with no samples produces an empty Vec.
pub fn aggregate_daily(response: &ForecastResponse) -> Vec<DailyForecast> {
    if response.list.is_empty() {
        tracing::warn!("Forecast payload has no samples");
        return Vec::new();
    }

    let mut order: Vec<NaiveDate> = Vec::new();
    let mut buckets: HashMap<NaiveDate, DayAccumulator> = HashMap::new();

    for sample in &response.list {
        let Some(timestamp) = DateTime::from_timestamp(sample.dt, 0) else {
            tracing::warn!(dt = sample.dt, "Skipping sample with invalid timestamp");
            continue;
        };
        let date = timestamp.date_naive();

        buckets
            .entry(date)
            .or_insert_with(|| {
                order.push(date);
                DayAccumulator::new()
            })
            .add(sample);
    }

    order
        .into_iter()
        .take(FORECAST_DAYS)
        .filter_map(|date| buckets.get(&date).and_then(|accum| accum.summarize(date)))
        .collect()
}

/// Running aggregate for one calendar day's samples.
struct DayAccumulator {
    max_temp: f64,
    min_temp: f64,
    max_pop: f64,
    wind_sum: f64,
    samples: usize,
    /// (icon, description, count), kept in first-seen order so ties resolve
    /// to the earliest condition.
    conditions: Vec<(String, String, usize)>,
}

impl DayAccumulator {
    fn new() -> Self {
        Self {
            max_temp: f64::NEG_INFINITY,
            min_temp: f64::INFINITY,
            max_pop: 0.0,
            wind_sum: 0.0,
            samples: 0,
            conditions: Vec::new(),
        }
    }

    fn add(&mut self, sample: &ForecastSample) {
        self.max_temp = self.max_temp.max(sample.main.temp);
        self.min_temp = self.min_temp.min(sample.main.temp);
        self.max_pop = self.max_pop.max(sample.pop);
        self.wind_sum += sample.wind.speed;
        self.samples += 1;

        if let Some(tag) = sample.weather.first() {
            match self
                .conditions
                .iter_mut()
                .find(|(icon, description, _)| *icon == tag.icon && *description == tag.description)
            {
                Some(entry) => entry.2 += 1,
                None => self
                    .conditions
                    .push((tag.icon.clone(), tag.description.clone(), 1)),
            }
        }
    }

    fn summarize(&self, date: NaiveDate) -> Option<DailyForecast> {
        if self.samples == 0 {
            return None;
        }

        // Strictly-greater comparison keeps the first-seen condition on ties.
        let mut best: Option<&(String, String, usize)> = None;
        for condition in &self.conditions {
            if best.map_or(true, |b| condition.2 > b.2) {
                best = Some(condition);
            }
        }
        let (icon, description) = best
            .map(|(icon, description, _)| (icon.clone(), description.clone()))
            .unwrap_or_default();

        Some(DailyForecast {
            date,
            weekday: date.format("%a").to_string(),
            high: self.max_temp.ceil() as i32,
            low: self.min_temp.round() as i32,
            precipitation: (self.max_pop * 100.0).round().clamp(0.0, 100.0) as u8,
            icon,
            description,
            wind_kmh: ((self.wind_sum / self.samples as f64) * MS_TO_KMH).round() as i32,
        })
    }
}
