//! Core data models for tripcast
//!
//! This module contains the data types used throughout the crate for
//! representing locations, current conditions, daily forecast summaries and
//! combined weather reports, plus the error taxonomy shared by the fetchers.

pub mod current;
pub mod forecast;
pub mod geocode;

pub use current::CurrentWeatherClient;
pub use forecast::{aggregate_daily, ForecastClient, ForecastResponse};
pub use geocode::GeocodeClient;

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A place a caller wants weather for: either a free-form name or an exact
/// coordinate pair.
///
/// The two forms are never unified: "Paris" and the coordinates of Paris
/// produce independent cache entries. Normalization is textual only, never
/// geocoded into a canonical key.
#[derive(Debug, Clone, PartialEq)]
pub enum Location {
    /// A place name, e.g. "Paris" or "San Jose, CR".
    Named(String),
    /// A latitude/longitude pair in decimal degrees.
    Coordinates { lat: f64, lon: f64 },
}

impl Location {
    /// True for a name that is empty or whitespace-only: a caller-contract
    /// violation the fetchers reject up front.
    pub fn is_blank(&self) -> bool {
        matches!(self, Location::Named(name) if name.trim().is_empty())
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Named(name) => write!(f, "{}", name),
            Location::Coordinates { lat, lon } => write!(f, "{},{}", lat, lon),
        }
    }
}

/// Current weather conditions for one location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentConditions {
    /// Place name as reported by the API.
    pub place: String,
    /// Temperature in the configured units.
    pub temperature: f64,
    /// Feels-like temperature.
    pub feels_like: f64,
    /// Relative humidity percentage (0-100).
    pub humidity: u8,
    /// Condition description, e.g. "light rain".
    pub description: String,
    /// Condition icon code, e.g. "10d".
    pub icon: String,
    /// Wind speed as reported by the API (m/s for metric units).
    pub wind_speed: f64,
    /// Observation timestamp.
    pub observed_at: DateTime<Utc>,
}

/// One aggregated forecast day, derived from the raw 3-hour samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyForecast {
    /// UTC calendar day the samples were bucketed into.
    pub date: NaiveDate,
    /// Abbreviated weekday label, e.g. "Mon".
    pub weekday: String,
    /// Daily high: ceiling of the max sample temperature.
    pub high: i32,
    /// Daily low: rounded min sample temperature.
    pub low: i32,
    /// Max precipitation probability across the day, as a percentage.
    pub precipitation: u8,
    /// Icon code of the day's most frequent condition.
    pub icon: String,
    /// Description of the day's most frequent condition.
    pub description: String,
    /// Mean wind speed converted to km/h.
    pub wind_kmh: i32,
}

/// A nearby-city candidate from the geocoding endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoCandidate {
    /// City name.
    pub name: String,
    /// ISO country code.
    pub country: String,
    /// State or region, when the endpoint provides one.
    #[serde(default)]
    pub state: Option<String>,
    /// Latitude in decimal degrees.
    pub lat: f64,
    /// Longitude in decimal degrees.
    pub lon: f64,
}

/// Errors produced at the fetcher boundary.
///
/// HTTP and transport failures are classified here and never propagate as
/// raw errors past the fetchers.
#[derive(Debug, Error)]
pub enum WeatherError {
    /// The location could not be resolved by the API (HTTP 404).
    #[error("location '{0}' not found")]
    NotFound(String),

    /// The API rejected the configured key (HTTP 401).
    #[error("invalid API key")]
    Unauthorized,

    /// The API rate limit was exceeded (HTTP 429).
    #[error("rate limit exceeded")]
    RateLimited,

    /// Any other non-2xx response, carrying the upstream message.
    #[error("weather API error ({status}): {message}")]
    Upstream { status: u16, message: String },

    /// Transport-level failure (connect, timeout, TLS, ...).
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// The caller passed an empty location.
    #[error("no location given")]
    MissingLocation,

    /// The response body did not match the expected shape.
    #[error("malformed response: {0}")]
    MalformedPayload(String),
}

impl WeatherError {
    /// True when the error means the location itself is unresolvable, which
    /// makes the alternate-location fallback worth trying.
    pub fn is_not_found(&self) -> bool {
        matches!(self, WeatherError::NotFound(_))
    }
}

/// Classifies a non-2xx response into a `WeatherError`, consuming the body
/// for the upstream message where one exists.
pub(crate) async fn ensure_success(
    response: reqwest::Response,
    location: &Location,
) -> Result<reqwest::Response, WeatherError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status {
        reqwest::StatusCode::NOT_FOUND => Err(WeatherError::NotFound(location.to_string())),
        reqwest::StatusCode::UNAUTHORIZED => Err(WeatherError::Unauthorized),
        reqwest::StatusCode::TOO_MANY_REQUESTS => Err(WeatherError::RateLimited),
        _ => Err(WeatherError::Upstream {
            status: status.as_u16(),
            message: upstream_message(response).await,
        }),
    }
}

/// Pulls the human-readable message out of an error body. The API wraps its
/// errors as `{"cod": ..., "message": ...}`; anything else is passed through
/// as raw text.
async fn upstream_message(response: reqwest::Response) -> String {
    #[derive(Deserialize)]
    struct ApiMessage {
        message: String,
    }

    match response.text().await {
        Ok(text) => serde_json::from_str::<ApiMessage>(&text)
            .map(|body| body.message)
            .unwrap_or(text),
        Err(_) => String::from("unreadable upstream error body"),
    }
}

/// The two concurrently fetched halves of a weather report.
///
/// Either side may individually be an error; partial success is passed
/// through to the caller uninspected.
#[derive(Debug)]
pub struct WeatherBundle {
    /// Current conditions, or that fetcher's classified error.
    pub current: Result<CurrentConditions, WeatherError>,
    /// Daily forecast summaries, or that fetcher's classified error.
    pub forecast: Result<Vec<DailyForecast>, WeatherError>,
}

/// Combined result of a `weather_data` call.
#[derive(Debug)]
pub enum WeatherReport {
    /// At least one half of the report is usable (or failed independently).
    Data(WeatherBundle),
    /// Both fetches failed with "not found" and the geocoder suggested
    /// nearby candidates.
    NotFound {
        /// The location as originally requested.
        query: String,
        /// Up to three nearby-city suggestions.
        alternatives: Vec<GeoCandidate>,
    },
    /// Both fetches failed with no recoverable alternatives. Carries the
    /// current-weather error; the forecast-side error is discarded.
    Failed(WeatherError),
}
