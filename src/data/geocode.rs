//! Alternate-location resolver
//!
//! When a location name cannot be resolved by the weather endpoints, this
//! client asks the geocoding endpoint for nearby candidate cities. Failures
//! here are always soft: every error path logs and returns an empty list,
//! so the caller can treat "no suggestions" and "lookup failed" the same
//! way.

use std::sync::Arc;

use reqwest::Client;

use crate::config::WeatherConfig;
use crate::data::GeoCandidate;

/// Maximum number of candidates requested and returned.
const MAX_CANDIDATES: usize = 3;

/// Client for the geocoding endpoint.
#[derive(Debug, Clone)]
pub struct GeocodeClient {
    http: Client,
    config: Arc<WeatherConfig>,
}

impl GeocodeClient {
    pub(crate) fn new(http: Client, config: Arc<WeatherConfig>) -> Self {
        Self { http, config }
    }

    /// Looks up nearby city candidates for a place name.
    ///
    /// Returns up to three candidates, or an empty list on any failure
    /// (network, non-2xx, unparseable body, empty result set).
    pub async fn find_nearby_cities(&self, name: &str) -> Vec<GeoCandidate> {
        let name = name.trim();
        if name.is_empty() {
            return Vec::new();
        }

        let url = format!("{}/direct", self.config.geo_base);
        let limit = MAX_CANDIDATES.to_string();
        let response = match self
            .http
            .get(&url)
            .query(&[
                ("q", name),
                ("limit", limit.as_str()),
                ("appid", self.config.api_key.as_str()),
            ])
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!("Geocoding request failed: {}", e);
                return Vec::new();
            }
        };

        if !response.status().is_success() {
            tracing::debug!("Geocoding returned status {}", response.status());
            return Vec::new();
        }

        match response.json::<Vec<GeoCandidate>>().await {
            Ok(mut candidates) => {
                candidates.truncate(MAX_CANDIDATES);
                if candidates.is_empty() {
                    tracing::debug!("Geocoding found no candidates for '{}'", name);
                }
                candidates
            }
            Err(e) => {
                tracing::debug!("Geocoding parse error: {}", e);
                Vec::new()
            }
        }
    }
}
