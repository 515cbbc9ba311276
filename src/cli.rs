//! Command-line interface parsing for tripcast
//!
//! This module handles parsing of CLI arguments using clap, including the
//! location arguments (place names or "lat,lon" pairs) and the fetch-mode
//! flags.

use std::path::PathBuf;

use clap::Parser;
use thiserror::Error;

use crate::data::Location;

/// Error types for CLI argument parsing
#[derive(Debug, Error)]
pub enum CliError {
    /// A coordinate pair was given with out-of-range values
    #[error("Invalid coordinates: '{0}'. Latitude must be -90..90, longitude -180..180")]
    InvalidCoordinates(String),
}

/// tripcast - Weather reports for trip planning
#[derive(Parser, Debug)]
#[command(name = "tripcast")]
#[command(about = "Trip-planning weather: current conditions and 5-day forecasts")]
#[command(version)]
pub struct Cli {
    /// Locations to report on: place names or "lat,lon" pairs
    ///
    /// Examples:
    ///   tripcast Lisbon              # One city by name
    ///   tripcast Lisbon Porto        # Several cities
    ///   tripcast 48.85,2.35          # By coordinates
    #[arg(value_name = "LOCATION", required = true)]
    pub locations: Vec<String>,

    /// Only fetch current conditions, skip the 5-day forecast
    #[arg(long)]
    pub now: bool,

    /// Fail fast instead of retrying with backoff (applies with --now)
    #[arg(long)]
    pub no_retry: bool,

    /// Override the cache directory
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,
}

/// Configuration derived from CLI arguments for application startup
#[derive(Debug, Clone)]
pub struct StartupConfig {
    /// Locations to fetch, in argument order
    pub locations: Vec<Location>,
    /// Whether to fetch current conditions only
    pub current_only: bool,
    /// Whether fetches retry transient failures
    pub use_retry: bool,
    /// Cache directory override, if specified
    pub cache_dir: Option<PathBuf>,
}

/// Parses a location argument into a `Location`.
///
/// An argument of the form "lat,lon" where both halves parse as decimal
/// degrees becomes a coordinate pair (rejected when out of range); anything
/// else is a place name.
pub fn parse_location_arg(s: &str) -> Result<Location, CliError> {
    if let Some((lat_str, lon_str)) = s.split_once(',') {
        if let (Ok(lat), Ok(lon)) = (lat_str.trim().parse::<f64>(), lon_str.trim().parse::<f64>()) {
            if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
                return Err(CliError::InvalidCoordinates(s.to_string()));
            }
            return Ok(Location::Coordinates { lat, lon });
        }
    }
    Ok(Location::Named(s.to_string()))
}

impl StartupConfig {
    /// Creates a StartupConfig from parsed CLI arguments.
    ///
    /// # Returns
    /// * `Ok(StartupConfig)` with validated settings
    /// * `Err(CliError)` if a coordinate pair is out of range
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let locations = cli
            .locations
            .iter()
            .map(|s| parse_location_arg(s))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(StartupConfig {
            locations,
            current_only: cli.now,
            use_retry: !cli.no_retry,
            cache_dir: cli.cache_dir.clone(),
        })
    }
}
