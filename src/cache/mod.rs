//! Session cache for weather data
//!
//! This module provides a two-namespace cache ("current" and "forecast")
//! whose in-memory maps are authoritative for the session and mirrored to
//! one JSON file per namespace on every write. It supports graceful
//! degradation: persistence failures are logged and ignored, and stale
//! entries are kept around so fetchers can fall back to them when APIs are
//! unavailable.

mod store;

pub use store::{CacheEntry, Store, WeatherCache};
