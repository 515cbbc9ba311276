//! Namespaced key-value store persisted as JSON files
//!
//! Each namespace is a `Store<T>`: an in-memory map from normalized location
//! key to `CacheEntry<T>`, loaded once when the store is opened and written
//! back wholesale after every insert. The in-memory copy is authoritative;
//! the file is a best-effort mirror so a later session can start warm.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use directories::ProjectDirs;
use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::data::{CurrentConditions, DailyForecast};

/// File name for the "current" namespace.
const CURRENT_FILE: &str = "current_weather.json";

/// File name for the "forecast" namespace.
const FORECAST_FILE: &str = "forecast.json";

/// A cached value plus the metadata needed for freshness checks.
///
/// Entries are replaced wholesale on re-fetch, never merged. `raw` holds the
/// original upstream payload where the fetcher keeps one (forecast only).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    /// When the data was fetched.
    pub cached_at: DateTime<Utc>,
    /// The cached data.
    pub data: T,
    /// Original upstream payload, if retained.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<serde_json::Value>,
}

impl<T> CacheEntry<T> {
    /// Creates an entry stamped with the current time.
    pub fn new(data: T) -> Self {
        Self {
            cached_at: Utc::now(),
            data,
            raw: None,
        }
    }

    /// Creates an entry that also retains the raw upstream payload.
    pub fn with_raw(data: T, raw: serde_json::Value) -> Self {
        Self {
            cached_at: Utc::now(),
            data,
            raw: Some(raw),
        }
    }

    /// Whether the entry is still inside its validity window.
    pub fn is_fresh(&self, ttl_minutes: i64) -> bool {
        Utc::now() - self.cached_at < Duration::minutes(ttl_minutes)
    }
}

/// One cache namespace: an in-memory map mirrored to a single JSON file.
#[derive(Debug)]
pub struct Store<T> {
    path: PathBuf,
    entries: Mutex<HashMap<String, CacheEntry<T>>>,
}

impl<T> Store<T>
where
    T: Clone + Serialize + DeserializeOwned,
{
    /// Opens the namespace backed by `path`, loading any persisted entries.
    ///
    /// An absent file starts the namespace empty; a malformed file is
    /// discarded with a warning. Neither is an error.
    pub fn open(path: PathBuf) -> Self {
        let entries = load_entries(&path);
        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    /// Returns a copy of the entry for `key`, fresh or stale.
    pub fn get(&self, key: &str) -> Option<CacheEntry<T>> {
        self.entries.lock().get(key).cloned()
    }

    /// Inserts `entry` under `key` and rewrites the namespace file.
    ///
    /// The write to disk is best-effort: on failure a warning is logged and
    /// the in-memory entry stays authoritative for the session.
    pub fn put(&self, key: &str, entry: CacheEntry<T>) {
        let mut entries = self.entries.lock();
        entries.insert(key.to_string(), entry);
        persist(&self.path, &entries);
    }

    /// Number of entries currently held.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the namespace holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

fn load_entries<T: DeserializeOwned>(path: &Path) -> HashMap<String, CacheEntry<T>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        // Absent file: fresh session.
        Err(_) => return HashMap::new(),
    };

    match serde_json::from_str(&content) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(
                "Discarding malformed cache file {}: {}",
                path.display(),
                e
            );
            HashMap::new()
        }
    }
}

fn persist<T: Serialize>(path: &Path, entries: &HashMap<String, CacheEntry<T>>) {
    let result = (|| -> std::io::Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string(entries)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        fs::write(path, json)
    })();

    if let Err(e) = result {
        tracing::warn!("Failed to persist cache to {}: {}", path.display(), e);
    }
}

/// The two weather cache namespaces, sharing one cache directory.
#[derive(Debug)]
pub struct WeatherCache {
    /// Current-conditions namespace.
    pub current: Store<CurrentConditions>,
    /// Aggregated-forecast namespace.
    pub forecast: Store<Vec<DailyForecast>>,
}

impl WeatherCache {
    /// Opens the cache in the XDG-compliant default directory
    /// (`~/.cache/tripcast/` on Linux).
    ///
    /// Returns `None` if the cache directory cannot be determined.
    pub fn open_default() -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", "tripcast")?;
        Some(Self::open(project_dirs.cache_dir()))
    }

    /// Opens the cache in a specific directory. Useful for testing or when
    /// a custom cache location is needed.
    pub fn open(dir: &Path) -> Self {
        Self {
            current: Store::open(dir.join(CURRENT_FILE)),
            forecast: Store::open(dir.join(FORECAST_FILE)),
        }
    }
}
