//! On-disk JSON store for weather records
//!
//! Persists serializable records to an XDG-compliant cache directory
//! (`~/.cache/skywatch/` on Linux), one JSON file per key, overwritten
//! wholesale on every write. Records carry a `cached_at` timestamp and an
//! optional expiry; expired records are still returned (flagged stale) so
//! the UI can show last-known data when the network is unavailable.

use chrono::{DateTime, Duration, Utc};
use directories::ProjectDirs;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Wrapper for a record stored on disk
#[derive(Debug, Serialize, Deserialize)]
struct DiskEntry<T> {
    /// The stored data
    data: T,
    /// When the record was written
    cached_at: DateTime<Utc>,
    /// When the record goes stale; `None` means it never does
    expires_at: Option<DateTime<Utc>>,
}

/// Result of reading a record, with freshness metadata
#[derive(Debug)]
pub struct StoredRecord<T> {
    /// The stored data
    pub data: T,
    /// When the record was written
    pub cached_at: DateTime<Utc>,
    /// Whether the record has passed its expiry
    pub is_stale: bool,
}

/// Reads and writes JSON records under a cache directory
#[derive(Debug, Clone)]
pub struct DiskStore {
    dir: PathBuf,
}

impl DiskStore {
    /// Creates a store under the XDG cache path for skywatch
    ///
    /// Returns `None` if the cache directory cannot be determined (e.g. no
    /// home directory).
    pub fn new() -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", "skywatch")?;
        Some(Self {
            dir: project_dirs.cache_dir().to_path_buf(),
        })
    }

    /// Creates a store rooted at a custom directory (used in tests)
    pub fn with_dir(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    /// Writes a record, replacing any previous one for the same key
    ///
    /// # Arguments
    /// * `key` - Record key (e.g. a city slug)
    /// * `data` - The data to store
    /// * `ttl_hours` - Freshness horizon; `None` means the record never
    ///   goes stale (used for the saved-city list)
    pub fn write<T: Serialize>(
        &self,
        key: &str,
        data: &T,
        ttl_hours: Option<u64>,
    ) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir)?;

        let now = Utc::now();
        let entry = DiskEntry {
            data,
            cached_at: now,
            expires_at: ttl_hours.map(|h| now + Duration::hours(h as i64)),
        };

        let json = serde_json::to_string_pretty(&entry)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        fs::write(self.path_for(key), json)
    }

    /// Reads a record by key
    ///
    /// Returns `None` if no record exists or it cannot be parsed. A record
    /// past its expiry is still returned with `is_stale = true`.
    pub fn read<T: DeserializeOwned>(&self, key: &str) -> Option<StoredRecord<T>> {
        let content = fs::read_to_string(self.path_for(key)).ok()?;
        let entry: DiskEntry<T> = serde_json::from_str(&content).ok()?;

        let is_stale = entry
            .expires_at
            .map(|at| Utc::now() > at)
            .unwrap_or(false);

        Some(StoredRecord {
            data: entry.data,
            cached_at: entry.cached_at,
            is_stale,
        })
    }

    /// Deletes the record for a key, if present
    pub fn remove(&self, key: &str) -> std::io::Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}
