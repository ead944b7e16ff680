//! Cache manager for persisting report trees to disk
//!
//! Provides a `CacheManager` that stores serializable data to JSON files with
//! expiry timestamps. Keys are hashed into file names, so any string (dates with
//! slashes, JSON fragments) is a valid key.

use chrono::{DateTime, Duration, Utc};
use directories::ProjectDirs;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::Builder;

/// Default time-to-live for cached reports: 4 hours
pub const DEFAULT_CACHE_TTL_SECS: u64 = 14_400;

/// Wrapper struct for cached data stored on disk
#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry<T> {
    /// The unhashed key, kept for inspection
    key: String,
    /// The cached data
    data: T,
    /// When the data was cached
    cached_at: DateTime<Utc>,
    /// When the cache entry expires
    expires_at: DateTime<Utc>,
}

/// Result of reading from cache, including metadata about cache freshness
#[derive(Debug)]
pub struct CachedData<T> {
    /// The cached data
    pub data: T,
    /// When the data was originally cached
    pub cached_at: DateTime<Utc>,
    /// Whether the cache entry has expired
    pub is_expired: bool,
}

/// Manages reading and writing cached data to disk
///
/// Entries live as JSON files under `~/.cache/shareasale/` on Linux (or a
/// configured directory). Every entry written by one manager shares the same
/// TTL. Expired entries stay on disk until overwritten or cleared.
#[derive(Debug, Clone)]
pub struct CacheManager {
    /// Directory where cache files are stored
    cache_dir: PathBuf,
    /// Lifetime of a freshly written entry, in seconds
    ttl_secs: u64,
}

impl CacheManager {
    /// Creates a new CacheManager with a custom cache directory
    pub fn with_dir(cache_dir: PathBuf, ttl_secs: u64) -> Self {
        Self { cache_dir, ttl_secs }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    /// Returns the path to a cache file for the given key
    fn cache_path(&self, key: &str) -> PathBuf {
        let digest = hex::encode(Sha256::digest(key.as_bytes()));
        self.cache_dir.join(format!("{}.json", digest))
    }

    /// Ensures the cache directory exists
    fn ensure_dir(&self) -> io::Result<()> {
        fs::create_dir_all(&self.cache_dir)
    }

    /// Writes data to the cache under `key`, replacing any previous entry
    ///
    /// The entry expires `ttl_secs` after this call. Each writer fills its own
    /// temporary file and renames it into place, so concurrent readers see
    /// either the old entry or the new one.
    pub fn save<T: Serialize>(&self, key: &str, data: &T) -> io::Result<()> {
        self.ensure_dir()?;

        let now = Utc::now();
        let expires_at = i64::try_from(self.ttl_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let entry = CacheEntry {
            key: key.to_string(),
            data,
            cached_at: now,
            expires_at,
        };

        let json = serde_json::to_string_pretty(&entry)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let mut temp_file = Builder::new()
            .prefix(".entry-")
            .suffix(".tmp")
            .tempfile_in(&self.cache_dir)?;
        temp_file.write_all(json.as_bytes())?;
        temp_file.persist(self.cache_path(key))?;
        Ok(())
    }

    /// Reads data from the cache regardless of freshness
    ///
    /// Returns `None` if the entry doesn't exist or cannot be parsed.
    pub fn read<T: DeserializeOwned>(&self, key: &str) -> Option<CachedData<T>> {
        let content = fs::read_to_string(self.cache_path(key)).ok()?;
        let entry: CacheEntry<T> = serde_json::from_str(&content).ok()?;

        Some(CachedData {
            data: entry.data,
            cached_at: entry.cached_at,
            is_expired: Utc::now() > entry.expires_at,
        })
    }

    /// Returns the data stored under `key` if it has not expired
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.read(key)
            .filter(|cached| !cached.is_expired)
            .map(|cached| cached.data)
    }

    /// Removes every cache entry, returning how many files were deleted
    ///
    /// A missing cache directory counts as already clear.
    pub fn clear(&self) -> io::Result<usize> {
        let entries = match fs::read_dir(&self.cache_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e),
        };

        let mut removed = 0;
        for entry in entries {
            let path = entry?.path();
            let is_cache_file = path
                .extension()
                .is_some_and(|ext| ext == "json" || ext == "tmp");
            if path.is_file() && is_cache_file {
                fs::remove_file(&path)?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

/// XDG cache directory for this tool
pub fn default_cache_dir() -> Option<PathBuf> {
    let project_dirs = ProjectDirs::from("", "", "shareasale")?;
    Some(project_dirs.cache_dir().to_path_buf())
}
