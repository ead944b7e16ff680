//! Settings for the ShareASale client
//!
//! Settings come from three layers: built-in defaults, the persisted settings
//! file, and per-invocation overrides from the command line. A later layer wins
//! for every field it sets; empty strings count as unset.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::{mask, Credentials};
use crate::cache::{default_cache_dir, DEFAULT_CACHE_TTL_SECS};

/// Default upstream request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// File name of the persisted settings inside the config directory
const SETTINGS_FILE: &str = "settings.json";

/// Errors that can occur while loading or saving settings
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Settings file could not be read or written
    #[error("Settings file error: {0}")]
    Io(#[from] std::io::Error),

    /// Settings file is not valid JSON
    #[error("Invalid settings file: {0}")]
    Json(#[from] serde_json::Error),

    /// No home directory to place the settings file in
    #[error("Could not determine a settings directory; pass --config")]
    NoConfigDir,
}

/// Settings as persisted on disk (or given as overrides); every field optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affiliate_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caching: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_time: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
}

impl StoredSettings {
    /// Reads the settings file; a missing file yields empty settings
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Writes the settings file, creating its directory if needed
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Layers `other` on top of `self`, field by field
    pub fn merged(mut self, other: &StoredSettings) -> Self {
        override_string(&mut self.affiliate_id, &other.affiliate_id);
        override_string(&mut self.api_token, &other.api_token);
        override_string(&mut self.secret_key, &other.secret_key);
        override_value(&mut self.caching, &other.caching);
        override_value(&mut self.cache_time, &other.cache_time);
        override_value(&mut self.timeout_secs, &other.timeout_secs);
        override_value(&mut self.cache_dir, &other.cache_dir);
        self
    }
}

fn override_string(target: &mut Option<String>, value: &Option<String>) {
    if let Some(value) = value.as_ref().filter(|v| !v.is_empty()) {
        *target = Some(value.clone());
    }
}

fn override_value<T: Clone>(target: &mut Option<T>, value: &Option<T>) {
    if value.is_some() {
        *target = value.clone();
    }
}

/// Effective settings for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub credentials: Credentials,
    /// Whether report responses are cached at all
    pub caching: bool,
    /// Cache lifetime in seconds
    pub cache_time: u64,
    /// Upstream request timeout in seconds
    pub timeout_secs: u64,
    /// Explicit cache directory; the XDG cache directory otherwise
    pub cache_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            credentials: Credentials::default(),
            caching: true,
            cache_time: DEFAULT_CACHE_TTL_SECS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            cache_dir: None,
        }
    }
}

impl Settings {
    /// Builds settings from defaults with `stored` layered on top
    pub fn from_stored(stored: &StoredSettings) -> Self {
        Self::default().merged(stored)
    }

    /// Loads the settings file at `path` and applies `overrides` on top
    pub fn load(path: &Path, overrides: &StoredSettings) -> Result<Self, ConfigError> {
        let stored = StoredSettings::load(path)?.merged(overrides);
        Ok(Self::from_stored(&stored))
    }

    /// Applies every field `stored` sets (non-empty for strings)
    pub fn merged(mut self, stored: &StoredSettings) -> Self {
        let non_empty = |value: &Option<String>| value.clone().filter(|v| !v.is_empty());

        if let Some(affiliate_id) = non_empty(&stored.affiliate_id) {
            self.credentials.affiliate_id = affiliate_id;
        }
        if let Some(api_token) = non_empty(&stored.api_token) {
            self.credentials.api_token = api_token;
        }
        if let Some(secret_key) = non_empty(&stored.secret_key) {
            self.credentials.secret_key = secret_key;
        }
        if let Some(caching) = stored.caching {
            self.caching = caching;
        }
        if let Some(cache_time) = stored.cache_time {
            self.cache_time = cache_time;
        }
        // zero would make every request time out immediately
        if let Some(timeout_secs) = stored.timeout_secs.filter(|secs| *secs > 0) {
            self.timeout_secs = timeout_secs;
        }
        if let Some(cache_dir) = &stored.cache_dir {
            self.cache_dir = Some(cache_dir.clone());
        }
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Directory the report cache lives in
    pub fn resolved_cache_dir(&self) -> Option<PathBuf> {
        self.cache_dir.clone().or_else(default_cache_dir)
    }

    /// Whether all three credentials are set
    pub fn has_credentials(&self) -> bool {
        let c = &self.credentials;
        !c.affiliate_id.is_empty() && !c.api_token.is_empty() && !c.secret_key.is_empty()
    }
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unset = |value: &str| {
            if value.is_empty() {
                "(not set)".to_string()
            } else {
                value.to_string()
            }
        };

        writeln!(f, "affiliate_id: {}", unset(&self.credentials.affiliate_id))?;
        writeln!(f, "api_token: {}", unset(&mask(&self.credentials.api_token)))?;
        writeln!(f, "secret_key: {}", unset(&mask(&self.credentials.secret_key)))?;
        writeln!(
            f,
            "caching: {}",
            if self.caching { "enabled" } else { "disabled" }
        )?;
        writeln!(f, "cache_time: {}", self.cache_time)?;
        writeln!(f, "timeout_secs: {}", self.timeout_secs)?;
        match self.resolved_cache_dir() {
            Some(dir) => write!(f, "cache_dir: {}", dir.display()),
            None => write!(f, "cache_dir: (unavailable)"),
        }
    }
}

/// Default location of the settings file (`~/.config/shareasale/settings.json` on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    let project_dirs = ProjectDirs::from("", "", "shareasale")?;
    Some(project_dirs.config_dir().join(SETTINGS_FILE))
}
