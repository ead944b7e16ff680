//! Cached report client for the ShareASale API
//!
//! ShareASale caps report calls at 200 a month, so every fetch goes through the
//! disk cache first. Only a miss reaches the network, and only a successfully
//! parsed report is written back.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Local, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::request::{build_request, API_BASE_URL};
use super::transport::{HttpTransport, Transport};
use super::xml::{parse_xml, ApiResponse};
use super::{Credentials, RequestArgs, ResolvedArgs};
use crate::cache::CacheManager;
use crate::config::Settings;

/// Marker ShareASale embeds in a body when a request fails
const ERROR_MARKER: &str = "error code ";

/// Errors that can occur when fetching a report
#[derive(Debug, Error)]
pub enum ApiError {
    /// The HTTP client could not be constructed
    #[error("Failed to build HTTP client: {0}")]
    Client(reqwest::Error),

    /// Connection, timeout or read failure
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The upstream API returned no body at all
    #[error("ShareASale returned an empty response")]
    EmptyResponse,

    /// The body carried ShareASale's error marker
    #[error("ShareASale API error: {0}")]
    Upstream(String),

    /// The body was not well-formed XML
    #[error("Failed to parse XML response: {0}")]
    Parse(String),

    /// No cache directory could be determined while caching is enabled
    #[error("Could not determine a cache directory; set cache_dir or disable caching")]
    NoCacheDir,
}

/// Per-key gates so concurrent fetches of one report share a single upstream call
type InflightMap = Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>;

/// Client resolving report requests through the cache and the upstream API
#[derive(Debug)]
pub struct ReportClient<T = HttpTransport> {
    transport: T,
    credentials: Credentials,
    /// `None` when caching is disabled; load and save are skipped entirely
    cache: Option<CacheManager>,
    base_url: String,
    inflight: InflightMap,
}

impl ReportClient<HttpTransport> {
    /// Creates a client from effective settings
    pub fn from_settings(settings: &Settings) -> Result<Self, ApiError> {
        let transport = HttpTransport::new(settings.timeout())?;
        let cache = if settings.caching {
            let dir = settings.resolved_cache_dir().ok_or(ApiError::NoCacheDir)?;
            Some(CacheManager::with_dir(dir, settings.cache_time))
        } else {
            None
        };

        Ok(Self::with_transport(
            transport,
            settings.credentials.clone(),
            cache,
        ))
    }
}

impl<T: Transport> ReportClient<T> {
    /// Creates a client around any transport
    pub fn with_transport(transport: T, credentials: Credentials, cache: Option<CacheManager>) -> Self {
        Self {
            transport,
            credentials,
            cache,
            base_url: API_BASE_URL.to_string(),
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Points the client at a different endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn caching_enabled(&self) -> bool {
        self.cache.is_some()
    }

    /// Fetches a report, serving it from the cache when a fresh copy exists
    ///
    /// Missing dates are filled in relative to the local date.
    ///
    /// # Returns
    /// * `Ok(ApiResponse)` - the report tree, cached or freshly fetched
    /// * `Err(ApiError)` - if the upstream call fails; nothing is cached then
    pub async fn fetch(&self, args: &RequestArgs) -> Result<ApiResponse, ApiError> {
        let resolved = args.resolve(Local::now().date_naive());
        self.fetch_resolved(&resolved).await
    }

    /// Fetches a report whose dates are already resolved
    pub async fn fetch_resolved(&self, args: &ResolvedArgs) -> Result<ApiResponse, ApiError> {
        let Some(cache) = &self.cache else {
            debug!(action = %args.action, "caching disabled, calling ShareASale");
            return self.dispatch(args, Utc::now()).await;
        };

        let key = args.cache_key();
        if let Some(hit) = load_hit(cache, &key) {
            debug!(%key, "cache hit");
            return Ok(hit);
        }

        let gate = self.gate(&key);
        let result = {
            let _guard = gate.lock().await;

            // another caller may have filled the entry while we waited
            if let Some(hit) = load_hit(cache, &key) {
                debug!(%key, "cache filled by concurrent fetch");
                Ok(hit)
            } else {
                debug!(%key, "cache miss");
                let result = self.dispatch(args, Utc::now()).await;
                if let Ok(tree) = &result {
                    match cache.save(&key, tree) {
                        Ok(()) => info!(%key, ttl_secs = cache.ttl_secs(), "cached report"),
                        Err(e) => warn!(%key, error = %e, "failed to cache report"),
                    }
                }
                result
            }
        };

        self.release_gate(&key, &gate);
        result
    }

    /// Signs, sends, validates and parses one request
    async fn dispatch(&self, args: &ResolvedArgs, now: DateTime<Utc>) -> Result<ApiResponse, ApiError> {
        let request = build_request(&self.base_url, &self.credentials, args, now);
        debug!(action = %args.action, "dispatching ShareASale request");

        let body = self.transport.get(&request).await?;
        check_body(&body)?;
        parse_xml(&body)
    }

    fn gate(&self, key: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut inflight = self.inflight.lock().unwrap_or_else(|e| e.into_inner());
        inflight.entry(key.to_string()).or_default().clone()
    }

    fn release_gate(&self, key: &str, gate: &Arc<tokio::sync::Mutex<()>>) {
        let mut inflight = self.inflight.lock().unwrap_or_else(|e| e.into_inner());
        if inflight.get(key).is_some_and(|current| Arc::ptr_eq(current, gate)) {
            inflight.remove(key);
        }
    }
}

/// Loads a fresh, non-empty report; an empty stored tree counts as a miss
fn load_hit(cache: &CacheManager, key: &str) -> Option<ApiResponse> {
    cache.load::<ApiResponse>(key).filter(|hit| !hit.is_empty())
}

/// Classifies a raw response body before parsing
///
/// An empty body is a transport failure; a body containing `Error Code `
/// (any case, anywhere) is an upstream failure even with a 200 status.
pub fn check_body(body: &str) -> Result<(), ApiError> {
    if body.is_empty() {
        return Err(ApiError::EmptyResponse);
    }
    if body.to_ascii_lowercase().contains(ERROR_MARKER) {
        return Err(ApiError::Upstream(body.to_string()));
    }
    Ok(())
}
