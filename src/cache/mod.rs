//! Cache module for storing report responses to disk
//!
//! ShareASale allows 200 report calls a month, so fetched reports are kept on
//! disk for a configurable number of seconds. Reads past the TTL behave as a
//! miss; the stale entry remains readable through `CacheManager::read`.

mod manager;

pub use manager::{default_cache_dir, CacheManager, CachedData, DEFAULT_CACHE_TTL_SECS};
