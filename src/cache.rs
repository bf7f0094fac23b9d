/// TTL cache for aggregated and interpolated views.
///
/// The cache is a performance layer, never a source of truth: every error
/// from the backing store degrades to "compute it again" with a logged
/// warning, and a no-op backend is a valid substitute. Concurrent requests
/// for the same key may both miss and compute redundantly - the computations
/// are idempotent, so the design tolerates the extra work instead of adding
/// a lock.
///
/// # Clock injection
/// The in-memory backend exposes `*_at` variants taking an explicit `now`
/// so TTL expiry is deterministic in tests without sleeping.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use crate::logging;
use crate::model::AqError;

// ---------------------------------------------------------------------------
// Backend trait
// ---------------------------------------------------------------------------

/// Error from a cache backend. Always recovered locally; never escalates
/// into an `AqError`.
#[derive(Debug)]
pub struct CacheError(pub String);

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cache error: {}", self.0)
    }
}

impl std::error::Error for CacheError {}

/// Minimal get/set surface over a cache backend. Values are the serialized
/// JSON payloads of the views being memoized.
pub trait CacheBackend: Send {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;
}

// ---------------------------------------------------------------------------
// In-memory backend
// ---------------------------------------------------------------------------

/// Process-local cache backend with per-entry expiry.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, (String, DateTime<Utc>)>>,
}

impl MemoryCache {
    pub fn new() -> MemoryCache {
        MemoryCache::default()
    }

    /// Deterministic read for tests: an entry is a hit only while
    /// `now < expires_at`.
    pub fn get_at(&self, key: &str, now: DateTime<Utc>) -> Result<Option<String>, CacheError> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| CacheError(e.to_string()))?;
        Ok(entries
            .get(key)
            .filter(|(_, expires_at)| now < *expires_at)
            .map(|(value, _)| value.clone()))
    }

    /// Deterministic write for tests.
    pub fn set_at(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<(), CacheError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| CacheError(e.to_string()))?;
        entries.insert(key.to_string(), (value.to_string(), now + ttl));
        Ok(())
    }
}

impl CacheBackend for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.get_at(key, Utc::now())
    }

    fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        self.set_at(key, value, ttl, Utc::now())
    }
}

// ---------------------------------------------------------------------------
// No-op backend
// ---------------------------------------------------------------------------

/// Backend that stores nothing. Substituting it turns every request into a
/// fresh computation without any other behavior change.
pub struct NoopCache;

impl CacheBackend for NoopCache {
    fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Ok(None)
    }

    fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), CacheError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Cache front
// ---------------------------------------------------------------------------

/// Memoization front over a backend, with the read-around-write refresh
/// policy and graceful degradation on backend failure.
pub struct Cache {
    backend: Box<dyn CacheBackend>,
}

impl Cache {
    pub fn new(backend: Box<dyn CacheBackend>) -> Cache {
        Cache { backend }
    }

    pub fn in_memory() -> Cache {
        Cache::new(Box::new(MemoryCache::new()))
    }

    pub fn disabled() -> Cache {
        Cache::new(Box::new(NoopCache))
    }

    /// Returns the cached value for `key` when present and fresh; otherwise
    /// invokes `compute`, stores its result with a fresh expiry, and returns
    /// it.
    ///
    /// `force_refresh` bypasses the read path but still writes the fresh
    /// result back. Backend failures on either path are logged and the
    /// request proceeds as if the cache were empty.
    pub fn get_or_compute<T, F>(
        &self,
        key: &str,
        ttl_seconds: u64,
        force_refresh: bool,
        compute: F,
    ) -> Result<T, AqError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Result<T, AqError>,
    {
        if !force_refresh {
            match self.backend.get(key) {
                Ok(Some(raw)) => match serde_json::from_str(&raw) {
                    Ok(value) => return Ok(value),
                    // A payload that no longer deserializes (e.g. after a
                    // schema change) is treated as a miss.
                    Err(e) => logging::log_cache_failure("cache decode", &e),
                },
                Ok(None) => {}
                Err(e) => logging::log_cache_failure("cache read", &e),
            }
        }

        let value = compute()?;

        match serde_json::to_string(&value) {
            Ok(raw) => {
                let ttl = Duration::seconds(ttl_seconds.min(i64::MAX as u64) as i64);
                if let Err(e) = self.backend.set(key, &raw, ttl) {
                    logging::log_cache_failure("cache write", &e);
                }
            }
            Err(e) => logging::log_cache_failure("cache encode", &e),
        }

        Ok(value)
    }

    /// Whether the backend currently answers reads. Used by the health
    /// report only; a failing probe degrades, it never errors.
    pub fn probe(&self) -> bool {
        self.backend.get("health:probe").is_ok()
    }
}

/// Builds a deterministic cache key from the full set of query parameters
/// that affect a result. Formatting `None` as the literal "None" keeps
/// "no bound" distinct from any numeric bound.
pub fn cache_key(parts: &[String]) -> String {
    parts.join(":")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
