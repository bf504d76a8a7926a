//! Cache-aside store with read-time TTL evaluation, built on Moka

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::keys::CacheKey;

/// How a cached entry should be judged on read
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadPolicy {
    /// Return the entry regardless of its age
    pub allow_stale: bool,
    /// Maximum accepted age; the store default applies when unset
    pub ttl: Option<Duration>,
}

impl ReadPolicy {
    pub fn ttl(ttl: Duration) -> Self {
        Self {
            allow_stale: false,
            ttl: Some(ttl),
        }
    }

    pub fn stale() -> Self {
        Self {
            allow_stale: true,
            ttl: None,
        }
    }
}

#[derive(Debug)]
struct CacheEntry {
    value: Value,
    stored_at: Instant,
}

/// Manages cached query results and process-lifetime values.
///
/// Entries carry the instant they were saved; freshness is decided by the
/// reader, so the same key can be read with different TTLs. A read returns
/// `None` only on a miss, callers that need to remember "checked, nothing
/// found" cache an `Option` or an empty collection.
#[derive(Clone)]
pub struct CacheStore {
    /// TTL-governed entries
    entries: Cache<CacheKey, Arc<CacheEntry>>,
    /// Values that live until overwritten
    pinned: Cache<CacheKey, Arc<Value>>,
    /// TTL used when a read does not name one
    default_ttl: Duration,
}

impl CacheStore {
    /// Create a new cache store
    pub fn new(capacity: u64, default_ttl: Duration) -> Self {
        let entries = Cache::builder().max_capacity(capacity).build();
        let pinned = Cache::builder().build();

        Self {
            entries,
            pinned,
            default_ttl,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Get a cached value using the default TTL
    pub async fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        self.get_with(key, ReadPolicy::default()).await
    }

    /// Get a cached value, honouring the given read policy
    pub async fn get_with<T: DeserializeOwned>(&self, key: &CacheKey, policy: ReadPolicy) -> Option<T> {
        if let Some(value) = self.pinned.get(key).await {
            debug!("Pinned cache hit for key: {}", key);
            return decode(key, &value);
        }

        let Some(entry) = self.entries.get(key).await else {
            debug!("Cache miss for key: {}", key);
            return None;
        };

        let ttl = policy.ttl.unwrap_or(self.default_ttl);
        let age = entry.stored_at.elapsed();
        if !policy.allow_stale && age > ttl {
            debug!("Cache entry expired for key: {} (age {:?}, ttl {:?})", key, age, ttl);
            return None;
        }

        debug!("Cache hit for key: {}", key);
        decode(key, &entry.value)
    }

    /// Store a value subject to TTL on later reads
    pub async fn save<T: Serialize + ?Sized>(&self, key: CacheKey, value: &T) {
        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to serialize cache value for key {}: {}", key, e);
                return;
            }
        };
        debug!("Cached value for key: {}", key);
        let entry = CacheEntry {
            value,
            stored_at: Instant::now(),
        };
        self.entries.insert(key, Arc::new(entry)).await;
    }

    /// Store a value for the lifetime of the process
    pub async fn store<T: Serialize + ?Sized>(&self, key: CacheKey, value: &T) {
        match serde_json::to_value(value) {
            Ok(value) => {
                debug!("Pinned value for key: {}", key);
                self.pinned.insert(key, Arc::new(value)).await;
            }
            Err(e) => warn!("Failed to serialize pinned value for key {}: {}", key, e),
        }
    }

    /// Drop an entry, pinned or not
    pub async fn invalidate(&self, key: &CacheKey) {
        self.entries.invalidate(key).await;
        self.pinned.invalidate(key).await;
        debug!("Invalidated cache entry: {}", key);
    }
}

fn decode<T: DeserializeOwned>(key: &CacheKey, value: &Value) -> Option<T> {
    match T::deserialize(value) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            warn!("Discarding undecodable cache entry {}: {}", key, e);
            None
        }
    }
}
