//! TTL response cache over local storage.
//!
//! Each entry is stored as JSON `{data, timestamp, ttl}` under its own key,
//! prefixed with [`CACHE_PREFIX`] so that [`TtlCache::clear`] only touches
//! cache entries and never other state sharing the storage (the auth token
//! in particular). Expiry is checked on read; there is no background
//! eviction.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock};
use crate::storage::Storage;

/// Key prefix for every cache entry.
pub const CACHE_PREFIX: &str = "heva_cache:";

/// Default time-to-live: 24 hours.
pub const DEFAULT_TTL: Duration = Duration::from_millis(86_400_000);

// ============================================================================
// Cache Entry
// ============================================================================

/// A cached value with its write time and lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    /// Cached value.
    pub data: T,
    /// Write time in epoch milliseconds.
    pub timestamp: i64,
    /// Lifetime in milliseconds.
    pub ttl: u64,
}

impl<T> CacheEntry<T> {
    /// Returns true once more than `ttl` milliseconds have passed since `timestamp`.
    pub fn is_expired(&self, now_millis: i64) -> bool {
        let age = now_millis.saturating_sub(self.timestamp);
        // An entry from the future (clock moved back) has negative age and is kept.
        age > 0 && age.unsigned_abs() > self.ttl
    }
}

// ============================================================================
// TTL Cache
// ============================================================================

/// Best-effort client-local memoization with expiry.
///
/// Never returns errors: write failures are logged, and unreadable entries
/// read as absent.
pub struct TtlCache {
    storage: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
    prefix: String,
}

impl TtlCache {
    /// Creates a cache using wall-clock time.
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self::with_clock(storage, Arc::new(SystemClock))
    }

    /// Creates a cache with a custom time source.
    pub fn with_clock(storage: Arc<dyn Storage>, clock: Arc<dyn Clock>) -> Self {
        Self {
            storage,
            clock,
            prefix: CACHE_PREFIX.to_string(),
        }
    }

    /// Replaces the key prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    fn storage_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    /// Stores `data` under `key` for `ttl`, replacing any existing entry.
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, data: &T, ttl: Duration) {
        let entry = CacheEntry {
            data,
            timestamp: self.clock.now_millis(),
            ttl: u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX),
        };

        let json = match serde_json::to_string(&entry) {
            Ok(json) => json,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to serialize cache entry");
                return;
            }
        };

        if let Err(e) = self.storage.set_item(&self.storage_key(key), &json) {
            warn!(key = %key, error = %e, "Failed to write cache entry");
        } else {
            debug!(key = %key, ttl_ms = entry.ttl, "Cache entry stored");
        }
    }

    /// Stores `data` under `key` for [`DEFAULT_TTL`].
    pub fn set_default<T: Serialize + ?Sized>(&self, key: &str, data: &T) {
        self.set(key, data, DEFAULT_TTL);
    }

    /// Returns the value under `key` if present and not expired.
    ///
    /// Expired or malformed entries are removed. An entry whose data does
    /// not fit `T` is left in place and reads as `None`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let storage_key = self.storage_key(key);
        let raw = self.storage.get_item(&storage_key)?;

        let entry: CacheEntry<Value> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                debug!(key = %key, error = %e, "Dropping malformed cache entry");
                self.discard(&storage_key);
                return None;
            }
        };

        if entry.is_expired(self.clock.now_millis()) {
            debug!(key = %key, "Cache entry expired");
            self.discard(&storage_key);
            return None;
        }

        match serde_json::from_value(entry.data) {
            Ok(data) => Some(data),
            Err(e) => {
                debug!(key = %key, error = %e, "Cache entry has unexpected shape");
                None
            }
        }
    }

    /// Returns the raw entry under `key` without checking or enforcing expiry.
    pub fn peek(&self, key: &str) -> Option<CacheEntry<Value>> {
        let raw = self.storage.get_item(&self.storage_key(key))?;
        serde_json::from_str(&raw).ok()
    }

    /// Returns true if the entry under `key` exists and has expired.
    pub fn is_expired(&self, key: &str) -> bool {
        self.peek(key)
            .is_some_and(|entry| entry.is_expired(self.clock.now_millis()))
    }

    /// Removes the entry under `key`.
    pub fn remove(&self, key: &str) {
        self.discard(&self.storage_key(key));
    }

    /// Removes every cache entry. Keys outside the cache prefix are untouched.
    pub fn clear(&self) {
        let prefix = self.prefix.as_str();
        match self.storage.remove_where(&|k| k.starts_with(prefix)) {
            Ok(removed) => debug!(removed, "Cache cleared"),
            Err(e) => warn!(error = %e, "Failed to clear cache"),
        }
    }

    /// Lists cached keys (without the prefix), expired ones included.
    pub fn keys(&self) -> Vec<String> {
        self.storage
            .keys()
            .into_iter()
            .filter_map(|k| k.strip_prefix(&self.prefix).map(str::to_string))
            .collect()
    }

    fn discard(&self, storage_key: &str) {
        if let Err(e) = self.storage.remove_item(storage_key) {
            warn!(key = %storage_key, error = %e, "Failed to remove cache entry");
        }
    }
}

impl fmt::Debug for TtlCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TtlCache").field("prefix", &self.prefix).finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
