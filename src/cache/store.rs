// In-memory response store keyed by request method and URL.
// Holds bodies with their entity tags and checks TTL at lookup time.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Method;
use reqwest::header::HeaderMap;

/// Lifetime of a stored response before it counts as stale: 12 hours.
pub const DEFAULT_TTL: Duration = Duration::from_secs(12 * 60 * 60);

/// Identifies a stored response. Only GET and HEAD keys are ever stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub method: Method,
    pub url: String,
}

impl CacheKey {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }
}

/// A stored response. Replaced wholesale, never mutated in place.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Response body as returned by the server.
    pub body: String,
    /// Entity tag the server sent with `body`.
    pub etag: String,
    /// Response headers at the time of storage.
    pub headers: HeaderMap,
    /// Absolute expiration, fixed at write time.
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Create an entry expiring `ttl` from now.
    pub fn new(body: String, etag: String, headers: HeaderMap, ttl: Duration) -> Self {
        Self::stored_at(body, etag, headers, ttl, Utc::now())
    }

    /// Create an entry as if stored at `now`.
    pub fn stored_at(
        body: String,
        etag: String,
        headers: HeaderMap,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Self {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        let expires_at = now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC);

        Self {
            body,
            etag,
            headers,
            expires_at,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// Result of an expiration-aware lookup.
#[derive(Debug, Clone)]
pub enum CacheLookup {
    /// Stored and within its TTL.
    Fresh(CacheEntry),
    /// Stored but past its TTL; the tag is still usable for revalidation.
    Stale(CacheEntry),
    Missing,
}

impl CacheLookup {
    /// The entry regardless of freshness.
    pub fn entry(&self) -> Option<&CacheEntry> {
        match self {
            CacheLookup::Fresh(entry) | CacheLookup::Stale(entry) => Some(entry),
            CacheLookup::Missing => None,
        }
    }
}

/// Process-local response cache owned by a single client.
#[derive(Debug, Default)]
pub struct ResponseCache {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw lookup, ignoring expiration.
    pub fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.read().get(key).cloned()
    }

    /// Lookup classifying the entry against `now`.
    pub fn lookup(&self, key: &CacheKey, now: DateTime<Utc>) -> CacheLookup {
        match self.read().get(key) {
            Some(entry) if entry.is_expired_at(now) => CacheLookup::Stale(entry.clone()),
            Some(entry) => CacheLookup::Fresh(entry.clone()),
            None => CacheLookup::Missing,
        }
    }

    /// Insert or replace the entry for `key`.
    pub fn put(&self, key: CacheKey, entry: CacheEntry) {
        self.write().insert(key, entry);
    }

    /// Remove the entry for one key, returning it if present.
    pub fn remove(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.write().remove(key)
    }

    /// Remove every entry stored for `url`, whatever the method.
    /// Returns the number of entries dropped.
    pub fn invalidate(&self, url: &str) -> usize {
        let mut entries = self.write();
        let before = entries.len();
        entries.retain(|key, _| key.url != url);
        before - entries.len()
    }

    // A panic while holding the lock cannot leave a half-written entry,
    // so poisoned guards are safe to reuse.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<CacheKey, CacheEntry>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<CacheKey, CacheEntry>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }
}
