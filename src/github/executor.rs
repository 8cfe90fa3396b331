// Conditional request executor.
// Revalidates cached GET/HEAD responses with entity tags and keeps the
// response cache consistent with what the server last returned.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use reqwest::StatusCode;
use reqwest::header::{ETAG, HeaderMap, HeaderValue, IF_NONE_MATCH};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::cache::{CacheEntry, CacheKey, CacheLookup, DEFAULT_TTL, ResponseCache};
use crate::config::Config;
use crate::error::{HubError, Result};

use super::request::PreparedRequest;
use super::transport::{Transport, TransportResponse};
use super::types::RateLimit;

/// What a call produced, from the caller's point of view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Body just returned by the server.
    Fresh(String),
    /// Body served from the cache after a 304 or while still fresh.
    Cached(String),
    /// The server answered 404.
    NotFound,
}

impl Outcome {
    pub fn into_body(self) -> Option<String> {
        match self {
            Outcome::Fresh(body) | Outcome::Cached(body) => Some(body),
            Outcome::NotFound => None,
        }
    }

    pub fn is_cached(&self) -> bool {
        matches!(self, Outcome::Cached(_))
    }
}

/// Classified server response.
enum ResponseOutcome {
    Fresh { body: String, headers: HeaderMap },
    NotModified,
    NotFound,
}

/// When cached responses are reused.
#[derive(Debug, Clone)]
pub struct CachePolicy {
    /// Lifetime given to every stored entry.
    pub ttl: Duration,
    /// Revalidate entries within their TTL too. When false, fresh
    /// entries are served without a network call.
    pub revalidate_fresh: bool,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            revalidate_fresh: true,
        }
    }
}

impl CachePolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            ttl: config.cache_ttl(),
            revalidate_fresh: config.revalidate_fresh,
        }
    }
}

/// Runs prepared requests through the response cache.
pub struct ConditionalExecutor {
    transport: Box<dyn Transport>,
    cache: ResponseCache,
    policy: CachePolicy,
    url_locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
    rate_limit: Mutex<RateLimit>,
}

impl ConditionalExecutor {
    pub fn new(transport: Box<dyn Transport>, policy: CachePolicy) -> Self {
        Self {
            transport,
            cache: ResponseCache::new(),
            policy,
            url_locks: Mutex::new(HashMap::new()),
            rate_limit: Mutex::new(RateLimit::default()),
        }
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    /// Rate limit values from the most recent response headers.
    pub fn rate_limit(&self) -> RateLimit {
        self.rate_limit
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Execute a request.
    ///
    /// GET and HEAD go through the cache: a stored entry's tag is sent as
    /// `If-None-Match`, a 304 returns the stored body, and a 2xx replaces the
    /// entry. Other methods never read the cache and, on success, drop every
    /// entry stored for their URL and for every URL in `invalidates`.
    ///
    /// The whole lookup, exchange and store sequence holds a per-URL lock.
    /// Writes hold the locks of every URL they invalidate, taken in sorted order.
    pub async fn execute(&self, request: PreparedRequest) -> Result<Outcome> {
        if request.is_cacheable() {
            let lock = self.url_lock(&request.url);
            let _guard = lock.lock().await;
            self.execute_read(request).await
        } else {
            let _guards = self.lock_all(affected_urls(&request)).await;
            self.execute_write(request).await
        }
    }

    async fn execute_read(&self, mut request: PreparedRequest) -> Result<Outcome> {
        let key = CacheKey::new(request.method.clone(), request.url.clone());

        let cached = match self.cache.lookup(&key, Utc::now()) {
            CacheLookup::Fresh(entry) if !self.policy.revalidate_fresh => {
                tracing::debug!("cache hit for {}, serving without revalidation", request.url);
                return Ok(Outcome::Cached(entry.body));
            }
            CacheLookup::Fresh(entry) => Some(entry),
            CacheLookup::Stale(entry) => {
                tracing::debug!("cache entry for {} expired, revalidating", request.url);
                Some(entry)
            }
            CacheLookup::Missing => None,
        };

        match cached.as_ref().map(|entry| HeaderValue::from_str(&entry.etag)) {
            Some(Ok(etag)) => {
                request.headers.insert(IF_NONE_MATCH, etag);
            }
            Some(Err(_)) => {
                tracing::warn!("stored entity tag for {} is not a valid header value", request.url);
            }
            None => {}
        }

        let response = self.send(&request).await?;

        match self.classify(response)? {
            ResponseOutcome::NotModified => match cached {
                Some(entry) => {
                    tracing::debug!("{} not modified, serving cached body", request.url);
                    Ok(Outcome::Cached(entry.body))
                }
                None => {
                    tracing::warn!("{} answered 304 to an unconditional request", request.url);
                    Err(not_modified_error())
                }
            },
            ResponseOutcome::Fresh { body, headers } => {
                self.store(key, &body, headers);
                Ok(Outcome::Fresh(body))
            }
            ResponseOutcome::NotFound => Ok(Outcome::NotFound),
        }
    }

    async fn execute_write(&self, mut request: PreparedRequest) -> Result<Outcome> {
        request.headers.remove(IF_NONE_MATCH);

        let response = self.send(&request).await?;

        match self.classify(response)? {
            ResponseOutcome::Fresh { body, .. } => {
                let dropped: usize = affected_urls(&request)
                    .iter()
                    .map(|url| self.cache.invalidate(url))
                    .sum();
                if dropped > 0 {
                    tracing::debug!("{} {} invalidated {} cached entries", request.method, request.url, dropped);
                }
                Ok(Outcome::Fresh(body))
            }
            ResponseOutcome::NotFound => Ok(Outcome::NotFound),
            ResponseOutcome::NotModified => Err(not_modified_error()),
        }
    }

    async fn send(&self, request: &PreparedRequest) -> Result<TransportResponse> {
        let response = self.transport.send(request).await?;
        self.update_rate_limit(&response.headers);
        Ok(response)
    }

    /// Store a 2xx body, or drop the old entry if the server sent no tag to revalidate with.
    fn store(&self, key: CacheKey, body: &str, headers: HeaderMap) {
        let etag = headers
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        match etag {
            Some(etag) => {
                tracing::debug!("caching {} with etag {}", key.url, etag);
                let entry = CacheEntry::new(body.to_string(), etag, headers, self.policy.ttl);
                self.cache.put(key, entry);
            }
            None => {
                if self.cache.remove(&key).is_some() {
                    tracing::debug!("{} returned no etag, dropped cached entry", key.url);
                }
            }
        }
    }

    /// Map status codes onto outcomes and errors.
    fn classify(&self, response: TransportResponse) -> Result<ResponseOutcome> {
        match response.status {
            status if status.is_success() => Ok(ResponseOutcome::Fresh {
                body: response.body,
                headers: response.headers,
            }),
            StatusCode::NOT_MODIFIED => Ok(ResponseOutcome::NotModified),
            StatusCode::NOT_FOUND => Ok(ResponseOutcome::NotFound),
            StatusCode::UNAUTHORIZED => Err(HubError::Unauthorized),
            StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS
                if header_u64(&response.headers, "x-ratelimit-remaining") == Some(0) =>
            {
                let reset_at = header_u64(&response.headers, "x-ratelimit-reset")
                    .and_then(|reset| chrono::DateTime::from_timestamp(reset as i64, 0))
                    .map(|dt| dt.format("%H:%M:%S").to_string())
                    .unwrap_or_else(|| "unknown".to_string());
                Err(HubError::RateLimited { reset_at })
            }
            status => Err(HubError::Status {
                status: status.as_u16(),
                message: response.body,
            }),
        }
    }

    /// Update rate limit from response headers.
    fn update_rate_limit(&self, headers: &HeaderMap) {
        let mut rate_limit = self.rate_limit.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(limit) = header_u64(headers, "x-ratelimit-limit") {
            rate_limit.limit = limit;
        }
        if let Some(remaining) = header_u64(headers, "x-ratelimit-remaining") {
            rate_limit.remaining = remaining;
        }
        if let Some(reset) = header_u64(headers, "x-ratelimit-reset") {
            rate_limit.reset = reset;
        }
        if let Some(used) = header_u64(headers, "x-ratelimit-used") {
            rate_limit.used = used;
        }
    }

    fn url_lock(&self, url: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.url_locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.entry(url.to_string()).or_default().clone()
    }

    async fn lock_all(&self, urls: Vec<String>) -> Vec<OwnedMutexGuard<()>> {
        let mut guards = Vec::with_capacity(urls.len());
        for url in urls {
            guards.push(self.url_lock(&url).lock_owned().await);
        }
        guards
    }
}

/// The request URL plus everything it invalidates, sorted and deduplicated.
fn affected_urls(request: &PreparedRequest) -> Vec<String> {
    let mut urls: Vec<String> = std::iter::once(&request.url)
        .chain(&request.invalidates)
        .cloned()
        .collect();
    urls.sort();
    urls.dedup();
    urls
}

fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

fn not_modified_error() -> HubError {
    HubError::Status {
        status: StatusCode::NOT_MODIFIED.as_u16(),
        message: "not modified without a cached response".to_string(),
    }
}
