//! Response caching middleware
//!
//! Successful `GET` responses are stored under
//! `cache:{METHOD}:{path}:{query}` for a fixed lifetime and replayed on the
//! next identical request. A `POST` to a path drops the cached query-less
//! `GET` for that path. Paths containing the configured bypass segment are
//! passed through untouched.
//!
//! Every cached or cacheable response carries an `X-Cache: HIT|MISS` header.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::{Body, Bytes},
    extract::{Request, State},
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use tokio::time::Instant;

use crate::config::CacheConfig;
use crate::error::{Error, Result};

/// Cache status response header
pub const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

/// Key under which a response is cached
pub fn cache_key(method: &Method, path: &str, query: &str) -> String {
    format!("cache:{}:{}:{}", method, path, query)
}

/// Byte store with per-entry lifetimes
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Live entry for `key`
    async fn get(&self, key: &str) -> Result<Option<Bytes>>;

    /// Store `value` under `key` for `ttl`
    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<()>;

    /// Drop `key`
    async fn delete(&self, key: &str) -> Result<()>;
}

#[derive(Debug, Clone)]
struct CacheEntry {
    body: Bytes,
    expires_at: Instant,
}

/// In-process [`CacheStore`]
///
/// Expired entries are dropped lazily on read, and the whole map is swept
/// on write once every purge interval. A zero `ttl` is never stored.
#[derive(Debug)]
pub struct MemoryCacheStore {
    entries: DashMap<String, CacheEntry>,
    epoch: Instant,
    purge_interval: Duration,
    // Milliseconds since `epoch` at which the next write sweeps the map
    next_purge_ms: AtomicU64,
}

impl Default for MemoryCacheStore {
    fn default() -> Self {
        Self::with_purge_interval(DEFAULT_PURGE_INTERVAL)
    }
}

/// Sweep interval of [`MemoryCacheStore::new`]
pub const DEFAULT_PURGE_INTERVAL: Duration = Duration::from_secs(30);

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that sweeps expired entries at most once per `interval`
    pub fn with_purge_interval(interval: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            epoch: Instant::now(),
            purge_interval: interval,
            next_purge_ms: AtomicU64::new(0),
        }
    }

    /// Number of stored entries, expired or not
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every expired entry, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        let now = Instant::now();
        self.entries.retain(|_, entry| entry.expires_at > now);
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            tracing::debug!(removed, remaining = self.entries.len(), "Expired cache entries purged");
        }
        removed
    }

    // Only the writer that wins the exchange sweeps.
    fn purge_if_due(&self) {
        let now_ms = millis(self.epoch.elapsed());
        let due = self.next_purge_ms.load(Ordering::Acquire);
        if now_ms < due {
            return;
        }
        let next = now_ms.saturating_add(millis(self.purge_interval));
        if self
            .next_purge_ms
            .compare_exchange(due, next, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.purge_expired();
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        let expired = match self.entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => {
                return Ok(Some(entry.body.clone()));
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            self.entries
                .remove_if(key, |_, entry| entry.expires_at <= Instant::now());
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<()> {
        self.purge_if_due();

        if ttl.is_zero() {
            self.entries.remove(key);
            return Ok(());
        }

        self.entries.insert(
            key.to_string(),
            CacheEntry {
                body: value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Response cache layer state
#[derive(Clone)]
pub struct ResponseCache {
    store: Arc<dyn CacheStore>,
    ttl: Duration,
    bypass_segment: String,
}

impl ResponseCache {
    /// Create a response cache over `store`
    pub fn new(store: Arc<dyn CacheStore>, config: &CacheConfig) -> Self {
        Self {
            store,
            ttl: config.ttl(),
            bypass_segment: config.bypass_segment.clone(),
        }
    }

    /// Response cache backed by a fresh [`MemoryCacheStore`]
    pub fn in_memory(config: &CacheConfig) -> Self {
        let store = MemoryCacheStore::with_purge_interval(config.purge_interval());
        Self::new(Arc::new(store), config)
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    fn bypasses(&self, path: &str) -> bool {
        !self.bypass_segment.is_empty() && path.contains(&self.bypass_segment)
    }

    /// Middleware function for response caching
    pub async fn middleware(
        State(cache): State<Self>,
        request: Request<Body>,
        next: Next,
    ) -> Response {
        let path = request.uri().path().to_string();
        if cache.bypasses(&path) {
            return next.run(request).await;
        }

        let method = request.method().clone();

        if method == Method::POST {
            let key = cache_key(&Method::GET, &path, "");
            if let Err(e) = cache.store.delete(&key).await {
                tracing::warn!(key = %key, "Failed to invalidate cached response: {}", e);
            }
            return next.run(request).await;
        }

        if method != Method::GET {
            return next.run(request).await;
        }

        let key = cache_key(&method, &path, request.uri().query().unwrap_or(""));

        match cache.store.get(&key).await {
            Ok(Some(body)) => {
                tracing::debug!(key = %key, "Serving cached response");
                return cached_response(body);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(key = %key, "Cache read failed: {}", e),
        }

        let (mut parts, body) = next.run(request).await.into_parts();
        parts.headers.insert(X_CACHE, HeaderValue::from_static("MISS"));

        if !parts.status.is_success() {
            return Response::from_parts(parts, body);
        }

        let bytes = match axum::body::to_bytes(body, usize::MAX).await {
            Ok(bytes) => bytes,
            Err(e) => {
                return Error::Internal(format!("Failed to buffer response body: {}", e))
                    .into_response();
            }
        };

        if !bytes.is_empty() && !cache.ttl.is_zero() {
            if let Err(e) = cache.store.set(&key, bytes.clone(), cache.ttl).await {
                tracing::warn!(key = %key, "Cache write failed: {}", e);
            }
        }

        Response::from_parts(parts, Body::from(bytes))
    }
}

fn cached_response(body: Bytes) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/json")),
            (X_CACHE, HeaderValue::from_static("HIT")),
        ],
        body,
    )
        .into_response()
}
