//! Bounded, least-recently-used memoization for provider lookups.
//!
//! Keys are raw query strings compared exactly. Successful records stay until
//! evicted by capacity pressure; failed records additionally expire after the
//! configured error TTL so a transient outage does not stick for the lifetime
//! of the process.

use moka::{Expiry, future::Cache, policy::EvictionPolicy};
use std::{
    fmt,
    future::Future,
    marker::PhantomData,
    time::{Duration, Instant},
};

use crate::model::Record;

/// Gives failed records a time-to-live; successes never expire.
struct ErrorTtl<V> {
    ttl: Duration,
    _record: PhantomData<fn() -> V>,
}

impl<V: Record> ErrorTtl<V> {
    fn for_value(&self, value: &V) -> Option<Duration> {
        value.is_error().then_some(self.ttl)
    }
}

impl<V: Record> Expiry<String, V> for ErrorTtl<V> {
    fn expire_after_create(&self, _key: &String, value: &V, _created_at: Instant) -> Option<Duration> {
        self.for_value(value)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &V,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        self.for_value(value)
    }
}

pub struct BoundedCache<V> {
    capacity: usize,
    error_ttl: Duration,
    entries: Cache<String, V>,
}

impl<V> fmt::Debug for BoundedCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedCache")
            .field("capacity", &self.capacity)
            .field("error_ttl", &self.error_ttl)
            .finish_non_exhaustive()
    }
}

impl<V: Record> BoundedCache<V> {
    /// `capacity` is clamped to at least one entry; a zero `error_ttl` keeps
    /// failed records out of the cache entirely.
    pub fn new(capacity: usize, error_ttl: Duration) -> Self {
        let capacity = capacity.max(1);

        let entries = Cache::builder()
            .max_capacity(capacity as u64)
            .eviction_policy(EvictionPolicy::lru())
            .expire_after(ErrorTtl { ttl: error_ttl, _record: PhantomData })
            .eviction_listener(|key, _value, cause| {
                tracing::debug!(key = %key, ?cause, "cache entry removed");
            })
            .build();

        Self { capacity, error_ttl, entries }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Look up `key`, marking it most recently used on a hit.
    pub async fn get(&self, key: &str) -> Option<V> {
        self.entries.get(key).await
    }

    pub async fn insert(&self, key: String, value: V) {
        if value.is_error() && self.error_ttl.is_zero() {
            return;
        }

        self.entries.insert(key, value).await;
        // Apply the capacity bound now rather than on moka's next maintenance
        // cycle, so the cache never reports more than `capacity` entries.
        self.entries.run_pending_tasks().await;
    }

    /// Return the cached value for `key`, or run `fetch` and remember its
    /// result. Concurrent misses on one key may each fetch; the last insert
    /// wins.
    pub async fn get_or_fetch<F, Fut>(&self, key: &str, fetch: F) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        if let Some(hit) = self.get(key).await {
            tracing::debug!(key, "cache hit");
            return hit;
        }

        tracing::debug!(key, "cache miss");
        let value = fetch().await;
        self.insert(key.to_string(), value.clone()).await;
        value
    }

    /// Whether `key` is resident and unexpired. Does not touch recency.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub async fn len(&self) -> usize {
        self.entries.run_pending_tasks().await;
        usize::try_from(self.entries.entry_count()).unwrap_or(usize::MAX)
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
