//! Two-tier read-through cache.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::cache::flight::FlightRegistry;
use crate::cache::local::LocalTier;
use crate::cache::pattern::KeyPattern;
use crate::cache::{CacheError, DistributedTier};

/// Expiration for a cached value in each tier. A zero duration skips that tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPair {
    pub local: Duration,
    pub distributed: Duration,
}

impl TtlPair {
    pub const fn new(local: Duration, distributed: Duration) -> Self {
        Self { local, distributed }
    }

    pub const fn from_secs(local: u64, distributed: u64) -> Self {
        Self::new(Duration::from_secs(local), Duration::from_secs(distributed))
    }

    /// True when neither tier would store the value.
    pub fn is_disabled(&self) -> bool {
        self.local.is_zero() && self.distributed.is_zero()
    }
}

/// Read-through cache over a local tier and a distributed tier.
///
/// Values are stored as JSON in both tiers. Reads check the local tier first, then the
/// distributed tier (copying hits back into the local tier). Distributed-tier failures
/// and undecodable entries are logged and treated as misses; they never fail a call.
///
/// Cloning is cheap; all clones share the same tiers and in-flight registry.
#[derive(Clone)]
pub struct TieredCache {
    local: Arc<LocalTier>,
    distributed: Arc<dyn DistributedTier>,
    flights: Arc<FlightRegistry>,
    default_ttl: TtlPair,
}

impl TieredCache {
    /// Create a cache over the given tiers.
    ///
    /// `default_ttl` applies to [`get_or_load`](Self::get_or_load) and to values copied
    /// from the distributed tier into the local tier.
    pub fn new(
        local: LocalTier,
        distributed: Arc<dyn DistributedTier>,
        default_ttl: TtlPair,
    ) -> Self {
        Self {
            local: Arc::new(local),
            distributed,
            flights: Arc::new(FlightRegistry::new()),
            default_ttl,
        }
    }

    pub fn default_ttl(&self) -> TtlPair {
        self.default_ttl
    }

    /// Name of the distributed tier backend.
    pub fn distributed_tier(&self) -> &'static str {
        self.distributed.name()
    }

    /// Approximate number of entries in the local tier.
    pub fn local_entry_count(&self) -> u64 {
        self.local.entry_count()
    }

    /// Check that the distributed tier answers.
    pub async fn ping_distributed(&self) -> Result<(), CacheError> {
        self.distributed.ping().await
    }

    /// Look `key` up in the local tier, then the distributed tier.
    ///
    /// A distributed hit is written back into the local tier. Returns `None` on a miss
    /// in both tiers.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        if let Some(bytes) = self.local.get(key) {
            match serde_json::from_slice::<T>(&bytes) {
                Ok(value) => {
                    tracing::trace!(key = %key, tier = "local", "Cache hit");
                    return Some(value);
                }
                Err(e) => {
                    tracing::warn!(key = %key, tier = "local", error = %e, "Discarding undecodable cache entry");
                    self.local.remove(key);
                }
            }
        }

        let bytes = match self.distributed.get(key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                tracing::trace!(key = %key, "Cache miss");
                return None;
            }
            Err(e) => {
                tracing::warn!(
                    key = %key,
                    tier = self.distributed.name(),
                    error = %e,
                    "Distributed cache read failed, treating as miss"
                );
                return None;
            }
        };

        match serde_json::from_slice::<T>(&bytes) {
            Ok(value) => {
                tracing::trace!(key = %key, tier = self.distributed.name(), "Cache hit, promoting to local tier");
                self.local.insert(key, Arc::from(bytes), self.default_ttl.local);
                Some(value)
            }
            Err(e) => {
                let error = CacheError::from(e);
                tracing::warn!(
                    key = %key,
                    tier = self.distributed.name(),
                    error = %error,
                    "Undecodable distributed entry, treating as miss"
                );
                None
            }
        }
    }

    /// [`get`](Self::get), loading and caching the value with the default TTL pair on
    /// a miss. See [`get_or_load_with_ttl`](Self::get_or_load_with_ttl).
    pub async fn get_or_load<T, E, F, Fut>(&self, key: &str, loader: F) -> Result<T, Arc<E>>
    where
        T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
        E: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.get_or_load_with_ttl(key, self.default_ttl, loader)
            .await
    }

    /// [`get`](Self::get), loading the value on a miss and storing it with `ttl`.
    ///
    /// Concurrent misses for the same key run `loader` once; the other callers wait for
    /// it and receive a clone of the same value, or the same error. Errors are never
    /// cached.
    pub async fn get_or_load_with_ttl<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: TtlPair,
        loader: F,
    ) -> Result<T, Arc<E>>
    where
        T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
        E: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(hit) = self.get::<T>(key).await {
            return Ok(hit);
        }

        self.flights
            .run::<T, E, _, _>(key, || async {
                // A flight that completed after our first lookup may already have
                // filled the cache.
                if let Some(hit) = self.get::<T>(key).await {
                    return Ok(hit);
                }

                tracing::debug!(key = %key, "Cache miss, loading");
                let value = match loader().await {
                    Ok(value) => value,
                    Err(e) => return Err(e),
                };
                self.set(key, &value, ttl).await;
                Ok(value)
            })
            .await
    }

    /// Store `value` under `key`.
    ///
    /// Writes the local tier iff `ttl.local` is non-zero and the distributed tier iff
    /// `ttl.distributed` is non-zero. Values that serialize to JSON `null` are not
    /// stored.
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: TtlPair) {
        if ttl.is_disabled() {
            return;
        }

        let bytes = match serde_json::to_vec(value) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Failed to serialize cache value");
                return;
            }
        };

        if bytes == b"null" {
            tracing::trace!(key = %key, "Skipping absent value");
            return;
        }

        if !ttl.local.is_zero() {
            self.local.insert(key, Arc::from(bytes.as_slice()), ttl.local);
        }

        if !ttl.distributed.is_zero() {
            let ttl_seconds = ttl.distributed.as_secs().max(1);
            if let Err(e) = self.distributed.set(key, bytes, ttl_seconds).await {
                tracing::warn!(
                    key = %key,
                    tier = self.distributed.name(),
                    error = %e,
                    "Distributed cache write failed"
                );
            }
        }
    }

    /// Remove `key` from both tiers.
    pub async fn delete(&self, key: &str) {
        self.local.remove(key);

        if let Err(e) = self.distributed.delete(key).await {
            tracing::warn!(
                key = %key,
                tier = self.distributed.name(),
                error = %e,
                "Distributed cache delete failed"
            );
        }
    }

    /// Remove every key matching `pattern` (`*` matches any run of characters) from
    /// both tiers.
    ///
    /// The distributed tier is enumerated first and deleted second, so a matching key
    /// written in between survives this pass.
    pub async fn delete_by_pattern(&self, pattern: &str) {
        let removed_local = match KeyPattern::new(pattern) {
            Ok(compiled) => self.local.remove_matching(&compiled),
            Err(e) => {
                tracing::warn!(pattern = %pattern, error = %e, "Invalid key pattern, local tier untouched");
                0
            }
        };

        let removed_distributed = match self.distributed.keys_matching(pattern).await {
            Ok(keys) => match self.distributed.delete_many(&keys).await {
                Ok(()) => keys.len(),
                Err(e) => {
                    tracing::warn!(
                        pattern = %pattern,
                        tier = self.distributed.name(),
                        error = %e,
                        "Distributed cache bulk delete failed"
                    );
                    0
                }
            },
            Err(e) => {
                tracing::warn!(
                    pattern = %pattern,
                    tier = self.distributed.name(),
                    error = %e,
                    "Distributed cache key enumeration failed"
                );
                0
            }
        };

        tracing::debug!(
            pattern = %pattern,
            removed_local,
            removed_distributed,
            "Pattern invalidation finished"
        );
    }
}
