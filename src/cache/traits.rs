//! DistributedTier trait definition.

use async_trait::async_trait;

use crate::cache::CacheError;

/// Client for the shared, time-bounded cache tier.
///
/// Keys passed in and returned are logical cache keys; any namespacing is the
/// implementation's concern. Implementations must be safe to share across tasks.
#[async_trait]
pub trait DistributedTier: Send + Sync {
    /// Short name used in log fields.
    fn name(&self) -> &'static str;

    /// Get the raw bytes stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Store `value` under `key` for `ttl_seconds`.
    async fn set(&self, key: &str, value: Vec<u8>, ttl_seconds: u64) -> Result<(), CacheError>;

    /// Remove `key`. Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Enumerate keys matching a glob where `*` matches any run of characters.
    async fn keys_matching(&self, pattern: &str) -> Result<Vec<String>, CacheError>;

    /// Remove every key in `keys`.
    async fn delete_many(&self, keys: &[String]) -> Result<(), CacheError>;

    /// Round-trip check used by health probes.
    async fn ping(&self) -> Result<(), CacheError>;
}
