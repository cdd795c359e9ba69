//! NoOp distributed tier.
//!
//! Used when `cache.redis.enabled = false`. Reads always miss and writes are dropped,
//! so the tiered cache runs on its local tier alone.

use async_trait::async_trait;

use crate::cache::{CacheError, DistributedTier};

/// A distributed tier that doesn't store anything.
pub struct NoOpTier;

impl NoOpTier {
    pub fn new() -> Self {
        Self
    }
}

impl Default for NoOpTier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DistributedTier for NoOpTier {
    fn name(&self) -> &'static str {
        "noop"
    }

    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: Vec<u8>, _ttl_seconds: u64) -> Result<(), CacheError> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> Result<(), CacheError> {
        Ok(())
    }

    async fn keys_matching(&self, _pattern: &str) -> Result<Vec<String>, CacheError> {
        Ok(Vec::new())
    }

    async fn delete_many(&self, _keys: &[String]) -> Result<(), CacheError> {
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }
}
