//! Builds the tiered cache from configuration.

use std::sync::Arc;

use crate::cache::local::LocalTier;
use crate::cache::noop::NoOpTier;
use crate::cache::redis::RedisTier;
use crate::cache::{CacheError, DistributedTier, TieredCache};
use crate::config::settings::CacheConfig;

/// Create the tiered cache described by `config`.
///
/// The distributed tier is Redis when `cache.redis.enabled` is set and a no-op tier
/// otherwise. Redis connections are opened lazily, so an unreachable Redis does not
/// prevent startup.
pub async fn init_cache(config: &CacheConfig) -> Result<TieredCache, CacheError> {
    let local = LocalTier::new(&config.local);

    let distributed: Arc<dyn DistributedTier> = if config.redis.enabled {
        Arc::new(RedisTier::new(&config.redis).await?)
    } else {
        Arc::new(NoOpTier::new())
    };

    tracing::info!(
        local_capacity = config.local.max_capacity,
        local_idle_seconds = config.local.time_to_idle_seconds,
        distributed = distributed.name(),
        default_local_ttl = config.default_ttl.local_seconds,
        default_distributed_ttl = config.default_ttl.distributed_seconds,
        "Cache initialized"
    );

    Ok(TieredCache::new(
        local,
        distributed,
        config.default_ttl.ttl_pair(),
    ))
}
