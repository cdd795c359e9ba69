//! Two-tier read-through cache.
//!
//! This module provides a cache made of:
//! - a local tier (in-process moka cache, bounded by entry count, per-entry write TTL
//!   and an idle timeout)
//! - a distributed tier (Redis, bounded by write TTL only), shared by every instance
//!
//! Reads go local → distributed → loader. Loads for the same key are coalesced so a
//! cold key triggers one backend query no matter how many requests arrive at once.
//! Distributed-tier failures degrade to loader-only behavior and are only logged.
//!
//! # Configuration
//!
//! ```toml
//! [cache.local]
//! max_capacity = 10000
//! time_to_idle_seconds = 300
//!
//! [cache.redis]
//! enabled = true
//! url = "redis://127.0.0.1:6379"
//! pool_size = 4
//! connection_timeout = 5
//! command_timeout_ms = 500
//! key_prefix = "forest"
//!
//! [cache.default_ttl]
//! local_seconds = 600
//! distributed_seconds = 1800
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let cache = init_cache(&settings.cache).await?;
//! let stand: Stand = cache
//!     .get_or_load("stand:id:7", || repo.find_by_id(7))
//!     .await?;
//! cache.delete_by_pattern("stand:high-value:*").await;
//! ```

mod error;
mod flight;
mod local;
mod manager;
mod noop;
mod pattern;
mod redis;
mod tiered;
mod traits;

#[cfg(test)]
mod tests;

pub use error::CacheError;
pub use local::LocalTier;
pub use manager::init_cache;
pub use noop::NoOpTier;
pub use pattern::KeyPattern;
pub use redis::RedisTier;
pub use tiered::{TieredCache, TtlPair};
pub use traits::DistributedTier;

// Re-export config types
pub use crate::config::settings::{
    CacheConfig, LocalCacheConfig, RedisCacheConfig, StandCacheConfig, TtlConfig,
};
