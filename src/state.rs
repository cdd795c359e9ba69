//! Application state for Axum web framework.

use std::sync::Arc;

use crate::cache::{StandCacheConfig, TieredCache};
use crate::db::AsyncDbPool;
use crate::repositories::StandRepository;
use crate::services::{LoggedCatalog, StandCache, StandCatalog};

/// Shared resources reachable from every handler.
///
/// Cloning is cheap: the catalog is behind an `Arc`, and both the pool and the
/// cache use `Arc` internally.
#[derive(Clone)]
pub struct AppState {
    /// Stand reads and cache invalidation
    pub catalog: Arc<dyn StandCatalog>,
    /// Used directly by health checks
    pub db_pool: AsyncDbPool,
    pub cache: TieredCache,
}

impl AppState {
    /// Wire the PostGIS repository behind the stand cache and the logging decorator.
    pub fn new(db_pool: AsyncDbPool, cache: TieredCache, policy: &StandCacheConfig) -> Self {
        let repository = Arc::new(StandRepository::new(db_pool.clone()));
        let stands = StandCache::new(cache.clone(), repository, policy);

        Self::with_catalog(Arc::new(LoggedCatalog::new(stands)), db_pool, cache)
    }

    /// Build state around an existing catalog.
    pub fn with_catalog(
        catalog: Arc<dyn StandCatalog>,
        db_pool: AsyncDbPool,
        cache: TieredCache,
    ) -> Self {
        Self {
            catalog,
            db_pool,
            cache,
        }
    }
}
