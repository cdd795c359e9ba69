//! Caching policy for stand catalog reads.
//!
//! Maps each read to a cache key and TTL pair, and each write-side event to the set
//! of keys it invalidates. The data itself comes from a [`StandSource`].

use std::sync::Arc;

use crate::cache::{StandCacheConfig, TieredCache, TtlPair};
use crate::error::{AppError, AppResult};
use crate::models::{SpeciesStatistics, Stand};
use crate::repositories::StandSource;

const ALL_STANDS_KEY: &str = "stand:all";
const SPECIES_STATISTICS_KEY: &str = "stand:statistics:species";
const HIGH_VALUE_PATTERN: &str = "stand:high-value:*";
const ALL_STAND_KEYS_PATTERN: &str = "stand:*";

pub(crate) fn stand_key(stand_id: i32) -> String {
    format!("stand:id:{}", stand_id)
}

/// Coordinates are rounded to 4 decimals (about 11 m) so nearby lookups from the
/// same spot share an entry.
pub(crate) fn nearby_key(lon: f64, lat: f64, radius_meters: i32) -> String {
    format!("stand:nearby:{:.4}:{:.4}:{}", lon, lat, radius_meters)
}

pub(crate) fn high_value_key(min_volume_per_ha: f64) -> String {
    format!("stand:high-value:{:.2}", min_volume_per_ha)
}

/// Stand reads served through the two-tier cache.
///
/// | Read | Key | Loading |
/// |---|---|---|
/// | by id | `stand:id:{id}` | coalesced, default TTL |
/// | all | `stand:all` | coalesced, default TTL |
/// | nearby | `stand:nearby:{lon}:{lat}:{radius}` | get then set, `stands.nearby` TTL |
/// | high value | `stand:high-value:{min}` | get then set, `stands.high_value` TTL |
/// | species statistics | `stand:statistics:species` | coalesced, `stands.statistics` TTL |
///
/// Cloning is cheap; clones share the cache and the source.
#[derive(Clone)]
pub struct StandCache {
    cache: TieredCache,
    source: Arc<dyn StandSource>,
    nearby_ttl: TtlPair,
    high_value_ttl: TtlPair,
    statistics_ttl: TtlPair,
}

impl StandCache {
    pub fn new(cache: TieredCache, source: Arc<dyn StandSource>, policy: &StandCacheConfig) -> Self {
        Self {
            cache,
            source,
            nearby_ttl: policy.nearby.ttl_pair(),
            high_value_ttl: policy.high_value.ttl_pair(),
            statistics_ttl: policy.statistics.ttl_pair(),
        }
    }

    /// Look up one stand. A missing stand is not cached, so it is re-queried next time.
    pub async fn stand_by_id(&self, stand_id: i32) -> AppResult<Option<Stand>> {
        let source = Arc::clone(&self.source);
        self.cache
            .get_or_load(&stand_key(stand_id), || async move {
                source.find_by_id(stand_id).await
            })
            .await
            .map_err(AppError::from)
    }

    pub async fn all_stands(&self) -> AppResult<Vec<Stand>> {
        let source = Arc::clone(&self.source);
        self.cache
            .get_or_load(ALL_STANDS_KEY, || async move { source.find_all().await })
            .await
            .map_err(AppError::from)
    }

    /// Stands within `radius_meters` of (`lon`, `lat`).
    ///
    /// Concurrent misses on the same key may each query the source.
    pub async fn nearby_stands(
        &self,
        lon: f64,
        lat: f64,
        radius_meters: i32,
    ) -> AppResult<Vec<Stand>> {
        let key = nearby_key(lon, lat, radius_meters);
        if let Some(stands) = self.cache.get::<Vec<Stand>>(&key).await {
            return Ok(stands);
        }

        let stands = self.source.find_nearby(lon, lat, radius_meters).await?;
        self.cache.set(&key, &stands, self.nearby_ttl).await;
        Ok(stands)
    }

    /// Stands whose volume per hectare exceeds `min_volume_per_ha`.
    ///
    /// Concurrent misses on the same key may each query the source.
    pub async fn high_value_stands(&self, min_volume_per_ha: f64) -> AppResult<Vec<Stand>> {
        let key = high_value_key(min_volume_per_ha);
        if let Some(stands) = self.cache.get::<Vec<Stand>>(&key).await {
            return Ok(stands);
        }

        let stands = self.source.find_high_value(min_volume_per_ha).await?;
        self.cache.set(&key, &stands, self.high_value_ttl).await;
        Ok(stands)
    }

    pub async fn species_statistics(&self) -> AppResult<Vec<SpeciesStatistics>> {
        let source = Arc::clone(&self.source);
        self.cache
            .get_or_load_with_ttl(SPECIES_STATISTICS_KEY, self.statistics_ttl, || async move {
                source.species_statistics().await
            })
            .await
            .map_err(AppError::from)
    }

    /// Drop every cached read that may include stand `stand_id`.
    ///
    /// Nearby results are left to expire on their own.
    pub async fn invalidate_stand(&self, stand_id: i32) {
        self.cache.delete(&stand_key(stand_id)).await;
        self.cache.delete(ALL_STANDS_KEY).await;
        self.cache.delete_by_pattern(HIGH_VALUE_PATTERN).await;
        tracing::info!(stand_id, "Invalidated cached stand reads");
    }

    pub async fn invalidate_all_stands(&self) {
        self.cache.delete_by_pattern(ALL_STAND_KEYS_PATTERN).await;
        tracing::info!("Invalidated all cached stand reads");
    }
}
