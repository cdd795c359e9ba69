//! The stand catalog as seen by request handlers.
//!
//! [`StandCatalog`] is implemented by [`StandCache`]; [`LoggedCatalog`] wraps any
//! implementation and records one tracing event per call.

use std::time::Instant;

use async_trait::async_trait;

use crate::error::AppResult;
use crate::models::{SpeciesStatistics, Stand};
use crate::services::StandCache;

#[async_trait]
pub trait StandCatalog: Send + Sync {
    async fn stand_by_id(&self, stand_id: i32) -> AppResult<Option<Stand>>;

    async fn all_stands(&self) -> AppResult<Vec<Stand>>;

    async fn nearby_stands(&self, lon: f64, lat: f64, radius_meters: i32)
    -> AppResult<Vec<Stand>>;

    async fn high_value_stands(&self, min_volume_per_ha: f64) -> AppResult<Vec<Stand>>;

    async fn species_statistics(&self) -> AppResult<Vec<SpeciesStatistics>>;

    async fn invalidate_stand(&self, stand_id: i32);

    async fn invalidate_all_stands(&self);
}

#[async_trait]
impl StandCatalog for StandCache {
    async fn stand_by_id(&self, stand_id: i32) -> AppResult<Option<Stand>> {
        StandCache::stand_by_id(self, stand_id).await
    }

    async fn all_stands(&self) -> AppResult<Vec<Stand>> {
        StandCache::all_stands(self).await
    }

    async fn nearby_stands(
        &self,
        lon: f64,
        lat: f64,
        radius_meters: i32,
    ) -> AppResult<Vec<Stand>> {
        StandCache::nearby_stands(self, lon, lat, radius_meters).await
    }

    async fn high_value_stands(&self, min_volume_per_ha: f64) -> AppResult<Vec<Stand>> {
        StandCache::high_value_stands(self, min_volume_per_ha).await
    }

    async fn species_statistics(&self) -> AppResult<Vec<SpeciesStatistics>> {
        StandCache::species_statistics(self).await
    }

    async fn invalidate_stand(&self, stand_id: i32) {
        StandCache::invalidate_stand(self, stand_id).await
    }

    async fn invalidate_all_stands(&self) {
        StandCache::invalidate_all_stands(self).await
    }
}

/// Logs every catalog call with its parameters, duration and outcome.
///
/// Failures are logged at `warn`, everything else at `debug`.
pub struct LoggedCatalog<C> {
    inner: C,
}

impl<C: StandCatalog> LoggedCatalog<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }
}

fn log_outcome<T>(operation: &str, params: &str, started: Instant, result: &AppResult<T>) {
    let elapsed_ms = started.elapsed().as_millis() as u64;
    match result {
        Ok(_) => tracing::debug!(
            operation,
            params,
            elapsed_ms,
            outcome = "ok",
            "Stand catalog call completed"
        ),
        Err(e) => tracing::warn!(
            operation,
            params,
            elapsed_ms,
            outcome = "error",
            error = %e,
            "Stand catalog call failed"
        ),
    }
}

#[async_trait]
impl<C: StandCatalog> StandCatalog for LoggedCatalog<C> {
    async fn stand_by_id(&self, stand_id: i32) -> AppResult<Option<Stand>> {
        let started = Instant::now();
        let result = self.inner.stand_by_id(stand_id).await;
        log_outcome(
            "stand_by_id",
            &format!("stand_id={}", stand_id),
            started,
            &result,
        );
        result
    }

    async fn all_stands(&self) -> AppResult<Vec<Stand>> {
        let started = Instant::now();
        let result = self.inner.all_stands().await;
        log_outcome("all_stands", "", started, &result);
        result
    }

    async fn nearby_stands(
        &self,
        lon: f64,
        lat: f64,
        radius_meters: i32,
    ) -> AppResult<Vec<Stand>> {
        let started = Instant::now();
        let result = self.inner.nearby_stands(lon, lat, radius_meters).await;
        log_outcome(
            "nearby_stands",
            &format!("lon={} lat={} radius_meters={}", lon, lat, radius_meters),
            started,
            &result,
        );
        result
    }

    async fn high_value_stands(&self, min_volume_per_ha: f64) -> AppResult<Vec<Stand>> {
        let started = Instant::now();
        let result = self.inner.high_value_stands(min_volume_per_ha).await;
        log_outcome(
            "high_value_stands",
            &format!("min_volume_per_ha={}", min_volume_per_ha),
            started,
            &result,
        );
        result
    }

    async fn species_statistics(&self) -> AppResult<Vec<SpeciesStatistics>> {
        let started = Instant::now();
        let result = self.inner.species_statistics().await;
        log_outcome("species_statistics", "", started, &result);
        result
    }

    async fn invalidate_stand(&self, stand_id: i32) {
        let started = Instant::now();
        self.inner.invalidate_stand(stand_id).await;
        log_outcome(
            "invalidate_stand",
            &format!("stand_id={}", stand_id),
            started,
            &Ok(()),
        );
    }

    async fn invalidate_all_stands(&self) {
        let started = Instant::now();
        self.inner.invalidate_all_stands().await;
        log_outcome("invalidate_all_stands", "", started, &Ok(()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::error::AppError;

    #[derive(Default)]
    struct RecordingCatalog {
        calls: Mutex<Vec<String>>,
    }

    impl RecordingCatalog {
        fn record(&self, call: impl Into<String>) {
            self.calls.lock().unwrap().push(call.into());
        }
    }

    #[async_trait]
    impl StandCatalog for RecordingCatalog {
        async fn stand_by_id(&self, stand_id: i32) -> AppResult<Option<Stand>> {
            self.record(format!("stand_by_id:{}", stand_id));
            Ok(None)
        }

        async fn all_stands(&self) -> AppResult<Vec<Stand>> {
            self.record("all_stands");
            Err(AppError::Internal {
                source: anyhow::anyhow!("boom"),
            })
        }

        async fn nearby_stands(&self, lon: f64, lat: f64, radius: i32) -> AppResult<Vec<Stand>> {
            self.record(format!("nearby_stands:{}:{}:{}", lon, lat, radius));
            Ok(Vec::new())
        }

        async fn high_value_stands(&self, min_volume_per_ha: f64) -> AppResult<Vec<Stand>> {
            self.record(format!("high_value_stands:{}", min_volume_per_ha));
            Ok(Vec::new())
        }

        async fn species_statistics(&self) -> AppResult<Vec<SpeciesStatistics>> {
            self.record("species_statistics");
            Ok(Vec::new())
        }

        async fn invalidate_stand(&self, stand_id: i32) {
            self.record(format!("invalidate_stand:{}", stand_id));
        }

        async fn invalidate_all_stands(&self) {
            self.record("invalidate_all_stands");
        }
    }

    #[tokio::test]
    async fn test_logged_catalog_delegates_and_passes_results_through() {
        let catalog = LoggedCatalog::new(RecordingCatalog::default());

        assert_eq!(catalog.stand_by_id(3).await.unwrap(), None);
        assert!(catalog.all_stands().await.is_err());
        assert!(catalog.nearby_stands(116.5, 39.5, 500).await.unwrap().is_empty());
        assert!(catalog.high_value_stands(80.0).await.unwrap().is_empty());
        assert!(catalog.species_statistics().await.unwrap().is_empty());
        catalog.invalidate_stand(3).await;
        catalog.invalidate_all_stands().await;

        let calls = catalog.inner().calls.lock().unwrap().clone();
        assert_eq!(
            calls,
            vec![
                "stand_by_id:3",
                "all_stands",
                "nearby_stands:116.5:39.5:500",
                "high_value_stands:80",
                "species_statistics",
                "invalidate_stand:3",
                "invalidate_all_stands",
            ]
        );
    }
}
