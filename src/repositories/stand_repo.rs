//! Stand repository for async database operations.
//!
//! Plain lookups go through the Diesel DSL; the radius search and the species
//! aggregate are raw SQL because they rely on PostGIS and GROUP BY projections.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::sql_types::{Double, Integer};
use diesel_async::RunQueryDsl;

use crate::db::AsyncDbPool;
use crate::error::{AppResult, DatabaseErrorConverter};
use crate::models::{SpeciesStatistics, Stand};

/// Column list shared by raw stand queries, matching [`Stand`]'s field names.
const STAND_COLUMNS: &str = "fs.stand_id, fs.xiao_ban_code, fs.stand_name, \
     fs.area_ha::float8 AS area_ha, fs.dominant_species, fs.stand_age, \
     fs.volume_per_ha::float8 AS volume_per_ha, fs.total_volume::float8 AS total_volume, \
     fs.canopy_density::float8 AS canopy_density, fs.center_lon::float8 AS center_lon, \
     fs.center_lat::float8 AS center_lat, fs.origin";

/// Read access to stand records.
///
/// The stand cache depends on this trait rather than on [`StandRepository`] so that
/// any backend (or a test double) can feed it.
#[async_trait]
pub trait StandSource: Send + Sync {
    async fn find_by_id(&self, stand_id: i32) -> AppResult<Option<Stand>>;

    async fn find_all(&self) -> AppResult<Vec<Stand>>;

    /// Stands whose geometry lies within `radius_meters` of the point, nearest first.
    async fn find_nearby(&self, lon: f64, lat: f64, radius_meters: i32) -> AppResult<Vec<Stand>>;

    /// Stands with `volume_per_ha` strictly above `min_volume_per_ha`, largest first.
    async fn find_high_value(&self, min_volume_per_ha: f64) -> AppResult<Vec<Stand>>;

    async fn species_statistics(&self) -> AppResult<Vec<SpeciesStatistics>>;
}

/// PostGIS-backed stand repository.
///
/// Since `AsyncDbPool` (bb8::Pool) internally uses `Arc`, cloning is cheap.
#[derive(Clone)]
pub struct StandRepository {
    pool: AsyncDbPool,
}

impl StandRepository {
    pub fn new(pool: AsyncDbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StandSource for StandRepository {
    async fn find_by_id(&self, id: i32) -> AppResult<Option<Stand>> {
        use crate::schema::forest_stand::dsl::*;
        let mut conn = self.pool.get().await?;

        forest_stand
            .filter(stand_id.eq(id))
            .select(Stand::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(|e| DatabaseErrorConverter::convert_diesel_error(e, "find stand by id"))
    }

    async fn find_all(&self) -> AppResult<Vec<Stand>> {
        use crate::schema::forest_stand::dsl::*;
        let mut conn = self.pool.get().await?;

        forest_stand
            .order(stand_id.asc())
            .select(Stand::as_select())
            .load(&mut conn)
            .await
            .map_err(|e| DatabaseErrorConverter::convert_diesel_error(e, "list stands"))
    }

    async fn find_nearby(&self, lon: f64, lat: f64, radius_meters: i32) -> AppResult<Vec<Stand>> {
        let mut conn = self.pool.get().await?;

        let query = format!(
            "SELECT {STAND_COLUMNS} FROM forest_stand fs \
             WHERE ST_DWithin(fs.geom::geography, \
                   ST_SetSRID(ST_MakePoint($1, $2), 4326)::geography, $3) \
             ORDER BY ST_Distance(fs.geom::geography, \
                   ST_SetSRID(ST_MakePoint($1, $2), 4326)::geography)"
        );

        diesel::sql_query(query)
            .bind::<Double, _>(lon)
            .bind::<Double, _>(lat)
            .bind::<Integer, _>(radius_meters)
            .load::<Stand>(&mut conn)
            .await
            .map_err(|e| DatabaseErrorConverter::convert_diesel_error(e, "find nearby stands"))
    }

    async fn find_high_value(&self, min_volume_per_ha: f64) -> AppResult<Vec<Stand>> {
        use crate::schema::forest_stand::dsl::*;
        let mut conn = self.pool.get().await?;

        forest_stand
            .filter(volume_per_ha.gt(min_volume_per_ha))
            .order(volume_per_ha.desc())
            .select(Stand::as_select())
            .load(&mut conn)
            .await
            .map_err(|e| DatabaseErrorConverter::convert_diesel_error(e, "find high-value stands"))
    }

    async fn species_statistics(&self) -> AppResult<Vec<SpeciesStatistics>> {
        let mut conn = self.pool.get().await?;

        diesel::sql_query(
            "SELECT dominant_species AS species, \
                    COUNT(*) AS stand_count, \
                    COALESCE(SUM(area_ha), 0)::float8 AS total_area, \
                    COALESCE(SUM(total_volume), 0)::float8 AS total_volume, \
                    COALESCE(AVG(volume_per_ha), 0)::float8 AS avg_volume_per_ha \
             FROM forest_stand \
             GROUP BY dominant_species \
             ORDER BY stand_count DESC, species",
        )
        .load::<SpeciesStatistics>(&mut conn)
        .await
        .map_err(|e| DatabaseErrorConverter::convert_diesel_error(e, "species statistics"))
    }
}
