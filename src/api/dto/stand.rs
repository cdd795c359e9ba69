//! Stand catalog DTOs.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

use crate::models::{SpeciesStatistics, Stand};

/// Stand response DTO.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StandResponse {
    #[schema(example = 7)]
    pub stand_id: i32,
    /// Sub-compartment code
    #[schema(example = "XB-0007")]
    pub xiao_ban_code: Option<String>,
    pub stand_name: Option<String>,
    /// Area in hectares
    pub area_ha: Option<f64>,
    #[schema(example = "Larix gmelinii")]
    pub dominant_species: Option<String>,
    /// Age in years
    pub stand_age: Option<i32>,
    /// Growing stock in m³ per hectare
    pub volume_per_ha: Option<f64>,
    /// Growing stock in m³
    pub total_volume: Option<f64>,
    pub canopy_density: Option<f64>,
    pub center_lon: Option<f64>,
    pub center_lat: Option<f64>,
    pub origin: Option<String>,
}

impl From<Stand> for StandResponse {
    fn from(stand: Stand) -> Self {
        Self {
            stand_id: stand.stand_id,
            xiao_ban_code: stand.xiao_ban_code,
            stand_name: stand.stand_name,
            area_ha: stand.area_ha,
            dominant_species: stand.dominant_species,
            stand_age: stand.stand_age,
            volume_per_ha: stand.volume_per_ha,
            total_volume: stand.total_volume,
            canopy_density: stand.canopy_density,
            center_lon: stand.center_lon,
            center_lat: stand.center_lat,
            origin: stand.origin,
        }
    }
}

/// Aggregates for one dominant species.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SpeciesStatisticsResponse {
    /// `null` for stands without a recorded species
    pub species: Option<String>,
    pub stand_count: i64,
    pub total_area: f64,
    pub total_volume: f64,
    pub avg_volume_per_ha: f64,
}

impl From<SpeciesStatistics> for SpeciesStatisticsResponse {
    fn from(stats: SpeciesStatistics) -> Self {
        Self {
            species: stats.species,
            stand_count: stats.stand_count,
            total_area: stats.total_area,
            total_volume: stats.total_volume,
            avg_volume_per_ha: stats.avg_volume_per_ha,
        }
    }
}

fn default_radius_meters() -> i32 {
    45_000
}

fn default_min_volume_per_ha() -> f64 {
    120.0
}

/// Rejects NaN and infinities, which every `range` bound lets through.
fn finite(value: f64) -> Result<(), ValidationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ValidationError::new("finite").with_message("must be a finite number".into()))
    }
}

/// Query parameters for the radius search.
#[derive(Debug, Clone, Deserialize, Validate, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct NearbyQuery {
    /// Longitude in WGS84 degrees
    #[validate(
        custom(function = "finite"),
        range(min = -180.0, max = 180.0, message = "must be between -180 and 180")
    )]
    pub lon: f64,

    /// Latitude in WGS84 degrees
    #[validate(
        custom(function = "finite"),
        range(min = -90.0, max = 90.0, message = "must be between -90 and 90")
    )]
    pub lat: f64,

    /// Search radius in meters
    #[serde(default = "default_radius_meters")]
    #[param(default = 45000)]
    #[validate(range(min = 1, max = 500000, message = "must be between 1 and 500000"))]
    pub radius_meters: i32,
}

/// Query parameters for the high-value listing.
#[derive(Debug, Clone, Deserialize, Validate, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct HighValueQuery {
    /// Exclusive lower bound on volume per hectare
    #[serde(default = "default_min_volume_per_ha")]
    #[param(default = 120.0)]
    #[validate(
        custom(function = "finite"),
        range(min = 0.0, message = "must not be negative")
    )]
    pub min_volume_per_ha: f64,
}
