use diesel::prelude::*;
use diesel::sql_types::{BigInt, Double, Nullable, Text};
use serde::{Deserialize, Serialize};

/// Forest stand (sub-compartment) record.
///
/// Derives Queryable/Selectable for DSL queries and QueryableByName for the raw
/// PostGIS queries, which must select the same column names.
#[derive(Debug, Clone, PartialEq, Queryable, Selectable, QueryableByName, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::forest_stand)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Stand {
    pub stand_id: i32,
    pub xiao_ban_code: Option<String>,
    pub stand_name: Option<String>,
    pub area_ha: Option<f64>,
    pub dominant_species: Option<String>,
    pub stand_age: Option<i32>,
    pub volume_per_ha: Option<f64>,
    pub total_volume: Option<f64>,
    pub canopy_density: Option<f64>,
    pub center_lon: Option<f64>,
    pub center_lat: Option<f64>,
    pub origin: Option<String>,
}

/// Per-species aggregate over all stands
#[derive(Debug, Clone, PartialEq, QueryableByName, Serialize, Deserialize)]
pub struct SpeciesStatistics {
    /// `None` groups stands without a recorded dominant species
    #[diesel(sql_type = Nullable<Text>)]
    pub species: Option<String>,
    #[diesel(sql_type = BigInt)]
    pub stand_count: i64,
    #[diesel(sql_type = Double)]
    pub total_area: f64,
    #[diesel(sql_type = Double)]
    pub total_volume: f64,
    #[diesel(sql_type = Double)]
    pub avg_volume_per_ha: f64,
}
