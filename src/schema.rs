// Columns read by the stand catalog. The `geom` column is only used from raw
// PostGIS queries and is not declared here.

diesel::table! {
    forest_stand (stand_id) {
        stand_id -> Int4,
        xiao_ban_code -> Nullable<Varchar>,
        stand_name -> Nullable<Varchar>,
        area_ha -> Nullable<Float8>,
        dominant_species -> Nullable<Varchar>,
        stand_age -> Nullable<Int4>,
        volume_per_ha -> Nullable<Float8>,
        total_volume -> Nullable<Float8>,
        canopy_density -> Nullable<Float8>,
        center_lon -> Nullable<Float8>,
        center_lat -> Nullable<Float8>,
        origin -> Nullable<Varchar>,
    }
}
