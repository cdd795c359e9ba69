//! Stand catalog request handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::api::doc::STAND_TAG;
use crate::api::dto::{
    ErrorResponse, HighValueQuery, NearbyQuery, SpeciesStatisticsResponse, StandResponse,
};
use crate::api::extract::ValidatedQuery;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Creates stand routes, mounted under `/api/stands`.
pub fn stand_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(list_stands))
        .routes(routes!(nearby_stands))
        .routes(routes!(high_value_stands))
        .routes(routes!(species_statistics))
        .routes(routes!(evict_all_stands))
        .routes(routes!(get_stand))
        .routes(routes!(evict_stand))
}

/// GET /api/stands - List all stands
#[utoipa::path(
    get,
    path = "/",
    tag = STAND_TAG,
    responses(
        (status = 200, description = "All stands ordered by id", body = Vec<StandResponse>)
    )
)]
async fn list_stands(State(state): State<AppState>) -> AppResult<Json<Vec<StandResponse>>> {
    let stands = state.catalog.all_stands().await?;
    Ok(Json(stands.into_iter().map(StandResponse::from).collect()))
}

/// GET /api/stands/{id} - Get stand by ID
#[utoipa::path(
    get,
    path = "/{id}",
    tag = STAND_TAG,
    params(
        ("id" = i32, Path, description = "Stand ID")
    ),
    responses(
        (status = 200, description = "Stand found", body = StandResponse),
        (status = 404, description = "Stand not found", body = ErrorResponse)
    )
)]
async fn get_stand(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<StandResponse>> {
    state
        .catalog
        .stand_by_id(id)
        .await?
        .map(|stand| Json(StandResponse::from(stand)))
        .ok_or_else(|| AppError::not_found("stand", "id", id))
}

/// GET /api/stands/nearby - Stands within a radius of a point, nearest first
#[utoipa::path(
    get,
    path = "/nearby",
    tag = STAND_TAG,
    params(NearbyQuery),
    responses(
        (status = 200, description = "Stands within the radius", body = Vec<StandResponse>),
        (status = 400, description = "Invalid coordinates or radius", body = ErrorResponse)
    )
)]
async fn nearby_stands(
    State(state): State<AppState>,
    ValidatedQuery(query): ValidatedQuery<NearbyQuery>,
) -> AppResult<Json<Vec<StandResponse>>> {
    let stands = state
        .catalog
        .nearby_stands(query.lon, query.lat, query.radius_meters)
        .await?;
    Ok(Json(stands.into_iter().map(StandResponse::from).collect()))
}

/// GET /api/stands/high-value - Stands above a volume-per-hectare threshold
#[utoipa::path(
    get,
    path = "/high-value",
    tag = STAND_TAG,
    params(HighValueQuery),
    responses(
        (status = 200, description = "Stands ordered by volume per hectare, largest first", body = Vec<StandResponse>),
        (status = 400, description = "Invalid threshold", body = ErrorResponse)
    )
)]
async fn high_value_stands(
    State(state): State<AppState>,
    ValidatedQuery(query): ValidatedQuery<HighValueQuery>,
) -> AppResult<Json<Vec<StandResponse>>> {
    let stands = state
        .catalog
        .high_value_stands(query.min_volume_per_ha)
        .await?;
    Ok(Json(stands.into_iter().map(StandResponse::from).collect()))
}

/// GET /api/stands/statistics/species - Per-species aggregates
#[utoipa::path(
    get,
    path = "/statistics/species",
    tag = STAND_TAG,
    responses(
        (status = 200, description = "One row per dominant species", body = Vec<SpeciesStatisticsResponse>)
    )
)]
async fn species_statistics(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<SpeciesStatisticsResponse>>> {
    let stats = state.catalog.species_statistics().await?;
    Ok(Json(
        stats
            .into_iter()
            .map(SpeciesStatisticsResponse::from)
            .collect(),
    ))
}

/// DELETE /api/stands/{id}/cache - Evict cached reads that include one stand
#[utoipa::path(
    delete,
    path = "/{id}/cache",
    tag = STAND_TAG,
    params(
        ("id" = i32, Path, description = "Stand ID")
    ),
    responses(
        (status = 204, description = "Cache entries evicted")
    )
)]
async fn evict_stand(State(state): State<AppState>, Path(id): Path<i32>) -> StatusCode {
    state.catalog.invalidate_stand(id).await;
    StatusCode::NO_CONTENT
}

/// DELETE /api/stands/cache - Evict every cached stand read
#[utoipa::path(
    delete,
    path = "/cache",
    tag = STAND_TAG,
    responses(
        (status = 204, description = "Cache entries evicted")
    )
)]
async fn evict_all_stands(State(state): State<AppState>) -> StatusCode {
    state.catalog.invalidate_all_stands().await;
    StatusCode::NO_CONTENT
}
