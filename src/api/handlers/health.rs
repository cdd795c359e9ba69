//! Health check endpoint handlers.
//!
//! The database is a critical dependency: if it is down the service reports
//! `unhealthy`. The distributed cache is not, since reads fall back to the local
//! tier and the database, so a failing Redis only makes the service `degraded`.

use std::collections::HashMap;
use std::time::Instant;

use axum::{extract::State, http::StatusCode, response::Json};
use diesel_async::RunQueryDsl;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::api::doc::HEALTH_TAG;
use crate::api::dto::{ComponentHealth, HealthResponse, HealthStatus};
use crate::state::AppState;

/// Creates health check routes.
///
/// # Routes
/// - `GET /health` - Component health report
/// - `GET /health/ready` - Readiness probe
/// - `GET /health/live` - Liveness probe
pub fn health_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(health_check))
        .routes(routes!(readiness_check))
        .routes(routes!(liveness_check))
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy or degraded", body = HealthResponse),
        (status = 503, description = "Service is unhealthy", body = HealthResponse)
    ),
    tag = HEALTH_TAG
)]
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database = check_database(&state).await;
    let cache = check_cache(&state).await;
    let status = database.status.worst(cache.status);

    let mut checks = HashMap::new();
    checks.insert("database".to_string(), database);
    checks.insert("cache".to_string(), cache);

    let response = HealthResponse {
        status,
        version: crate::pkg_version().to_string(),
        timestamp: jiff::Timestamp::now().to_string(),
        checks,
    };

    let code = match status {
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
    };
    (code, Json(response))
}

/// Readiness probe: ready once the database answers.
#[utoipa::path(
    get,
    path = "/health/ready",
    responses(
        (status = 200, description = "Service is ready"),
        (status = 503, description = "Service is not ready")
    ),
    tag = HEALTH_TAG
)]
pub async fn readiness_check(State(state): State<AppState>) -> StatusCode {
    match check_database(&state).await.status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Degraded | HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// Liveness probe. Does not touch any dependency.
#[utoipa::path(
    get,
    path = "/health/live",
    responses(
        (status = 200, description = "Service is alive")
    ),
    tag = HEALTH_TAG
)]
pub async fn liveness_check() -> StatusCode {
    StatusCode::OK
}

async fn check_database(state: &AppState) -> ComponentHealth {
    let started = Instant::now();

    let result = match state.db_pool.get().await {
        Ok(mut conn) => diesel::sql_query("SELECT 1")
            .execute(&mut conn)
            .await
            .map(|_| "Connected".to_string())
            .map_err(|e| format!("Query failed: {}", e)),
        Err(e) => Err(format!("Connection failed: {}", e)),
    };

    component(result, HealthStatus::Unhealthy, started)
}

async fn check_cache(state: &AppState) -> ComponentHealth {
    let started = Instant::now();
    let local_entries = state.cache.local_entry_count();

    let result = state
        .cache
        .ping_distributed()
        .await
        .map(|()| {
            format!(
                "{} reachable, {} local entries",
                state.cache.distributed_tier(),
                local_entries
            )
        })
        .map_err(|e| format!("{} unavailable: {}", state.cache.distributed_tier(), e));

    component(result, HealthStatus::Degraded, started)
}

fn component(
    result: Result<String, String>,
    failure: HealthStatus,
    started: Instant,
) -> ComponentHealth {
    let (status, message) = match result {
        Ok(message) => (HealthStatus::Healthy, message),
        Err(message) => (failure, message),
    };
    ComponentHealth {
        status,
        message: Some(message),
        response_time_ms: Some(started.elapsed().as_millis() as u64),
    }
}
