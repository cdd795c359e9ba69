use utoipa::OpenApi;

pub const STAND_TAG: &str = "Stands";
pub const HEALTH_TAG: &str = "Health";

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Forest Inventory",
        description = "Forest stand catalog served through a two-tier cache",
    ),
    components(schemas(crate::api::dto::ErrorResponse)),
    tags(
        (name = STAND_TAG, description = "Stand catalog and cache invalidation endpoints"),
        (name = HEALTH_TAG, description = "Health check endpoints"),
    )
)]
pub struct ApiDoc;
