//! Data Transfer Objects for API requests and responses.
//!
//! DTOs are organized by domain:
//! - `stand` - Stand catalog responses and query parameters
//! - `health` - Health check responses
//! - `error` - Common error response DTOs

mod error;
mod health;
mod stand;

pub use error::ErrorResponse;
pub use health::{ComponentHealth, HealthResponse, HealthStatus};
pub use stand::{HighValueQuery, NearbyQuery, SpeciesStatisticsResponse, StandResponse};
