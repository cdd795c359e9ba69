//! Error handler for converting AppError to HTTP responses.
//!
//! Error bodies are [`ErrorResponse`] JSON. Internal details (SQL messages, source
//! chains) are logged, never returned to the client.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::api::dto::ErrorResponse;
use crate::error::AppError;

/// Maps an AppError variant to its HTTP status code.
pub fn error_status(error: &AppError) -> StatusCode {
    match error.root() {
        AppError::NotFound { .. } => StatusCode::NOT_FOUND,
        AppError::Validation { .. } | AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        AppError::ConnectionPool { .. } => StatusCode::SERVICE_UNAVAILABLE,
        AppError::Database { .. }
        | AppError::Configuration { .. }
        | AppError::Internal { .. }
        | AppError::Shared(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Maps an AppError variant to its error code string.
pub fn error_code(error: &AppError) -> &'static str {
    match error.root() {
        AppError::NotFound { .. } => "NOT_FOUND",
        AppError::Validation { .. } => "VALIDATION_ERROR",
        AppError::BadRequest { .. } => "BAD_REQUEST",
        AppError::Database { .. } => "DATABASE_ERROR",
        AppError::ConnectionPool { .. } => "SERVICE_UNAVAILABLE",
        AppError::Configuration { .. } => "CONFIGURATION_ERROR",
        AppError::Internal { .. } | AppError::Shared(_) => "INTERNAL_ERROR",
    }
}

fn error_body(error: &AppError) -> ErrorResponse {
    let code = error_code(error);
    match error.root() {
        AppError::NotFound {
            entity,
            field,
            value,
        } => ErrorResponse::new(
            code,
            format!("{} with {}={} was not found", entity, field, value),
        )
        .with_details(json!({ "entity": entity, "field": field, "value": value })),
        AppError::Validation { field, reason } => {
            ErrorResponse::new(code, format!("Invalid value for {}: {}", field, reason))
                .with_details(json!({ "field": field, "reason": reason }))
        }
        AppError::BadRequest { message } => ErrorResponse::new(code, message.as_str()),
        AppError::Database { operation, .. } => {
            ErrorResponse::new(code, format!("Database operation failed: {}", operation))
                .with_details(json!({ "operation": operation }))
        }
        AppError::ConnectionPool { .. } => {
            ErrorResponse::new(code, "Database connection unavailable")
        }
        AppError::Configuration { key, .. } => {
            ErrorResponse::new(code, format!("Configuration error: {}", key))
        }
        AppError::Internal { .. } | AppError::Shared(_) => {
            ErrorResponse::new(code, "An internal error occurred")
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = error_status(&self);
        if status.is_server_error() {
            tracing::error!(error = ?self.root(), "Request failed");
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }

        let body = error_body(&self);
        let mut response = (status, Json(body.clone())).into_response();
        // Picked up by the request ID middleware to fill `requestId`.
        response.extensions_mut().insert(body);
        response
    }
}

/// Re-renders an error body produced by [`AppError::into_response`] with
/// `request_id` filled in. Other responses pass through untouched.
pub(super) fn attach_request_id(mut response: Response, request_id: &str) -> Response {
    match response.extensions_mut().remove::<ErrorResponse>() {
        Some(body) => (response.status(), Json(body.with_request_id(request_id))).into_response(),
        None => response,
    }
}
