use diesel::result::{DatabaseErrorKind, Error as DieselError};

use crate::error::AppError;

/// Converts Diesel errors into [`AppError`] variants.
///
/// The stand queries are read-only, so constraint violations are not expected; the
/// cases that matter are "no row", a failed statement, and a dropped connection.
pub struct DatabaseErrorConverter;

impl DatabaseErrorConverter {
    /// Convert `error`, tagging it with the `operation` that failed.
    pub fn convert_diesel_error(error: DieselError, operation: &str) -> AppError {
        match error {
            DieselError::NotFound => AppError::NotFound {
                entity: "resource".to_string(),
                field: "id".to_string(),
                value: "unknown".to_string(),
            },
            DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, info) => {
                AppError::ConnectionPool {
                    source: anyhow::Error::msg(format!(
                        "Connection closed during {}: {}",
                        operation,
                        info.message()
                    )),
                }
            }
            DieselError::DatabaseError(kind, info) => AppError::Database {
                operation: operation.to_string(),
                source: anyhow::Error::msg(format!("{:?}: {}", kind, info.message())),
            },
            other => AppError::Database {
                operation: operation.to_string(),
                source: anyhow::Error::from(other),
            },
        }
    }
}
