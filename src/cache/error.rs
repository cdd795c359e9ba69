//! Cache error types.

use std::time::Duration;

use thiserror::Error;

/// Errors raised by a cache tier.
///
/// None of these reach callers of [`TieredCache`](crate::cache::TieredCache):
/// the tiered cache logs them and degrades to a miss (reads) or a no-op (writes).
#[derive(Error, Debug)]
pub enum CacheError {
    /// The distributed tier could not be reached or rejected the command.
    #[error("Distributed cache unavailable: {0}")]
    Unavailable(String),

    /// The distributed tier did not answer within the configured command timeout.
    #[error("Distributed cache command timed out after {0:?}")]
    Timeout(Duration),

    /// A stored value could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for CacheError {
    fn from(error: serde_json::Error) -> Self {
        CacheError::Serialization(error.to_string())
    }
}
