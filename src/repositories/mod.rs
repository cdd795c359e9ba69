//! Repository layer for data access operations.

mod stand_repo;

pub use stand_repo::{StandRepository, StandSource};
