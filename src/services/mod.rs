//! Service layer for the stand catalog.
//!
//! Services sit between the HTTP handlers and the repositories; here that means the
//! caching policy and the logging decorator around it.

mod stand_cache;
mod stand_catalog;

pub use stand_cache::StandCache;
pub use stand_catalog::{LoggedCatalog, StandCatalog};
