mod stand;

pub use stand::{SpeciesStatistics, Stand};
