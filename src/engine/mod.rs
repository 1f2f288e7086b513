//! Compatibility engine: scoring, quality filtering, pruning and analytics

mod analytics;
mod error;
mod pruner;
mod quality;
mod scorer;

pub use analytics::{
    Analytics, CategoryPairStats, HubQuery, HubSort, RecommendationStrength, ToolHub, difficulty,
    recommendation_strength,
};
pub use error::PruneError;
pub use pruner::{CatalogPruner, RegenerateSummary};
pub use scorer::Scorer;
