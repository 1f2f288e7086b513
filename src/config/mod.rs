//! Configuration types and loading for toolmatrix

mod analytics;
mod error;
mod loader;
mod pruning;
mod scoring;

pub use analytics::{AnalyticsConfig, MissingPairPolicy};
pub use error::ConfigError;
pub use loader::ToolmatrixConfig;
pub use pruning::PruningConfig;
pub use scoring::ScoringRules;
