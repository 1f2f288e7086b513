//! Tool catalog - persistent storage for tools, categories and compatibilities

mod import;
mod model;
mod query;
mod schema;
mod store;

pub use import::{ImportSummary, import_seed, load_seed_file};
pub use model::{
    Category, Compatibility, CompatibilityMatrix, Difficulty, Tool, ToolId, canonical_pair,
};
#[cfg(test)]
pub use model::ToolDraft;
pub use query::{
    CatalogStats, ToolQuery, catalog_stats, category_names, display_category, search_tools,
};
pub use store::{CatalogStore, SqliteCatalog};
