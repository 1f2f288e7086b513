//! Error types for the compatibility engine

use thiserror::Error;

/// Fatal failures of a regeneration run
///
/// Per-pair and per-tool failures are not errors: they are logged and counted
/// in the run summary.
#[derive(Debug, Error)]
pub enum PruneError {
    #[error("regeneration already in progress")]
    Busy,

    #[error("failed to read catalog: {message}")]
    CatalogRead { message: String },

    #[error("failed to persist compatibility matrix: {message}")]
    Persist { message: String },

    #[error("invalid quality filter pattern: {0}")]
    InvalidFilter(#[from] regex::Error),
}

impl PruneError {
    pub fn catalog_read(err: &anyhow::Error) -> Self {
        PruneError::CatalogRead {
            message: format!("{:#}", err),
        }
    }

    pub fn persist(err: &anyhow::Error) -> Self {
        PruneError::Persist {
            message: format!("{:#}", err),
        }
    }
}
