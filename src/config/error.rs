//! Configuration validation errors

use thiserror::Error;

/// Problems found while validating a loaded configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{table}: key '{key}' must have the form 'left:right'")]
    MalformedPairKey { table: String, key: String },

    #[error("{table}: score {score} for '{key}' is above 100")]
    ScoreOutOfRange { table: String, key: String, score: u8 },

    #[error("{table}: '{key}' and '{reversed}' disagree; pairs are unordered")]
    ConflictingPair {
        table: String,
        key: String,
        reversed: String,
    },

    #[error("pruning: {field} must be {expected}")]
    InvalidThreshold { field: String, expected: String },
}
