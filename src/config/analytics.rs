//! Settings for matrix analytics

use serde::{Deserialize, Serialize};

/// How stack harmony treats tool pairs with no compatibility record
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MissingPairPolicy {
    /// Count the pair as neutral (50)
    #[default]
    Neutral,
    /// Leave the pair out of the average
    Exclude,
    /// Count the pair as 0
    Zero,
}

/// Analytics configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AnalyticsConfig {
    #[serde(default)]
    pub missing_pairs: MissingPairPolicy,

    /// Number of hubs returned
    #[serde(default = "default_hub_limit")]
    pub hub_limit: usize,

    /// Scores at or above this count as high-score connections
    #[serde(default = "default_high_score")]
    pub high_score: u8,
}

fn default_hub_limit() -> usize {
    10
}

fn default_high_score() -> u8 {
    85
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            missing_pairs: MissingPairPolicy::default(),
            hub_limit: default_hub_limit(),
            high_score: default_high_score(),
        }
    }
}

impl AnalyticsConfig {
    /// Merge another config into this one (other wins when not default)
    ///
    /// A layer cannot reset a value to its default: `hub_limit = 10` over a
    /// lower layer's `hub_limit = 3` keeps 3.
    pub fn merge(&mut self, other: Self) {
        if other.missing_pairs != MissingPairPolicy::default() {
            self.missing_pairs = other.missing_pairs;
        }
        if other.hub_limit != default_hub_limit() {
            self.hub_limit = other.hub_limit;
        }
        if other.high_score != default_high_score() {
            self.high_score = other.high_score;
        }
    }
}
