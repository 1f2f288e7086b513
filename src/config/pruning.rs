//! Settings for catalog pruning and the quality filter

use serde::{Deserialize, Serialize};

/// Thresholds and patterns used when pruning the catalog
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PruningConfig {
    /// Descriptions shorter than this (in characters) fail the quality filter
    #[serde(default = "default_min_description_len")]
    pub min_description_len: usize,

    /// Tools must deviate from neutral by more than this on average to be kept
    #[serde(default = "default_min_avg_deviation")]
    pub min_avg_deviation: f64,

    /// Ranking bonus per listed feature
    #[serde(default = "default_feature_weight")]
    pub feature_weight: f64,

    /// Maximum number of tools retained
    #[serde(default = "default_max_connected")]
    pub max_connected: usize,

    /// Names that identify programming languages rather than tools
    #[serde(default)]
    pub language_names: Vec<String>,

    /// Substrings in name or description that mark resource collections
    #[serde(default)]
    pub resource_markers: Vec<String>,

    /// Phrases in the description that mark curated lists
    #[serde(default)]
    pub collection_phrases: Vec<String>,
}

fn default_min_description_len() -> usize {
    20
}

fn default_min_avg_deviation() -> f64 {
    5.0
}

fn default_feature_weight() -> f64 {
    2.0
}

fn default_max_connected() -> usize {
    50
}

impl Default for PruningConfig {
    fn default() -> Self {
        Self {
            min_description_len: default_min_description_len(),
            min_avg_deviation: default_min_avg_deviation(),
            feature_weight: default_feature_weight(),
            max_connected: default_max_connected(),
            language_names: to_strings(&[
                "JavaScript",
                "TypeScript",
                "Python",
                "Java",
                "C",
                "C++",
                "C#",
                "Go",
                "Rust",
                "Ruby",
                "PHP",
                "Swift",
                "Kotlin",
                "Scala",
                "Dart",
                "Elixir",
                "Haskell",
                "Lua",
                "Perl",
                "R",
                "Julia",
                "Clojure",
                "Erlang",
                "OCaml",
                "Zig",
                "Shell",
                "Bash",
                "SQL",
                "HTML",
                "CSS",
            ]),
            resource_markers: to_strings(&[
                "awesome-",
                "tutorial",
                "roadmap",
                "cheat-sheet",
                "cheatsheet",
                "interview",
                "free-programming-books",
            ]),
            collection_phrases: to_strings(&["collection of", "list of", "awesome list"]),
        }
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl PruningConfig {
    /// Merge another config into this one (other wins)
    ///
    /// Scalars are taken from `other` when they differ from the defaults;
    /// pattern lists are extended. A layer that sets a scalar back to its
    /// default therefore leaves the lower layer's value in place.
    pub fn merge(&mut self, other: Self) {
        if other.min_description_len != default_min_description_len() {
            self.min_description_len = other.min_description_len;
        }
        if other.min_avg_deviation != default_min_avg_deviation() {
            self.min_avg_deviation = other.min_avg_deviation;
        }
        if other.feature_weight != default_feature_weight() {
            self.feature_weight = other.feature_weight;
        }
        if other.max_connected != default_max_connected() {
            self.max_connected = other.max_connected;
        }

        extend_unique(&mut self.language_names, other.language_names);
        extend_unique(&mut self.resource_markers, other.resource_markers);
        extend_unique(&mut self.collection_phrases, other.collection_phrases);
    }
}

fn extend_unique(target: &mut Vec<String>, items: Vec<String>) {
    for item in items {
        if !target.iter().any(|t| t.eq_ignore_ascii_case(&item)) {
            target.push(item);
        }
    }
}
