//! Catalog record types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Row id of a tool in the catalog
pub type ToolId = i64;

/// A developer tool in the catalog
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub id: ToolId,
    pub name: String,
    pub description: Option<String>,
    pub category_id: String,
    pub url: Option<String>,
    pub languages: Vec<String>,
    pub frameworks: Vec<String>,
    pub features: Vec<String>,
    pub integrations: Vec<String>,
    pub strengths: Vec<String>,
    pub limitations: Vec<String>,
    /// 1-10
    pub maturity_score: Option<u8>,
    /// 1-10
    pub popularity_score: Option<u8>,
    pub pricing: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Field values for creating or replacing a tool
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ToolDraft {
    pub name: String,
    pub description: Option<String>,
    pub category_id: String,
    pub url: Option<String>,
    pub languages: Vec<String>,
    pub frameworks: Vec<String>,
    pub features: Vec<String>,
    pub integrations: Vec<String>,
    pub strengths: Vec<String>,
    pub limitations: Vec<String>,
    pub maturity_score: Option<u8>,
    pub popularity_score: Option<u8>,
    pub pricing: Option<String>,
}

#[cfg(test)]
impl ToolDraft {
    pub fn new(name: impl Into<String>, category_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category_id: category_id.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_languages(mut self, languages: &[&str]) -> Self {
        self.languages = languages.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_frameworks(mut self, frameworks: &[&str]) -> Self {
        self.frameworks = frameworks.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_features(mut self, features: &[&str]) -> Self {
        self.features = features.iter().map(|s| s.to_string()).collect();
        self
    }
}

/// A tool category
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Category {
    pub id: String,
    pub name: String,
}

/// How much work it takes to make two tools work together
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown integration difficulty '{}'", other)),
        }
    }
}

/// A scored relationship between two distinct tools
///
/// The pair is unordered: `(a, b)` and `(b, a)` describe the same record.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Compatibility {
    pub id: Option<i64>,
    pub tool_one_id: ToolId,
    pub tool_two_id: ToolId,
    pub compatibility_score: u8,
    pub notes: String,
    pub verified_integration: bool,
    pub integration_difficulty: Difficulty,
    pub setup_steps: Vec<String>,
    pub code_example: String,
    pub dependencies: Vec<String>,
}

impl Compatibility {
    /// Whether `tool` is one side of this pair
    #[cfg(test)]
    pub fn involves(&self, tool: ToolId) -> bool {
        self.tool_one_id == tool || self.tool_two_id == tool
    }

    /// The other side of the pair, if `tool` participates
    pub fn partner_of(&self, tool: ToolId) -> Option<ToolId> {
        if self.tool_one_id == tool {
            Some(self.tool_two_id)
        } else if self.tool_two_id == tool {
            Some(self.tool_one_id)
        } else {
            None
        }
    }

    /// Whether this record describes the unordered pair `{a, b}`
    pub fn connects(&self, a: ToolId, b: ToolId) -> bool {
        (self.tool_one_id == a && self.tool_two_id == b)
            || (self.tool_one_id == b && self.tool_two_id == a)
    }

    /// Pair key independent of orientation
    pub fn pair_key(&self) -> (ToolId, ToolId) {
        canonical_pair(self.tool_one_id, self.tool_two_id)
    }
}

/// Order a pair of tool ids so that lookups ignore orientation
pub fn canonical_pair(a: ToolId, b: ToolId) -> (ToolId, ToolId) {
    if a <= b { (a, b) } else { (b, a) }
}

/// Joined read view of one compatibility row and its two tools
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompatibilityMatrix {
    pub tool_one: Tool,
    pub tool_two: Tool,
    pub compatibility: Option<Compatibility>,
}
