//! Seed import: load categories and tools from a JSON file

use super::model::{Category, ToolDraft};
use super::store::CatalogStore;
use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;

/// Placeholder the source spreadsheets use for empty cells
const NOT_SPECIFIED: &str = "Not specified";

/// Contents of a seed file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedFile {
    #[serde(default)]
    pub categories: Vec<Category>,

    #[serde(default)]
    pub tools: Vec<ToolSeed>,
}

/// One tool entry in a seed file
///
/// List fields accept a JSON array or a comma-separated string.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolSeed {
    #[serde(default)]
    pub name: String,

    #[serde(default, alias = "category")]
    pub category_id: String,

    #[serde(default, deserialize_with = "optional_text")]
    pub description: Option<String>,

    #[serde(default, deserialize_with = "optional_text")]
    pub url: Option<String>,

    #[serde(default, deserialize_with = "list_field", alias = "supportedLanguages")]
    pub languages: Vec<String>,

    #[serde(default, deserialize_with = "list_field")]
    pub frameworks: Vec<String>,

    #[serde(default, deserialize_with = "list_field")]
    pub features: Vec<String>,

    #[serde(default, deserialize_with = "list_field", alias = "nativeIntegrations")]
    pub integrations: Vec<String>,

    #[serde(default, deserialize_with = "list_field", alias = "notableStrengths")]
    pub strengths: Vec<String>,

    #[serde(default, deserialize_with = "list_field", alias = "knownLimitations")]
    pub limitations: Vec<String>,

    #[serde(default)]
    pub maturity_score: Option<i64>,

    #[serde(default)]
    pub popularity_score: Option<i64>,

    #[serde(default, deserialize_with = "optional_text")]
    pub pricing: Option<String>,
}

impl ToolSeed {
    pub fn to_draft(&self) -> ToolDraft {
        ToolDraft {
            name: self.name.trim().to_string(),
            description: self.description.clone(),
            category_id: self.category_id.trim().to_string(),
            url: self.url.clone(),
            languages: self.languages.clone(),
            frameworks: self.frameworks.clone(),
            features: self.features.clone(),
            integrations: self.integrations.clone(),
            strengths: self.strengths.clone(),
            limitations: self.limitations.clone(),
            maturity_score: rating(self.maturity_score),
            popularity_score: rating(self.popularity_score),
            pricing: self.pricing.clone(),
        }
    }
}

/// Keep 1-10 ratings, drop anything else
fn rating(value: Option<i64>) -> Option<u8> {
    value
        .filter(|v| (1..=10).contains(v))
        .and_then(|v| u8::try_from(v).ok())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ListOrText {
    List(Vec<String>),
    Text(String),
}

/// Split a comma-separated cell into trimmed, non-empty items
pub fn parse_list(raw: &str) -> Vec<String> {
    if raw.trim() == NOT_SPECIFIED {
        return Vec::new();
    }
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}

fn list_field<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<ListOrText>::deserialize(deserializer)?;
    Ok(match value {
        None => Vec::new(),
        Some(ListOrText::Text(raw)) => parse_list(&raw),
        Some(ListOrText::List(items)) => items
            .into_iter()
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty() && item != NOT_SPECIFIED)
            .collect(),
    })
}

fn optional_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && v != NOT_SPECIFIED))
}

/// Outcome of a seed import
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub categories: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
}

/// Read a seed file from disk
pub fn load_seed_file(path: &Path) -> Result<SeedFile> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let seed: SeedFile = serde_json::from_str(&contents)
        .with_context(|| format!("parsing {}", path.display()))?;
    Ok(seed)
}

/// Write a seed into the catalog
///
/// Tools are matched by name: existing tools are updated in place, new ones
/// created. Entries without a name or category are skipped.
pub fn import_seed<S: CatalogStore + ?Sized>(store: &mut S, seed: &SeedFile) -> Result<ImportSummary> {
    let mut summary = ImportSummary::default();

    for category in &seed.categories {
        store.upsert_category(category)?;
        summary.categories += 1;
    }

    for entry in &seed.tools {
        let draft = entry.to_draft();
        if draft.name.is_empty() || draft.category_id.is_empty() {
            tracing::warn!(name = %draft.name, "Skipping seed entry without name or category");
            summary.skipped += 1;
            continue;
        }

        let outcome = match store.find_tool_by_name(&draft.name)? {
            Some(existing) => store.update_tool(existing.id, &draft).map(|_| false),
            None => store.create_tool(&draft).map(|_| true),
        };

        match outcome {
            Ok(true) => summary.created += 1,
            Ok(false) => summary.updated += 1,
            Err(e) => {
                tracing::warn!(name = %draft.name, error = %e, "Failed to import tool");
                summary.skipped += 1;
            }
        }
    }

    tracing::info!(
        created = summary.created,
        updated = summary.updated,
        skipped = summary.skipped,
        "Seed import finished"
    );

    Ok(summary)
}
