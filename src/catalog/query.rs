//! Catalog search and statistics

use super::model::{Category, Tool};
use super::store::CatalogStore;
use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;

/// Filters for searching the catalog
///
/// Every text filter is a case-insensitive substring match. Framework and
/// language filters match when any of the listed values matches.
#[derive(Debug, Clone, Default)]
pub struct ToolQuery {
    /// Matched against name, description and features
    pub text: Option<String>,
    pub category: Option<String>,
    pub min_maturity: Option<u8>,
    pub min_popularity: Option<u8>,
    pub frameworks: Vec<String>,
    pub languages: Vec<String>,
}

impl ToolQuery {
    pub fn matches(&self, tool: &Tool) -> bool {
        if let Some(ref text) = self.text {
            let needle = text.to_lowercase();
            let in_name = contains_ci(&tool.name, &needle);
            let in_description = tool
                .description
                .as_deref()
                .is_some_and(|d| contains_ci(d, &needle));
            let in_features = tool.features.iter().any(|f| contains_ci(f, &needle));
            if !(in_name || in_description || in_features) {
                return false;
            }
        }

        if let Some(ref category) = self.category {
            if !contains_ci(&tool.category_id, &category.to_lowercase()) {
                return false;
            }
        }

        if let Some(min) = self.min_maturity {
            if tool.maturity_score.is_none_or(|s| s < min) {
                return false;
            }
        }

        if let Some(min) = self.min_popularity {
            if tool.popularity_score.is_none_or(|s| s < min) {
                return false;
            }
        }

        if !any_listed(&self.frameworks, &tool.frameworks) {
            return false;
        }

        any_listed(&self.languages, &tool.languages)
    }

    /// Apply the query to a list of tools
    #[cfg(test)]
    pub fn filter<'a>(&self, tools: &'a [Tool]) -> Vec<&'a Tool> {
        tools.iter().filter(|tool| self.matches(tool)).collect()
    }
}

fn contains_ci(haystack: &str, lowered_needle: &str) -> bool {
    haystack.to_lowercase().contains(lowered_needle)
}

/// True when no wanted values are given, or any of them matches any present value
fn any_listed(wanted: &[String], present: &[String]) -> bool {
    let wanted: Vec<String> = wanted
        .iter()
        .map(|w| w.trim().to_lowercase())
        .filter(|w| !w.is_empty())
        .collect();

    if wanted.is_empty() {
        return true;
    }

    present
        .iter()
        .any(|p| wanted.iter().any(|w| contains_ci(p, w)))
}

/// Summary counts over the catalog
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogStats {
    pub total_tools: usize,
    pub total_categories: usize,
    /// Tool count per category name
    pub category_breakdown: BTreeMap<String, usize>,
}

impl CatalogStats {
    pub fn collect(tools: &[Tool], categories: &[Category]) -> Self {
        let names = category_names(categories);

        let mut breakdown: BTreeMap<String, usize> = BTreeMap::new();
        for tool in tools {
            let name = display_category(&names, &tool.category_id);
            *breakdown.entry(name.to_string()).or_default() += 1;
        }

        Self {
            total_tools: tools.len(),
            total_categories: breakdown.len(),
            category_breakdown: breakdown,
        }
    }
}

/// Tools in the store matching `query`, in catalog order
pub fn search_tools<S: CatalogStore + ?Sized>(store: &S, query: &ToolQuery) -> Result<Vec<Tool>> {
    let tools = store.list_tools()?;
    Ok(tools.into_iter().filter(|tool| query.matches(tool)).collect())
}

pub fn catalog_stats<S: CatalogStore + ?Sized>(store: &S) -> Result<CatalogStats> {
    Ok(CatalogStats::collect(
        &store.list_tools()?,
        &store.list_categories()?,
    ))
}

/// Category id to display name
pub fn category_names(categories: &[Category]) -> BTreeMap<&str, &str> {
    categories
        .iter()
        .map(|c| (c.id.as_str(), c.name.as_str()))
        .collect()
}

/// Display name for a category id, falling back to the id itself
pub fn display_category<'a>(names: &BTreeMap<&str, &'a str>, id: &'a str) -> &'a str {
    names.get(id).copied().unwrap_or(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool(name: &str, category: &str) -> Tool {
        Tool {
            name: name.into(),
            category_id: category.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_text_search_covers_features() {
        let mut copilot = tool("Copilot", "ai-coding-assistant");
        copilot.features = vec!["Code completion".into()];
        copilot.description = Some("AI pair programmer".into());
        let tools = vec![copilot, tool("Jest", "testing")];

        let query = ToolQuery {
            text: Some("COMPLETION".into()),
            ..Default::default()
        };
        let found = query.filter(&tools);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Copilot");

        let query = ToolQuery {
            text: Some("pair prog".into()),
            ..Default::default()
        };
        assert_eq!(query.filter(&tools).len(), 1);
    }

    #[test]
    fn test_score_filters_exclude_unscored() {
        let mut scored = tool("Docker", "devops");
        scored.maturity_score = Some(9);
        let tools = vec![scored, tool("Unknown", "devops")];

        let query = ToolQuery {
            min_maturity: Some(8),
            ..Default::default()
        };
        let found = query.filter(&tools);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Docker");
    }

    #[test]
    fn test_any_of_languages() {
        let mut django = tool("Django", "backend-framework");
        django.languages = vec!["Python".into()];
        let mut express = tool("Express", "backend-framework");
        express.languages = vec!["JavaScript".into()];
        let tools = vec![django, express, tool("Bare", "backend-framework")];

        let query = ToolQuery {
            languages: vec!["python".into(), " ".into(), "ruby".into()],
            ..Default::default()
        };
        let found = query.filter(&tools);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Django");
    }

    #[test]
    fn test_stats_use_category_names() {
        let tools = vec![
            tool("A", "database"),
            tool("B", "database"),
            tool("C", "uncategorized"),
        ];
        let categories = vec![Category {
            id: "database".into(),
            name: "Databases".into(),
        }];

        let stats = CatalogStats::collect(&tools, &categories);
        assert_eq!(stats.total_tools, 3);
        assert_eq!(stats.total_categories, 2);
        assert_eq!(stats.category_breakdown["Databases"], 2);
        assert_eq!(stats.category_breakdown["uncategorized"], 1);
    }

    #[test]
    fn test_search_and_stats_over_store() {
        use crate::catalog::{SqliteCatalog, ToolDraft};

        let mut catalog = SqliteCatalog::open_in_memory().unwrap();
        catalog
            .upsert_category(&Category {
                id: "testing".into(),
                name: "Testing".into(),
            })
            .unwrap();
        catalog
            .create_tool(&ToolDraft::new("Jest", "testing").with_languages(&["JavaScript"]))
            .unwrap();
        catalog
            .create_tool(&ToolDraft::new("pytest", "testing").with_languages(&["Python"]))
            .unwrap();

        let query = ToolQuery {
            languages: vec!["javascript".into()],
            ..Default::default()
        };
        let found = search_tools(&catalog, &query).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Jest");

        let stats = catalog_stats(&catalog).unwrap();
        assert_eq!(stats.total_tools, 2);
        assert_eq!(stats.category_breakdown["Testing"], 2);
    }
}
