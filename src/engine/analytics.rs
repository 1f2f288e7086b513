//! Read-only analytics over the persisted compatibility matrix

use crate::catalog::{
    CatalogStore, Category, Compatibility, CompatibilityMatrix, Difficulty, Tool, ToolId,
    canonical_pair, category_names, display_category,
};
use crate::config::{AnalyticsConfig, MissingPairPolicy};
use anyhow::Result;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use super::scorer::NEUTRAL_SCORE;

/// Integration difficulty implied by a stored or averaged score
pub fn difficulty(score: f64) -> Difficulty {
    if score >= 80.0 {
        Difficulty::Easy
    } else if score >= 50.0 {
        Difficulty::Medium
    } else {
        Difficulty::Hard
    }
}

/// How strongly a pairing is recommended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecommendationStrength {
    Strong,
    Moderate,
    Weak,
    NotRecommended,
}

impl RecommendationStrength {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationStrength::Strong => "strong",
            RecommendationStrength::Moderate => "moderate",
            RecommendationStrength::Weak => "weak",
            RecommendationStrength::NotRecommended => "not-recommended",
        }
    }
}

impl fmt::Display for RecommendationStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn recommendation_strength(score: f64) -> RecommendationStrength {
    if score >= 90.0 {
        RecommendationStrength::Strong
    } else if score >= 70.0 {
        RecommendationStrength::Moderate
    } else if score >= 50.0 {
        RecommendationStrength::Weak
    } else {
        RecommendationStrength::NotRecommended
    }
}

/// Pair lookup that ignores orientation
#[derive(Debug, Clone, Default)]
pub struct CompatibilityIndex {
    scores: HashMap<(ToolId, ToolId), u8>,
}

impl CompatibilityIndex {
    pub fn new(rows: &[Compatibility]) -> Self {
        let scores = rows
            .iter()
            .map(|row| (row.pair_key(), row.compatibility_score))
            .collect();
        Self { scores }
    }

    pub fn score(&self, a: ToolId, b: ToolId) -> Option<u8> {
        self.scores.get(&canonical_pair(a, b)).copied()
    }

}

/// Average pairwise score across a stack of tools
///
/// Repeated ids count once. Returns 0 for fewer than two distinct tools, or
/// when the policy excludes every pair.
pub fn stack_harmony(
    tool_ids: &[ToolId],
    index: &CompatibilityIndex,
    policy: MissingPairPolicy,
) -> f64 {
    let mut seen = HashSet::new();
    let stack: Vec<ToolId> = tool_ids.iter().copied().filter(|id| seen.insert(*id)).collect();

    if stack.len() < 2 {
        return 0.0;
    }

    let mut total = 0u64;
    let mut pairs = 0u64;

    for (i, &a) in stack.iter().enumerate() {
        for &b in &stack[i + 1..] {
            let score = match (index.score(a, b), policy) {
                (Some(score), _) => score,
                (None, MissingPairPolicy::Neutral) => NEUTRAL_SCORE,
                (None, MissingPairPolicy::Zero) => 0,
                (None, MissingPairPolicy::Exclude) => continue,
            };
            total += u64::from(score);
            pairs += 1;
        }
    }

    if pairs == 0 {
        0.0
    } else {
        total as f64 / pairs as f64
    }
}

/// Ordering for hub rankings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum HubSort {
    #[default]
    AvgScore,
    Connections,
    Name,
}

impl FromStr for HubSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "score" | "avg" | "avg-score" => Ok(HubSort::AvgScore),
            "connections" | "count" => Ok(HubSort::Connections),
            "name" => Ok(HubSort::Name),
            other => Err(format!(
                "unknown hub sort '{}' (expected score, connections or name)",
                other
            )),
        }
    }
}

/// Filters and ordering for a hub ranking
#[derive(Debug, Clone, PartialEq)]
pub struct HubQuery {
    /// Only tools in this category (id, case-insensitive)
    pub category: Option<String>,
    pub min_avg_score: Option<f64>,
    pub sort: HubSort,
    pub limit: usize,
}

impl Default for HubQuery {
    fn default() -> Self {
        Self {
            category: None,
            min_avg_score: None,
            sort: HubSort::default(),
            limit: AnalyticsConfig::default().hub_limit,
        }
    }
}

/// Connection figures for one tool
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolHub {
    pub tool_id: ToolId,
    pub name: String,
    pub category_id: String,
    pub avg_score: f64,
    pub connection_count: usize,
    pub high_score_count: usize,
}

#[derive(Default)]
struct Tally {
    total: u64,
    count: usize,
    high: usize,
}

/// Rank tools by their connections in the matrix
///
/// Tools without any connection are left out.
pub fn rank_hubs(
    tools: &[Tool],
    rows: &[Compatibility],
    query: &HubQuery,
    high_score: u8,
) -> Vec<ToolHub> {
    let mut tallies: HashMap<ToolId, Tally> = HashMap::new();
    for row in rows {
        for id in [row.tool_one_id, row.tool_two_id] {
            let tally = tallies.entry(id).or_default();
            tally.total += u64::from(row.compatibility_score);
            tally.count += 1;
            if row.compatibility_score >= high_score {
                tally.high += 1;
            }
        }
    }

    let mut hubs: Vec<ToolHub> = tools
        .iter()
        .filter(|tool| {
            query
                .category
                .as_deref()
                .is_none_or(|c| tool.category_id.eq_ignore_ascii_case(c))
        })
        .filter_map(|tool| {
            let tally = tallies.get(&tool.id).filter(|t| t.count > 0)?;
            Some(ToolHub {
                tool_id: tool.id,
                name: tool.name.clone(),
                category_id: tool.category_id.clone(),
                avg_score: tally.total as f64 / tally.count as f64,
                connection_count: tally.count,
                high_score_count: tally.high,
            })
        })
        .filter(|hub| query.min_avg_score.is_none_or(|min| hub.avg_score >= min))
        .collect();

    hubs.sort_by(|a, b| {
        let by_name = || {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.tool_id.cmp(&b.tool_id))
        };
        match query.sort {
            HubSort::AvgScore => b
                .avg_score
                .total_cmp(&a.avg_score)
                .then_with(|| b.connection_count.cmp(&a.connection_count))
                .then_with(by_name),
            HubSort::Connections => b
                .connection_count
                .cmp(&a.connection_count)
                .then_with(|| b.avg_score.total_cmp(&a.avg_score))
                .then_with(by_name),
            HubSort::Name => by_name(),
        }
    });

    hubs.truncate(query.limit);
    hubs
}

/// Average score between two categories
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryPairStats {
    /// Category names, lexicographically ordered
    pub categories: [String; 2],
    pub avg_score: f64,
    pub count: usize,
}

/// Fold the matrix into per-category-pair averages
///
/// Keys are the two category names in lexicographic order, so `A-B` and `B-A`
/// land in the same bucket regardless of row orientation.
pub fn category_cross_analysis(
    rows: &[CompatibilityMatrix],
    categories: &[Category],
) -> Vec<CategoryPairStats> {
    let names = category_names(categories);
    let mut buckets: BTreeMap<(String, String), (f64, usize)> = BTreeMap::new();

    for row in rows {
        let Some(ref compat) = row.compatibility else {
            continue;
        };

        let one = display_category(&names, &row.tool_one.category_id).to_string();
        let two = display_category(&names, &row.tool_two.category_id).to_string();
        let key = if one <= two { (one, two) } else { (two, one) };

        let (avg, count) = buckets.entry(key).or_insert((0.0, 0));
        *avg = (*avg * *count as f64 + f64::from(compat.compatibility_score)) / (*count + 1) as f64;
        *count += 1;
    }

    let mut stats: Vec<CategoryPairStats> = buckets
        .into_iter()
        .map(|((a, b), (avg_score, count))| CategoryPairStats {
            categories: [a, b],
            avg_score,
            count,
        })
        .collect();

    stats.sort_by(|a, b| {
        b.avg_score
            .total_cmp(&a.avg_score)
            .then_with(|| a.categories.cmp(&b.categories))
    });

    stats
}

/// Snapshot of the catalog for answering analytics queries
#[derive(Debug, Clone)]
pub struct Analytics {
    tools: Vec<Tool>,
    categories: Vec<Category>,
    matrix: Vec<CompatibilityMatrix>,
    rows: Vec<Compatibility>,
    index: CompatibilityIndex,
    config: AnalyticsConfig,
}

impl Analytics {
    /// Read tools, categories and the matrix from a store
    pub fn load<S: CatalogStore + ?Sized>(store: &S, config: AnalyticsConfig) -> Result<Self> {
        Ok(Self::from_parts(
            store.list_tools()?,
            store.list_categories()?,
            store.list_compatibility_matrix()?,
            config,
        ))
    }

    pub fn from_parts(
        tools: Vec<Tool>,
        categories: Vec<Category>,
        matrix: Vec<CompatibilityMatrix>,
        config: AnalyticsConfig,
    ) -> Self {
        let rows: Vec<Compatibility> = matrix
            .iter()
            .filter_map(|row| row.compatibility.clone())
            .collect();
        let index = CompatibilityIndex::new(&rows);

        Self {
            tools,
            categories,
            matrix,
            rows,
            index,
            config,
        }
    }

    /// Harmony score of a stack under the configured missing-pair policy
    pub fn harmony(&self, tool_ids: &[ToolId]) -> f64 {
        stack_harmony(tool_ids, &self.index, self.config.missing_pairs)
    }

    pub fn hubs(&self, query: &HubQuery) -> Vec<ToolHub> {
        rank_hubs(&self.tools, &self.rows, query, self.config.high_score)
    }

    pub fn category_cross_analysis(&self) -> Vec<CategoryPairStats> {
        category_cross_analysis(&self.matrix, &self.categories)
    }

    /// The record for `{a, b}` in either orientation
    pub fn compatibility_between(&self, a: ToolId, b: ToolId) -> Option<&Compatibility> {
        self.rows.iter().find(|row| row.connects(a, b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{SqliteCatalog, ToolDraft};
    use crate::engine::scorer::Scorer;

    fn row(one: ToolId, two: ToolId, score: u8) -> Compatibility {
        Compatibility {
            id: None,
            tool_one_id: one,
            tool_two_id: two,
            compatibility_score: score,
            notes: String::new(),
            verified_integration: score >= 80,
            integration_difficulty: difficulty(f64::from(score)),
            setup_steps: vec![],
            code_example: String::new(),
            dependencies: vec![],
        }
    }

    fn tool(id: ToolId, name: &str, category: &str) -> Tool {
        Tool {
            id,
            name: name.into(),
            category_id: category.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_difficulty_thresholds() {
        assert_eq!(difficulty(81.0), Difficulty::Easy);
        assert_eq!(difficulty(80.0), Difficulty::Easy);
        assert_eq!(difficulty(79.0), Difficulty::Medium);
        assert_eq!(difficulty(50.0), Difficulty::Medium);
        assert_eq!(difficulty(49.0), Difficulty::Hard);
    }

    #[test]
    fn test_recommendation_thresholds() {
        assert_eq!(recommendation_strength(90.0), RecommendationStrength::Strong);
        assert_eq!(recommendation_strength(89.9), RecommendationStrength::Moderate);
        assert_eq!(recommendation_strength(70.0), RecommendationStrength::Moderate);
        assert_eq!(recommendation_strength(69.0), RecommendationStrength::Weak);
        assert_eq!(recommendation_strength(50.0), RecommendationStrength::Weak);
        assert_eq!(recommendation_strength(49.0), RecommendationStrength::NotRecommended);
        assert_eq!(
            serde_json::to_string(&RecommendationStrength::NotRecommended).unwrap(),
            "\"not-recommended\""
        );
    }

    #[test]
    fn test_classification_is_monotonic() {
        let rank_difficulty = |d: Difficulty| match d {
            Difficulty::Hard => 0,
            Difficulty::Medium => 1,
            Difficulty::Easy => 2,
        };
        let rank_strength = |s: RecommendationStrength| match s {
            RecommendationStrength::NotRecommended => 0,
            RecommendationStrength::Weak => 1,
            RecommendationStrength::Moderate => 2,
            RecommendationStrength::Strong => 3,
        };

        for score in 0..100u8 {
            let lo = f64::from(score);
            let hi = f64::from(score + 1);
            assert!(rank_difficulty(difficulty(lo)) <= rank_difficulty(difficulty(hi)));
            assert!(
                rank_strength(recommendation_strength(lo))
                    <= rank_strength(recommendation_strength(hi))
            );
        }
    }

    #[test]
    fn test_harmony_boundaries() {
        let index = CompatibilityIndex::new(&[row(1, 2, 72)]);
        let policy = MissingPairPolicy::Neutral;

        assert_eq!(stack_harmony(&[], &index, policy), 0.0);
        assert_eq!(stack_harmony(&[1], &index, policy), 0.0);
        assert_eq!(stack_harmony(&[1, 1], &index, policy), 0.0);
        assert_eq!(stack_harmony(&[1, 2], &index, policy), 72.0);
        assert_eq!(stack_harmony(&[2, 1], &index, policy), 72.0);
    }

    #[test]
    fn test_harmony_missing_pair_policies() {
        let index = CompatibilityIndex::new(&[row(1, 2, 90), row(2, 3, 70)]);
        let stack = [1, 2, 3];

        assert_eq!(stack_harmony(&stack, &index, MissingPairPolicy::Neutral), 70.0);
        assert_eq!(stack_harmony(&stack, &index, MissingPairPolicy::Exclude), 80.0);
        assert!((stack_harmony(&stack, &index, MissingPairPolicy::Zero) - 160.0 / 3.0).abs() < 1e-9);
        assert_eq!(stack_harmony(&[4, 5], &index, MissingPairPolicy::Exclude), 0.0);
    }

    #[test]
    fn test_hubs_rank_and_count() {
        let tools = vec![
            tool(1, "React", "frontend-framework"),
            tool(2, "Next.js", "frontend-framework"),
            tool(3, "Django", "backend-framework"),
            tool(4, "Loner", "misc"),
        ];
        let rows = vec![row(1, 2, 95), row(1, 3, 85), row(2, 3, 40)];

        let hubs = rank_hubs(&tools, &rows, &HubQuery::default(), 85);
        assert_eq!(hubs.len(), 3);
        assert_eq!(hubs[0].name, "React");
        assert_eq!(hubs[0].avg_score, 90.0);
        assert_eq!(hubs[0].connection_count, 2);
        assert_eq!(hubs[0].high_score_count, 2);
        assert_eq!(hubs[1].name, "Next.js");
        assert_eq!(hubs[1].high_score_count, 1);
        assert_eq!(hubs[2].name, "Django");
    }

    #[test]
    fn test_hubs_filters_sort_and_limit() {
        let tools = vec![
            tool(1, "React", "frontend-framework"),
            tool(2, "Next.js", "frontend-framework"),
            tool(3, "Django", "backend-framework"),
        ];
        let rows = vec![row(1, 2, 95), row(1, 3, 85), row(2, 3, 40)];

        let frontend = HubQuery {
            category: Some("Frontend-Framework".into()),
            ..HubQuery::default()
        };
        let hubs = rank_hubs(&tools, &rows, &frontend, 85);
        assert_eq!(hubs.len(), 2);
        assert!(hubs.iter().all(|h| h.category_id == "frontend-framework"));

        let strict = HubQuery {
            min_avg_score: Some(70.0),
            ..HubQuery::default()
        };
        let names: Vec<_> = rank_hubs(&tools, &rows, &strict, 85)
            .into_iter()
            .map(|h| h.name)
            .collect();
        assert_eq!(names, vec!["React"]);

        let by_name = HubQuery {
            sort: HubSort::Name,
            limit: 2,
            ..HubQuery::default()
        };
        let names: Vec<_> = rank_hubs(&tools, &rows, &by_name, 85)
            .into_iter()
            .map(|h| h.name)
            .collect();
        assert_eq!(names, vec!["Django", "Next.js"]);
    }

    #[test]
    fn test_hub_sort_parse() {
        assert_eq!("score".parse::<HubSort>().unwrap(), HubSort::AvgScore);
        assert_eq!("Connections".parse::<HubSort>().unwrap(), HubSort::Connections);
        assert_eq!("name".parse::<HubSort>().unwrap(), HubSort::Name);
        assert!("random".parse::<HubSort>().is_err());
    }

    #[test]
    fn test_category_cross_analysis_ignores_orientation() {
        let fe = tool(1, "React", "fe");
        let be = tool(2, "Django", "be");
        let fe2 = tool(3, "Vue.js", "fe");
        let categories = vec![
            Category {
                id: "fe".into(),
                name: "Frontend".into(),
            },
            Category {
                id: "be".into(),
                name: "Backend".into(),
            },
        ];

        let matrix = vec![
            CompatibilityMatrix {
                tool_one: fe.clone(),
                tool_two: be.clone(),
                compatibility: Some(row(1, 2, 80)),
            },
            CompatibilityMatrix {
                tool_one: be.clone(),
                tool_two: fe2.clone(),
                compatibility: Some(row(2, 3, 90)),
            },
            CompatibilityMatrix {
                tool_one: fe.clone(),
                tool_two: fe2.clone(),
                compatibility: Some(row(1, 3, 20)),
            },
            CompatibilityMatrix {
                tool_one: fe,
                tool_two: be,
                compatibility: None,
            },
        ];

        let stats = category_cross_analysis(&matrix, &categories);
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].categories, ["Backend".to_string(), "Frontend".to_string()]);
        assert_eq!(stats[0].avg_score, 85.0);
        assert_eq!(stats[0].count, 2);
        assert_eq!(stats[1].categories, ["Frontend".to_string(), "Frontend".to_string()]);
        assert_eq!(stats[1].avg_score, 20.0);

        let mut reversed = matrix.clone();
        reversed.reverse();
        assert_eq!(category_cross_analysis(&reversed, &categories), stats);
    }

    #[test]
    fn test_analytics_over_store() {
        let mut catalog = SqliteCatalog::open_in_memory().unwrap();
        let react = catalog
            .create_tool(&ToolDraft::new("React", "frontend-framework").with_languages(&["JavaScript"]))
            .unwrap();
        let next = catalog
            .create_tool(&ToolDraft::new("Next.js", "frontend-framework").with_languages(&["JavaScript"]))
            .unwrap();
        let django = catalog
            .create_tool(&ToolDraft::new("Django", "backend-framework").with_languages(&["Python"]))
            .unwrap();

        let scorer = Scorer::default();
        catalog.create_compatibility(&scorer.compatibility(&react, &next)).unwrap();
        catalog.create_compatibility(&scorer.compatibility(&django, &react)).unwrap();

        let analytics = Analytics::load(&catalog, AnalyticsConfig::default()).unwrap();

        assert_eq!(analytics.harmony(&[react.id, next.id]), 95.0);
        assert_eq!(analytics.harmony(&[next.id, react.id]), 95.0);
        // React-Django is 85, Next-Django is missing and counts as neutral
        assert!((analytics.harmony(&[react.id, next.id, django.id]) - (95.0 + 85.0 + 50.0) / 3.0).abs() < 1e-9);

        let pair = analytics.compatibility_between(react.id, django.id).unwrap();
        assert_eq!(pair.compatibility_score, 85);
        assert!(analytics.compatibility_between(next.id, django.id).is_none());

        // Next.js averages 95 over one pair, React 90 over two
        let hubs = analytics.hubs(&HubQuery::default());
        assert_eq!(hubs.len(), 3);
        assert_eq!(hubs[0].tool_id, next.id);
        assert_eq!(hubs[0].avg_score, 95.0);
        assert_eq!(hubs[1].tool_id, react.id);
        assert_eq!(hubs[1].avg_score, 90.0);

        let by_connections = analytics.hubs(&HubQuery {
            sort: HubSort::Connections,
            ..HubQuery::default()
        });
        assert_eq!(by_connections[0].tool_id, react.id);
        assert_eq!(by_connections[0].connection_count, 2);

        let cross = analytics.category_cross_analysis();
        assert_eq!(cross.len(), 2);
        assert_eq!(cross[0].avg_score, 95.0);
    }
}
