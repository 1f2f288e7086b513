//! Rule tables for pairwise scoring

use super::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Separator between the two halves of a pair key
pub const PAIR_SEPARATOR: char = ':';

/// Hand-tuned rule tables consulted by the scorer
///
/// Pair tables are keyed `left:right` and looked up in both orderings, so
/// `"React:Next.js"` also covers Next.js scored against React. The lookup
/// orders the two names before searching the table, so a pair scores the same
/// whichever side is asked first, even if a table holds both orderings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ScoringRules {
    /// Categories whose members substitute for each other
    #[serde(default)]
    pub competing_categories: BTreeSet<String>,

    /// Category pair overrides, keyed by category id
    #[serde(default)]
    pub category_pairs: BTreeMap<String, u8>,

    /// Tool pair overrides, keyed by tool name
    #[serde(default)]
    pub named_pairs: BTreeMap<String, u8>,
}

impl Default for ScoringRules {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ScoringRules {
    /// Rules with no competing categories and no overrides
    #[cfg(test)]
    pub fn empty() -> Self {
        Self {
            competing_categories: BTreeSet::new(),
            category_pairs: BTreeMap::new(),
            named_pairs: BTreeMap::new(),
        }
    }

    /// The curated rule set shipped with toolmatrix
    pub fn builtin() -> Self {
        let competing_categories = [
            "ai-coding-assistant",
            "deployment-platform",
            "ide",
            "version-control",
        ]
        .into_iter()
        .map(String::from)
        .collect();

        let category_pairs = [
            ("frontend-framework:backend-framework", 85),
            ("frontend-framework:css-framework", 85),
            ("frontend-framework:build-tools", 80),
            ("frontend-framework:deployment-platform", 80),
            ("frontend-framework:testing", 75),
            ("backend-framework:database", 85),
            ("backend-framework:testing", 75),
            ("backend-framework:deployment-platform", 75),
            ("backend-framework:monitoring", 70),
            ("database:database", 35),
            ("database:devops", 70),
            ("devops:deployment-platform", 80),
            ("devops:monitoring", 85),
            ("devops:version-control", 80),
            ("ide:ai-coding-assistant", 80),
            ("ide:version-control", 80),
            ("api-tools:backend-framework", 80),
            ("package-manager:build-tools", 75),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        let named_pairs = [
            ("React:Next.js", 95),
            ("React:Angular", 20),
            ("React:Vue.js", 25),
            ("React:Tailwind CSS", 90),
            ("React:Vite", 90),
            ("React:Jest", 90),
            ("Vue.js:Nuxt", 95),
            ("Vue.js:Angular", 20),
            ("Vue.js:Vite", 95),
            ("Next.js:Vercel", 95),
            ("Svelte:SvelteKit", 95),
            ("Django:PostgreSQL", 90),
            ("Express:MongoDB", 85),
            ("Express:Node.js", 95),
            ("Flask:SQLite", 80),
            ("Ruby on Rails:PostgreSQL", 90),
            ("Spring Boot:MySQL", 85),
            ("Docker:Kubernetes", 95),
            ("GitHub:GitHub Actions", 95),
            ("VS Code:GitHub Copilot", 95),
            ("Prisma:PostgreSQL", 90),
            ("Webpack:Vite", 20),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        Self {
            competing_categories,
            category_pairs,
            named_pairs,
        }
    }

    pub fn is_competing(&self, category_id: &str) -> bool {
        self.competing_categories.contains(category_id)
    }

    /// Category pair override, checked in both orderings
    pub fn category_pair(&self, a: &str, b: &str) -> Option<u8> {
        lookup_pair(&self.category_pairs, a, b)
    }

    /// Named pair override, checked in both orderings
    pub fn named_pair(&self, a: &str, b: &str) -> Option<u8> {
        lookup_pair(&self.named_pairs, a, b)
    }

    /// Merge another rule set into this one (other wins for same key)
    pub fn merge(&mut self, other: Self) {
        self.competing_categories.extend(other.competing_categories);
        merge_pairs(&mut self.category_pairs, other.category_pairs);
        merge_pairs(&mut self.named_pairs, other.named_pairs);
    }

    /// Check that every pair key is well formed and scores are in range
    pub fn validate(&self) -> Result<(), Vec<ConfigError>> {
        let mut errors = Vec::new();
        validate_table("category_pairs", &self.category_pairs, &mut errors);
        validate_table("named_pairs", &self.named_pairs, &mut errors);

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

pub fn pair_key(a: &str, b: &str) -> String {
    format!("{}{}{}", a, PAIR_SEPARATOR, b)
}

fn lookup_pair(table: &BTreeMap<String, u8>, a: &str, b: &str) -> Option<u8> {
    let (low, high) = if a <= b { (a, b) } else { (b, a) };
    table
        .get(&pair_key(low, high))
        .or_else(|| table.get(&pair_key(high, low)))
        .copied()
}

/// Insert entries from `other`, replacing any entry for the same unordered pair
fn merge_pairs(target: &mut BTreeMap<String, u8>, other: BTreeMap<String, u8>) {
    for (key, score) in other {
        if let Some((a, b)) = key.split_once(PAIR_SEPARATOR) {
            target.remove(&pair_key(b, a));
        }
        target.insert(key, score);
    }
}

fn validate_table(table: &str, entries: &BTreeMap<String, u8>, errors: &mut Vec<ConfigError>) {
    for (key, &score) in entries {
        let halves: Vec<&str> = key.split(PAIR_SEPARATOR).collect();
        if halves.len() != 2 || halves.iter().any(|h| h.trim().is_empty()) {
            errors.push(ConfigError::MalformedPairKey {
                table: table.to_string(),
                key: key.clone(),
            });
            continue;
        }

        if score > 100 {
            errors.push(ConfigError::ScoreOutOfRange {
                table: table.to_string(),
                key: key.clone(),
                score,
            });
        }

        // A reversed duplicate with a different score would make lookups
        // depend on argument order
        let reversed = pair_key(halves[1], halves[0]);
        if reversed != *key && key < &reversed {
            if let Some(&other) = entries.get(&reversed) {
                if other != score {
                    errors.push(ConfigError::ConflictingPair {
                        table: table.to_string(),
                        key: key.clone(),
                        reversed,
                    });
                }
            }
        }
    }
}
