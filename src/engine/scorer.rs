//! Pairwise compatibility scoring
//!
//! Scores are built by a rule cascade: a neutral base adjusted by category,
//! language and framework overlap, then optionally replaced by a category-pair
//! or named-pair override. Every rule is symmetric, so `score(a, b)` always
//! equals `score(b, a)`.

use crate::catalog::{Compatibility, Difficulty, Tool};
use crate::config::ScoringRules;
use serde::Serialize;
use std::collections::BTreeMap;

/// Score of a pair with no signal either way
pub const NEUTRAL_SCORE: u8 = 50;

const SAME_CATEGORY_BONUS: i32 = 10;
const COMPETING_PENALTY: i32 = 20;
const LANGUAGE_STEP: i32 = 10;
const LANGUAGE_CAP: i32 = 30;
const DISJOINT_LANGUAGE_PENALTY: i32 = 10;
const FRAMEWORK_STEP: i32 = 15;
const FRAMEWORK_CAP: i32 = 30;

/// Outcome of scoring one pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PairScore {
    pub score: u8,
    pub notes: String,
    pub difficulty: Difficulty,
    pub verified: bool,
}

/// Integration difficulty implied by a freshly computed score
pub fn difficulty_for_score(score: u8) -> Difficulty {
    if score >= 70 {
        Difficulty::Easy
    } else if score >= 40 {
        Difficulty::Medium
    } else {
        Difficulty::Hard
    }
}

/// Scores tool pairs against a fixed rule set
#[derive(Debug, Clone, Default)]
pub struct Scorer {
    rules: ScoringRules,
}

impl Scorer {
    pub fn new(rules: ScoringRules) -> Self {
        Self { rules }
    }

    /// Score a pair of tools
    pub fn score(&self, a: &Tool, b: &Tool) -> PairScore {
        let score = self.score_value(a, b);

        PairScore {
            score,
            notes: self.notes(a, b, score),
            difficulty: difficulty_for_score(score),
            verified: score >= 80,
        }
    }

    /// Just the numeric score, without building notes
    pub fn score_value(&self, a: &Tool, b: &Tool) -> u8 {
        let mut value = i32::from(NEUTRAL_SCORE);

        if a.category_id == b.category_id {
            if self.rules.is_competing(&a.category_id) {
                value -= COMPETING_PENALTY;
            } else {
                value += SAME_CATEGORY_BONUS;
            }
        }

        let languages = shared(&a.languages, &b.languages).len() as i32;
        if languages > 0 {
            value += (languages * LANGUAGE_STEP).min(LANGUAGE_CAP);
        } else if has_entries(&a.languages) && has_entries(&b.languages) {
            value -= DISJOINT_LANGUAGE_PENALTY;
        }

        let frameworks = shared(&a.frameworks, &b.frameworks).len() as i32;
        if frameworks > 0 {
            value += (frameworks * FRAMEWORK_STEP).min(FRAMEWORK_CAP);
        }

        if let Some(fixed) = self.rules.category_pair(&a.category_id, &b.category_id) {
            value = i32::from(fixed);
        }

        if let Some(fixed) = self.rules.named_pair(&a.name, &b.name) {
            value = i32::from(fixed);
        }

        value.clamp(0, 100) as u8
    }

    /// Build the compatibility record to persist for a pair
    pub fn compatibility(&self, a: &Tool, b: &Tool) -> Compatibility {
        let scored = self.score(a, b);

        Compatibility {
            id: None,
            tool_one_id: a.id,
            tool_two_id: b.id,
            compatibility_score: scored.score,
            notes: scored.notes,
            verified_integration: scored.verified,
            integration_difficulty: scored.difficulty,
            setup_steps: Vec::new(),
            code_example: String::new(),
            dependencies: Vec::new(),
        }
    }

    fn notes(&self, a: &Tool, b: &Tool, score: u8) -> String {
        if score >= 80 {
            let mut notes = format!("Excellent compatibility between {} and {}.", a.name, b.name);

            let languages = shared(&a.languages, &b.languages);
            if !languages.is_empty() {
                notes.push_str(&format!(" Shared languages: {}.", languages.join(", ")));
            }

            let frameworks = shared(&a.frameworks, &b.frameworks);
            if !frameworks.is_empty() {
                notes.push_str(&format!(" Shared frameworks: {}.", frameworks.join(", ")));
            }

            notes
        } else if score >= 60 {
            format!(
                "Good compatibility: {} and {} work well together with minor setup.",
                a.name, b.name
            )
        } else if score <= 30 {
            let mut notes = format!("Limited compatibility between {} and {}.", a.name, b.name);

            if a.category_id == b.category_id {
                notes.push_str(&format!(
                    " Both are {} tools and usually compete rather than complement each other.",
                    a.category_id
                ));
            }

            notes
        } else {
            format!(
                "Neutral compatibility: {} and {} can be used together without specific integration.",
                a.name, b.name
            )
        }
    }
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

fn has_entries(values: &[String]) -> bool {
    values.iter().any(|v| !v.trim().is_empty())
}

/// Case-insensitive intersection, reported in `left`'s spelling, sorted
fn shared(left: &[String], right: &[String]) -> Vec<String> {
    let left: BTreeMap<String, &str> = left
        .iter()
        .filter(|v| !v.trim().is_empty())
        .map(|v| (normalize(v), v.trim()))
        .collect();

    let right: std::collections::BTreeSet<String> = right.iter().map(|v| normalize(v)).collect();

    left.into_iter()
        .filter(|(key, _)| right.contains(key))
        .map(|(_, original)| original.to_string())
        .collect()
}
