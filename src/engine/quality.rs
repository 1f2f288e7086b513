//! Quality filter: separates real tools from languages and resource lists

use crate::catalog::Tool;
use crate::config::PruningConfig;
use regex::{Regex, RegexBuilder};
use std::collections::HashSet;
use std::fmt;

/// Why a tool failed the quality filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    MissingDescription,
    ShortDescription { length: usize },
    LanguageName,
    ResourceMarker,
    CollectionPhrase,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::MissingDescription => write!(f, "no description"),
            Rejection::ShortDescription { length } => {
                write!(f, "description too short ({} chars)", length)
            }
            Rejection::LanguageName => write!(f, "programming language, not a tool"),
            Rejection::ResourceMarker => write!(f, "looks like a learning resource"),
            Rejection::CollectionPhrase => write!(f, "looks like a curated list"),
        }
    }
}

/// Compiled quality filter
#[derive(Debug, Clone)]
pub struct QualityFilter {
    min_description_len: usize,
    language_names: HashSet<String>,
    resource_markers: Option<Regex>,
    collection_phrases: Option<Regex>,
}

impl QualityFilter {
    pub fn from_config(config: &PruningConfig) -> Result<Self, regex::Error> {
        Ok(Self {
            min_description_len: config.min_description_len,
            language_names: config
                .language_names
                .iter()
                .map(|name| name.trim().to_lowercase())
                .collect(),
            resource_markers: any_of(&config.resource_markers)?,
            collection_phrases: any_of(&config.collection_phrases)?,
        })
    }

    /// First reason the tool fails the filter, if any
    ///
    /// Length is counted on the description as stored, padding included. A
    /// description of only whitespace counts as missing.
    pub fn rejection(&self, tool: &Tool) -> Option<Rejection> {
        let description = match tool.description.as_deref() {
            Some(d) if !d.trim().is_empty() => d,
            _ => return Some(Rejection::MissingDescription),
        };

        let length = description.chars().count();
        if length < self.min_description_len {
            return Some(Rejection::ShortDescription { length });
        }

        if self
            .language_names
            .contains(&tool.name.trim().to_lowercase())
        {
            return Some(Rejection::LanguageName);
        }

        if let Some(ref markers) = self.resource_markers {
            if markers.is_match(&tool.name) || markers.is_match(description) {
                return Some(Rejection::ResourceMarker);
            }
        }

        if let Some(ref phrases) = self.collection_phrases {
            if phrases.is_match(description) {
                return Some(Rejection::CollectionPhrase);
            }
        }

        None
    }

    #[cfg(test)]
    pub fn accepts(&self, tool: &Tool) -> bool {
        self.rejection(tool).is_none()
    }
}

/// Case-insensitive literal alternation; `None` when there is nothing to match
fn any_of(patterns: &[String]) -> Result<Option<Regex>, regex::Error> {
    let escaped: Vec<String> = patterns
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .map(regex::escape)
        .collect();

    if escaped.is_empty() {
        return Ok(None);
    }

    RegexBuilder::new(&escaped.join("|"))
        .case_insensitive(true)
        .build()
        .map(Some)
}
