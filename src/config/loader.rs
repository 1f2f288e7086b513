//! Configuration loading with multi-layer merge

use super::{AnalyticsConfig, ConfigError, PruningConfig, ScoringRules};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level toolmatrix configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ToolmatrixConfig {
    #[serde(default)]
    pub catalog: CatalogSettings,

    #[serde(default)]
    pub scoring: ScoringRules,

    #[serde(default)]
    pub pruning: PruningConfig,

    #[serde(default)]
    pub analytics: AnalyticsConfig,
}

/// Where the catalog lives
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CatalogSettings {
    /// Database path; `~` is expanded
    pub database: Option<String>,
}

impl CatalogSettings {
    /// Configured database path with `~` expanded
    pub fn database_path(&self) -> Option<PathBuf> {
        self.database
            .as_deref()
            .map(|raw| PathBuf::from(shellexpand::tilde(raw).into_owned()))
    }
}

impl ToolmatrixConfig {
    /// Load configuration from the standard hierarchy
    ///
    /// Load order (later overrides earlier):
    /// 1. Built-in defaults
    /// 2. ~/.config/toolmatrix/config.toml
    /// 3. .toolmatrix/config.toml (project)
    /// 4. An explicit file passed with --config
    pub fn load(project_dir: Option<&Path>, explicit: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();

        // Load user config
        if let Some(user_config_path) = Self::user_config_path() {
            if user_config_path.exists() {
                config.merge(Self::load_layer(&user_config_path)?);
            }
        }

        // Load project config
        let project_config_path = project_dir
            .map(|p| p.join(".toolmatrix/config.toml"))
            .unwrap_or_else(|| PathBuf::from(".toolmatrix/config.toml"));

        if project_config_path.exists() {
            config.merge(Self::load_layer(&project_config_path)?);
        }

        if let Some(path) = explicit {
            config.merge(Self::load_layer(path)?);
        }

        config.validate().map_err(invalid_configuration)?;

        Ok(config)
    }

    /// Load one layer and check its rule tables before they are merged
    ///
    /// Merging replaces reversed keys, so a file holding both orderings of a
    /// pair with different scores is only detectable here.
    fn load_layer(path: &Path) -> Result<Self> {
        let layer = Self::load_file(path).with_context(|| format!("loading {}", path.display()))?;
        layer
            .scoring
            .validate()
            .map_err(invalid_configuration)
            .with_context(|| format!("loading {}", path.display()))?;
        Ok(layer)
    }

    /// Load configuration from a specific file
    pub fn load_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    /// Get the user config path (~/.config/toolmatrix/config.toml)
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("toolmatrix/config.toml"))
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: Self) {
        if other.catalog.database.is_some() {
            self.catalog.database = other.catalog.database;
        }

        self.scoring.merge(other.scoring);
        self.pruning.merge(other.pruning);
        self.analytics.merge(other.analytics);
    }

    /// Check rule tables and thresholds
    pub fn validate(&self) -> Result<(), Vec<ConfigError>> {
        let mut errors = match self.scoring.validate() {
            Ok(()) => Vec::new(),
            Err(errors) => errors,
        };

        if self.pruning.max_connected == 0 {
            errors.push(ConfigError::InvalidThreshold {
                field: "max_connected".into(),
                expected: "at least 1".into(),
            });
        }
        if !self.pruning.min_avg_deviation.is_finite() || self.pruning.min_avg_deviation < 0.0 {
            errors.push(ConfigError::InvalidThreshold {
                field: "min_avg_deviation".into(),
                expected: "a non-negative number".into(),
            });
        }
        if !self.pruning.feature_weight.is_finite() {
            errors.push(ConfigError::InvalidThreshold {
                field: "feature_weight".into(),
                expected: "a finite number".into(),
            });
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

fn invalid_configuration(errors: Vec<ConfigError>) -> anyhow::Error {
    let lines: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
    anyhow::anyhow!("invalid configuration:\n  {}", lines.join("\n  "))
}
