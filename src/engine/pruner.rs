//! Catalog pruning and full matrix regeneration
//!
//! A run has two stages. [`compute_connectivity`] is pure: it filters the
//! catalog, scores every pair of quality tools and ranks them by how far their
//! scores stray from neutral. [`apply_pruning`] then rewrites the store: it
//! clears the matrix, persists every pair among the selected tools and deletes
//! the quality tools that were not selected.

use super::error::PruneError;
use super::quality::QualityFilter;
use super::scorer::{NEUTRAL_SCORE, Scorer};
use crate::catalog::{CatalogStore, Tool, ToolId};
use crate::config::{PruningConfig, ToolmatrixConfig};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::{Mutex, TryLockError};

/// Selection thresholds
#[derive(Debug, Clone, PartialEq)]
pub struct PruneOptions {
    pub min_avg_deviation: f64,
    pub feature_weight: f64,
    pub max_connected: usize,
}

impl Default for PruneOptions {
    fn default() -> Self {
        Self::from(&PruningConfig::default())
    }
}

impl From<&PruningConfig> for PruneOptions {
    fn from(config: &PruningConfig) -> Self {
        Self {
            min_avg_deviation: config.min_avg_deviation,
            feature_weight: config.feature_weight,
            max_connected: config.max_connected,
        }
    }
}

/// A quality tool with its connectivity figures
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedTool {
    pub tool: Tool,
    /// Mean distance from neutral over the tool's non-neutral pairs
    pub avg_deviation: f64,
    /// Sort key: deviation plus the feature bonus
    pub rank: f64,
}

/// Result of the pure connectivity stage
#[derive(Debug, Clone, Default)]
pub struct ConnectivityReport {
    /// Tools that passed the quality filter, in catalog order
    pub quality: Vec<Tool>,
    /// Number of tools the quality filter dropped
    pub rejected: usize,
    /// Tools above the deviation threshold, best first
    pub ranked: Vec<RankedTool>,
    /// Number of leading `ranked` entries that are kept
    pub keep: usize,
}

impl ConnectivityReport {
    /// Tools that survive the run, best first
    pub fn connected(&self) -> &[RankedTool] {
        &self.ranked[..self.keep]
    }

    /// Quality tools that a run would delete
    pub fn pruned(&self) -> Vec<&Tool> {
        let kept: HashSet<ToolId> = self.connected().iter().map(|r| r.tool.id).collect();
        self.quality
            .iter()
            .filter(|tool| !kept.contains(&tool.id))
            .collect()
    }
}

/// Outcome of a regeneration run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegenerateSummary {
    /// Compatibility records written
    pub generated: usize,
    /// Pairs that could not be persisted
    pub skipped: usize,
    /// Tools retained with a complete matrix
    pub total_tools: usize,
    /// Quality tools deleted from the catalog
    pub pruned: usize,
    /// Quality tools that should have been deleted but could not be
    pub prune_failures: usize,
    /// Tools that failed the quality filter (left untouched)
    pub rejected: usize,
}

/// Mean `|score - 50|` per tool over its non-neutral pairs
///
/// Each unordered pair is scored once; scoring is symmetric so the value is
/// credited to both sides.
pub fn average_deviations(tools: &[Tool], scorer: &Scorer) -> Vec<f64> {
    let mut sums = vec![0u64; tools.len()];
    let mut counts = vec![0u64; tools.len()];

    for i in 0..tools.len() {
        for j in (i + 1)..tools.len() {
            let score = scorer.score_value(&tools[i], &tools[j]);
            if score == NEUTRAL_SCORE {
                continue;
            }
            let deviation = u64::from(score.abs_diff(NEUTRAL_SCORE));
            sums[i] += deviation;
            counts[i] += 1;
            sums[j] += deviation;
            counts[j] += 1;
        }
    }

    sums.iter()
        .zip(&counts)
        .map(|(&sum, &count)| {
            if count == 0 {
                0.0
            } else {
                sum as f64 / count as f64
            }
        })
        .collect()
}

/// Filter, score and rank the catalog without touching any store
pub fn compute_connectivity(
    tools: &[Tool],
    scorer: &Scorer,
    filter: &QualityFilter,
    options: &PruneOptions,
) -> ConnectivityReport {
    let mut quality = Vec::with_capacity(tools.len());
    let mut rejected = 0;

    for tool in tools {
        match filter.rejection(tool) {
            None => quality.push(tool.clone()),
            Some(reason) => {
                tracing::debug!(tool = %tool.name, id = tool.id, %reason, "Tool failed quality filter");
                rejected += 1;
            }
        }
    }

    let deviations = average_deviations(&quality, scorer);

    let mut ranked: Vec<RankedTool> = quality
        .iter()
        .zip(deviations)
        .filter(|(_, deviation)| *deviation > options.min_avg_deviation)
        .map(|(tool, avg_deviation)| RankedTool {
            rank: avg_deviation + tool.features.len() as f64 * options.feature_weight,
            tool: tool.clone(),
            avg_deviation,
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.rank
            .total_cmp(&a.rank)
            .then_with(|| a.tool.id.cmp(&b.tool.id))
    });

    let keep = ranked.len().min(options.max_connected);

    tracing::debug!(
        total = tools.len(),
        quality = quality.len(),
        above_threshold = ranked.len(),
        keep,
        "Computed catalog connectivity"
    );

    ConnectivityReport {
        quality,
        rejected,
        ranked,
        keep,
    }
}

/// Rewrite the store from a connectivity report
///
/// Runs inside one store transaction. Failing to clear the matrix or to commit
/// rolls everything back and is fatal. A pair that cannot be persisted is
/// counted in `skipped`; a tool that cannot be deleted is counted in
/// `prune_failures`. Neither stops the run.
pub fn apply_pruning<S: CatalogStore + ?Sized>(
    report: &ConnectivityReport,
    scorer: &Scorer,
    store: &mut S,
) -> Result<RegenerateSummary, PruneError> {
    store.begin().map_err(|e| PruneError::persist(&e))?;

    let summary = match write_catalog(report, scorer, store) {
        Ok(summary) => summary,
        Err(e) => {
            rollback(store);
            return Err(e);
        }
    };

    if let Err(e) = store.commit() {
        rollback(store);
        return Err(PruneError::persist(&e));
    }

    Ok(summary)
}

fn write_catalog<S: CatalogStore + ?Sized>(
    report: &ConnectivityReport,
    scorer: &Scorer,
    store: &mut S,
) -> Result<RegenerateSummary, PruneError> {
    let connected = report.connected();
    let mut summary = RegenerateSummary {
        total_tools: connected.len(),
        rejected: report.rejected,
        ..Default::default()
    };

    store
        .clear_all_compatibilities()
        .map_err(|e| PruneError::persist(&e))?;

    for (i, first) in connected.iter().enumerate() {
        for second in &connected[i + 1..] {
            let record = scorer.compatibility(&first.tool, &second.tool);
            match store.create_compatibility(&record) {
                Ok(_) => summary.generated += 1,
                Err(e) => {
                    tracing::warn!(
                        tool_one = first.tool.id,
                        tool_two = second.tool.id,
                        error = %e,
                        "Failed to persist compatibility"
                    );
                    summary.skipped += 1;
                }
            }
        }
    }

    for tool in report.pruned() {
        match store.delete_tool(tool.id) {
            Ok(()) => {
                tracing::debug!(tool = %tool.name, id = tool.id, "Pruned tool");
                summary.pruned += 1;
            }
            Err(e) => {
                tracing::warn!(tool = %tool.name, id = tool.id, error = %e, "Failed to prune tool");
                summary.prune_failures += 1;
            }
        }
    }

    Ok(summary)
}

fn rollback<S: CatalogStore + ?Sized>(store: &mut S) {
    if let Err(e) = store.rollback() {
        tracing::error!(error = %e, "Rollback failed; catalog may be partially rewritten");
    }
}

/// Drives regeneration runs, one at a time
#[derive(Debug)]
pub struct CatalogPruner {
    scorer: Scorer,
    filter: QualityFilter,
    options: PruneOptions,
    running: Mutex<()>,
}

impl CatalogPruner {
    pub fn new(scorer: Scorer, filter: QualityFilter, options: PruneOptions) -> Self {
        Self {
            scorer,
            filter,
            options,
            running: Mutex::new(()),
        }
    }

    pub fn from_config(config: &ToolmatrixConfig) -> Result<Self, PruneError> {
        Ok(Self::new(
            Scorer::new(config.scoring.clone()),
            QualityFilter::from_config(&config.pruning)?,
            PruneOptions::from(&config.pruning),
        ))
    }

    pub fn filter(&self) -> &QualityFilter {
        &self.filter
    }

    /// Compute what a run would keep and delete, without writing
    pub fn preview<S: CatalogStore + ?Sized>(&self, store: &S) -> Result<ConnectivityReport, PruneError> {
        let tools = store.list_tools().map_err(|e| PruneError::catalog_read(&e))?;
        Ok(compute_connectivity(&tools, &self.scorer, &self.filter, &self.options))
    }

    /// Prune the catalog and rebuild the full matrix for the retained tools
    ///
    /// Fails with [`PruneError::Busy`] if another run holds this pruner.
    pub fn regenerate<S: CatalogStore + ?Sized>(&self, store: &mut S) -> Result<RegenerateSummary, PruneError> {
        let _guard = match self.running.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => return Err(PruneError::Busy),
        };

        let started = std::time::Instant::now();
        let report = self.preview(&*store)?;
        let summary = apply_pruning(&report, &self.scorer, store)?;

        tracing::info!(
            generated = summary.generated,
            skipped = summary.skipped,
            total_tools = summary.total_tools,
            pruned = summary.pruned,
            prune_failures = summary.prune_failures,
            duration_ms = started.elapsed().as_millis() as u64,
            "Regenerated compatibility matrix"
        );

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{
        Category, Compatibility, SqliteCatalog, ToolDraft, canonical_pair,
    };
    use crate::config::ScoringRules;
    use anyhow::{Result, bail};
    use std::collections::HashMap;

    const LONG: &str = "A developer tool with a sufficiently long description";

    fn draft(name: &str, category: &str, languages: &[&str], frameworks: &[&str]) -> ToolDraft {
        ToolDraft::new(name, category)
            .with_description(LONG)
            .with_languages(languages)
            .with_frameworks(frameworks)
    }

    fn pruner(options: PruneOptions) -> CatalogPruner {
        CatalogPruner::new(
            Scorer::new(ScoringRules::builtin()),
            QualityFilter::from_config(&PruningConfig::default()).unwrap(),
            options,
        )
    }

    fn seeded() -> SqliteCatalog {
        let mut catalog = SqliteCatalog::open_in_memory().unwrap();
        for d in [
            draft("React", "frontend-framework", &["JavaScript", "TypeScript"], &["React"]),
            draft("Next.js", "frontend-framework", &["JavaScript", "TypeScript"], &["React"]),
            draft("Django", "backend-framework", &["Python"], &["Django"]),
            draft("PostgreSQL", "database", &["SQL"], &[]),
            draft("MySQL", "database", &["SQL"], &[]),
            draft("Tailwind CSS", "css-framework", &["CSS"], &[]),
            // Fails the quality filter: language name
            draft("Python", "language", &["Python"], &[]),
            // Fails the quality filter: no description
            ToolDraft::new("Mystery", "misc"),
        ] {
            catalog.create_tool(&d).unwrap();
        }
        catalog
    }

    fn assert_complete_matrix(catalog: &SqliteCatalog, kept: &[ToolId]) {
        let mut seen: HashMap<(ToolId, ToolId), usize> = HashMap::new();
        for record in catalog.list_compatibilities().unwrap() {
            assert_ne!(record.tool_one_id, record.tool_two_id);
            *seen.entry(record.pair_key()).or_default() += 1;
        }
        for (i, &a) in kept.iter().enumerate() {
            for &b in &kept[i + 1..] {
                assert_eq!(seen.get(&canonical_pair(a, b)), Some(&1), "pair {}-{}", a, b);
            }
        }
        assert_eq!(seen.len(), kept.len() * (kept.len() - 1) / 2);
    }

    #[test]
    fn test_average_deviations() {
        let tools = vec![
            Tool {
                id: 1,
                category_id: "a".into(),
                languages: vec!["Rust".into()],
                ..Default::default()
            },
            Tool {
                id: 2,
                category_id: "b".into(),
                languages: vec!["Rust".into()],
                ..Default::default()
            },
            Tool {
                id: 3,
                category_id: "c".into(),
                ..Default::default()
            },
        ];

        // 1-2 scores 60; pairs with 3 are neutral and ignored
        let deviations = average_deviations(&tools, &Scorer::new(ScoringRules::empty()));
        assert_eq!(deviations, vec![10.0, 10.0, 0.0]);
    }

    #[test]
    fn test_compute_connectivity_filters_and_ranks() {
        let catalog = seeded();
        let tools = catalog.list_tools().unwrap();
        let p = pruner(PruneOptions::default());

        let report = p.preview(&catalog).unwrap();
        assert_eq!(report.rejected, 2);
        assert_eq!(report.quality.len(), 6);
        assert!(report.connected().len() <= 6);
        assert!(report
            .ranked
            .windows(2)
            .all(|w| w[0].rank >= w[1].rank));
        assert!(report.ranked.iter().all(|r| r.avg_deviation > 5.0));

        // Same input, same output
        let again = compute_connectivity(&tools, &p.scorer, &p.filter, &p.options);
        let ids = |r: &ConnectivityReport| r.connected().iter().map(|t| t.tool.id).collect::<Vec<_>>();
        assert_eq!(ids(&report), ids(&again));
    }

    #[test]
    fn test_regenerate_builds_complete_matrix() {
        let mut catalog = seeded();
        let p = pruner(PruneOptions::default());

        let report = p.preview(&catalog).unwrap();
        let kept: Vec<ToolId> = report.connected().iter().map(|r| r.tool.id).collect();

        let summary = p.regenerate(&mut catalog).unwrap();
        assert_eq!(summary.total_tools, kept.len());
        assert_eq!(summary.generated, kept.len() * (kept.len() - 1) / 2);
        assert_eq!(summary.skipped, 0);
        assert_eq!(summary.rejected, 2);
        assert_complete_matrix(&catalog, &kept);

        // Non-quality tools are left alone, unselected quality tools are gone
        let remaining: Vec<String> = catalog.list_tools().unwrap().into_iter().map(|t| t.name).collect();
        assert!(remaining.contains(&"Python".to_string()));
        assert!(remaining.contains(&"Mystery".to_string()));
        assert_eq!(remaining.len(), kept.len() + 2);
        assert_eq!(summary.pruned, 6 - kept.len());
    }

    #[test]
    fn test_regenerate_replaces_existing_records() {
        let mut catalog = seeded();
        let react = catalog.find_tool_by_name("React").unwrap().unwrap();
        let next = catalog.find_tool_by_name("Next.js").unwrap().unwrap();
        catalog
            .create_compatibility(&Compatibility {
                compatibility_score: 5,
                ..Scorer::default().compatibility(&next, &react)
            })
            .unwrap();

        pruner(PruneOptions::default()).regenerate(&mut catalog).unwrap();

        let rows = catalog.list_compatibilities().unwrap();
        let pair: Vec<_> = rows.iter().filter(|r| r.connects(react.id, next.id)).collect();
        assert_eq!(pair.len(), 1);
        assert_eq!(pair[0].compatibility_score, 95);
    }

    #[test]
    fn test_selection_is_bounded() {
        let mut catalog = SqliteCatalog::open_in_memory().unwrap();
        for i in 0..60 {
            catalog
                .create_tool(&draft(&format!("Widget {:02}", i), "frontend", &["TypeScript"], &[]))
                .unwrap();
        }

        let summary = pruner(PruneOptions::default()).regenerate(&mut catalog).unwrap();
        assert_eq!(summary.total_tools, 50);
        assert_eq!(summary.pruned, 10);
        assert_eq!(summary.generated, 50 * 49 / 2);
        assert_eq!(catalog.list_tools().unwrap().len(), 50);
    }

    #[test]
    fn test_ties_break_by_id() {
        let mut catalog = SqliteCatalog::open_in_memory().unwrap();
        let mut ids = Vec::new();
        for name in ["One", "Two", "Three"] {
            ids.push(catalog.create_tool(&draft(name, "frontend", &["Go"], &[])).unwrap().id);
        }

        let options = PruneOptions {
            max_connected: 2,
            ..PruneOptions::default()
        };
        let report = pruner(options).preview(&catalog).unwrap();
        let kept: Vec<ToolId> = report.connected().iter().map(|r| r.tool.id).collect();
        assert_eq!(kept, ids[..2].to_vec());
        assert_eq!(report.pruned().len(), 1);
    }

    #[test]
    fn test_neutral_pairs_are_persisted() {
        let mut catalog = SqliteCatalog::open_in_memory().unwrap();
        // Two framework clusters; pairs across clusters score exactly 50
        catalog.create_tool(&draft("Alpha", "w", &[], &["Tokio"])).unwrap();
        catalog.create_tool(&draft("Beta", "x", &[], &["Tokio"])).unwrap();
        catalog.create_tool(&draft("Gamma", "y", &[], &["Axum"])).unwrap();
        catalog.create_tool(&draft("Delta", "z", &[], &["Axum"])).unwrap();

        let summary = pruner(PruneOptions::default()).regenerate(&mut catalog).unwrap();
        assert_eq!(summary.total_tools, 4);
        assert_eq!(summary.generated, 6);

        let rows = catalog.list_compatibilities().unwrap();
        assert_eq!(rows.iter().filter(|r| r.compatibility_score == 50).count(), 4);
        assert_eq!(rows.iter().filter(|r| r.compatibility_score == 65).count(), 2);
    }

    #[test]
    fn test_busy_when_already_running() {
        let mut catalog = seeded();
        let p = pruner(PruneOptions::default());

        let guard = p.running.lock().unwrap();
        assert!(matches!(p.regenerate(&mut catalog), Err(PruneError::Busy)));
        drop(guard);

        assert!(p.regenerate(&mut catalog).is_ok());
    }

    /// Store double that fails selected operations
    struct FlakyStore {
        inner: SqliteCatalog,
        fail_list: bool,
        fail_clear: bool,
        fail_pairs_with: Option<ToolId>,
        fail_delete: Option<ToolId>,
    }

    impl FlakyStore {
        fn new(inner: SqliteCatalog) -> Self {
            Self {
                inner,
                fail_list: false,
                fail_clear: false,
                fail_pairs_with: None,
                fail_delete: None,
            }
        }
    }

    impl CatalogStore for FlakyStore {
        fn list_tools(&self) -> Result<Vec<Tool>> {
            if self.fail_list {
                bail!("catalog unavailable");
            }
            self.inner.list_tools()
        }
        fn get_tool(&self, id: ToolId) -> Result<Option<Tool>> {
            self.inner.get_tool(id)
        }
        fn find_tool_by_name(&self, name: &str) -> Result<Option<Tool>> {
            self.inner.find_tool_by_name(name)
        }
        fn create_tool(&mut self, draft: &ToolDraft) -> Result<Tool> {
            self.inner.create_tool(draft)
        }
        fn update_tool(&mut self, id: ToolId, draft: &ToolDraft) -> Result<Tool> {
            self.inner.update_tool(id, draft)
        }
        fn delete_tool(&mut self, id: ToolId) -> Result<()> {
            if self.fail_delete == Some(id) {
                bail!("tool {} is locked", id);
            }
            self.inner.delete_tool(id)
        }
        fn list_categories(&self) -> Result<Vec<Category>> {
            self.inner.list_categories()
        }
        fn upsert_category(&mut self, category: &Category) -> Result<()> {
            self.inner.upsert_category(category)
        }
        fn clear_all_compatibilities(&mut self) -> Result<()> {
            if self.fail_clear {
                bail!("disk full");
            }
            self.inner.clear_all_compatibilities()
        }
        fn create_compatibility(&mut self, record: &Compatibility) -> Result<Compatibility> {
            if self.fail_pairs_with.is_some_and(|id| record.involves(id)) {
                bail!("constraint failed");
            }
            self.inner.create_compatibility(record)
        }
        fn list_compatibilities(&self) -> Result<Vec<Compatibility>> {
            self.inner.list_compatibilities()
        }
        fn begin(&mut self) -> Result<()> {
            self.inner.begin()
        }
        fn commit(&mut self) -> Result<()> {
            self.inner.commit()
        }
        fn rollback(&mut self) -> Result<()> {
            self.inner.rollback()
        }
    }

    #[test]
    fn test_catalog_read_failure_is_fatal() {
        let mut store = FlakyStore::new(seeded());
        store.fail_list = true;

        let err = pruner(PruneOptions::default()).regenerate(&mut store).unwrap_err();
        assert!(matches!(err, PruneError::CatalogRead { .. }));

        store.fail_list = false;
        assert_eq!(store.list_tools().unwrap().len(), 8);
    }

    #[test]
    fn test_pair_failures_are_skipped() {
        let catalog = seeded();
        let p = pruner(PruneOptions::default());
        let report = p.preview(&catalog).unwrap();
        let kept = report.connected().len();
        let victim = report.connected()[0].tool.id;

        let mut store = FlakyStore::new(catalog);
        store.fail_pairs_with = Some(victim);

        let summary = p.regenerate(&mut store).unwrap();
        assert_eq!(summary.skipped, kept - 1);
        assert_eq!(summary.generated + summary.skipped, kept * (kept - 1) / 2);
        assert!(store
            .list_compatibilities()
            .unwrap()
            .iter()
            .all(|r| !r.involves(victim)));
    }

    #[test]
    fn test_delete_failures_are_best_effort() {
        let catalog = seeded();
        let p = pruner(PruneOptions {
            max_connected: 2,
            ..PruneOptions::default()
        });
        let report = p.preview(&catalog).unwrap();
        let doomed: Vec<ToolId> = report.pruned().iter().map(|t| t.id).collect();
        assert!(doomed.len() >= 2);

        let mut store = FlakyStore::new(catalog);
        store.fail_delete = Some(doomed[0]);

        let summary = p.regenerate(&mut store).unwrap();
        assert_eq!(summary.prune_failures, 1);
        assert_eq!(summary.pruned, doomed.len() - 1);
        assert!(store.get_tool(doomed[0]).unwrap().is_some());
        assert!(store.get_tool(doomed[1]).unwrap().is_none());
    }

    #[test]
    fn test_clear_failure_rolls_back() {
        let mut catalog = seeded();
        let a = catalog.find_tool_by_name("Django").unwrap().unwrap();
        let b = catalog.find_tool_by_name("MySQL").unwrap().unwrap();
        catalog
            .create_compatibility(&Scorer::default().compatibility(&a, &b))
            .unwrap();

        let mut store = FlakyStore::new(catalog);
        store.fail_clear = true;

        let err = pruner(PruneOptions::default()).regenerate(&mut store).unwrap_err();
        assert!(matches!(err, PruneError::Persist { .. }));
        assert_eq!(store.list_tools().unwrap().len(), 8);
        assert_eq!(store.list_compatibilities().unwrap().len(), 1);
    }

    #[test]
    fn test_from_config_uses_pruning_settings() {
        let p = CatalogPruner::from_config(&ToolmatrixConfig::default()).unwrap();
        assert_eq!(p.options.max_connected, 50);
    }
}
