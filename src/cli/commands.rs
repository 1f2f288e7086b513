//! CLI command implementations

use super::output::{OutputEvent, OutputHandler, PairReport, Partner, PreviewEntry};
use crate::catalog::{
    CatalogStore, Compatibility, Difficulty, Tool, ToolId, ToolQuery, catalog_stats,
    category_names, display_category, import_seed, load_seed_file, search_tools,
};
use crate::config::{AnalyticsConfig, ToolmatrixConfig};
use crate::engine::{
    Analytics, CatalogPruner, HubQuery, PruneError, Scorer, difficulty, recommendation_strength,
};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;

/// Find a tool by numeric id or by name
///
/// Exact name matches win over case-insensitive ones.
pub fn resolve_tool<S: CatalogStore + ?Sized>(store: &S, reference: &str) -> Result<Tool> {
    let reference = reference.trim();

    if let Ok(id) = reference.parse::<ToolId>() {
        if let Some(tool) = store.get_tool(id)? {
            return Ok(tool);
        }
    }

    if let Some(tool) = store.find_tool_by_name(reference)? {
        return Ok(tool);
    }

    store
        .list_tools()?
        .into_iter()
        .find(|tool| tool.name.eq_ignore_ascii_case(reference))
        .with_context(|| format!("unknown tool '{}'", reference))
}

/// Import categories and tools from a seed file
pub fn import<S: CatalogStore + ?Sized>(
    store: &mut S,
    path: &Path,
    handler: &dyn OutputHandler,
) -> Result<i32> {
    let seed = load_seed_file(path)?;
    handler.emit(OutputEvent::Debug {
        message: format!(
            "Loaded {} categories and {} tools from {}",
            seed.categories.len(),
            seed.tools.len(),
            path.display()
        ),
    });

    let summary = import_seed(store, &seed)
        .with_context(|| format!("importing {}", path.display()))?;

    handler.emit(OutputEvent::Imported { summary });
    Ok(0)
}

/// List tools matching a query
pub fn list_tools<S: CatalogStore + ?Sized>(
    store: &S,
    query: &ToolQuery,
    handler: &dyn OutputHandler,
) -> Result<i32> {
    let tools = search_tools(store, query)?;
    handler.emit(OutputEvent::Tools { tools });
    Ok(0)
}

/// Show one tool with its compatibility partners, best first
pub fn show_tool<S: CatalogStore + ?Sized>(
    store: &S,
    reference: &str,
    handler: &dyn OutputHandler,
) -> Result<i32> {
    let tool = resolve_tool(store, reference)?;

    let names: HashMap<ToolId, String> = store
        .list_tools()?
        .into_iter()
        .map(|t| (t.id, t.name))
        .collect();

    let mut partners: Vec<Partner> = store
        .list_compatibilities()?
        .iter()
        .filter_map(|record| {
            let other = record.partner_of(tool.id)?;
            Some(Partner {
                tool_id: other,
                name: names
                    .get(&other)
                    .cloned()
                    .unwrap_or_else(|| format!("#{}", other)),
                score: record.compatibility_score,
                difficulty: record.integration_difficulty,
            })
        })
        .collect();
    partners.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.name.cmp(&b.name)));

    let categories = store.list_categories()?;
    let category = display_category(&category_names(&categories), &tool.category_id).to_string();

    handler.emit(OutputEvent::ToolDetail {
        tool,
        category,
        partners,
    });
    Ok(0)
}

/// Catalog totals and per-category counts
pub fn stats<S: CatalogStore + ?Sized>(store: &S, handler: &dyn OutputHandler) -> Result<i32> {
    let stats = catalog_stats(store)?;
    handler.emit(OutputEvent::Stats { stats });
    Ok(0)
}

/// Prune the catalog and rebuild the compatibility matrix
///
/// Exit code 1 when some pairs or deletions failed, 2 when another run is in
/// progress.
pub fn regenerate<S: CatalogStore + ?Sized>(
    store: &mut S,
    pruner: &CatalogPruner,
    handler: &dyn OutputHandler,
) -> Result<i32> {
    let tools = store.list_tools().context("reading catalog")?.len();
    handler.emit(OutputEvent::RegenerateStart { tools });

    match pruner.regenerate(store) {
        Ok(summary) => {
            let clean = summary.skipped == 0 && summary.prune_failures == 0;
            handler.emit(OutputEvent::Regenerated { summary });
            Ok(if clean { 0 } else { 1 })
        }
        Err(PruneError::Busy) => {
            handler.emit(OutputEvent::Error {
                error: PruneError::Busy.to_string(),
            });
            Ok(2)
        }
        Err(e) => Err(e).context("regeneration failed"),
    }
}

/// Report what a regeneration would keep, prune and reject
pub fn preview<S: CatalogStore + ?Sized>(
    store: &S,
    pruner: &CatalogPruner,
    handler: &dyn OutputHandler,
) -> Result<i32> {
    let tools = store.list_tools().context("reading catalog")?;
    let report = pruner.preview(store)?;

    let kept = report
        .connected()
        .iter()
        .map(|ranked| PreviewEntry {
            tool_id: ranked.tool.id,
            name: ranked.tool.name.clone(),
            detail: format!(
                "avg deviation {:.1}, rank {:.1}",
                ranked.avg_deviation, ranked.rank
            ),
        })
        .collect();

    let deviations: HashMap<ToolId, f64> = report
        .ranked
        .iter()
        .map(|ranked| (ranked.tool.id, ranked.avg_deviation))
        .collect();

    let pruned = report
        .pruned()
        .into_iter()
        .map(|tool| PreviewEntry {
            tool_id: tool.id,
            name: tool.name.clone(),
            detail: match deviations.get(&tool.id) {
                Some(deviation) => format!("past the selection limit (avg deviation {:.1})", deviation),
                None => "scores too close to neutral".into(),
            },
        })
        .collect();

    let rejected = tools
        .iter()
        .filter_map(|tool| {
            pruner.filter().rejection(tool).map(|reason| PreviewEntry {
                tool_id: tool.id,
                name: tool.name.clone(),
                detail: reason.to_string(),
            })
        })
        .collect();

    handler.emit(OutputEvent::Preview {
        kept,
        pruned,
        rejected,
    });
    Ok(0)
}

/// Harmony score of a stack of tools
pub fn harmony<S: CatalogStore + ?Sized>(
    store: &S,
    config: &AnalyticsConfig,
    references: &[String],
    handler: &dyn OutputHandler,
) -> Result<i32> {
    let tools = references
        .iter()
        .map(|reference| resolve_tool(store, reference))
        .collect::<Result<Vec<_>>>()?;

    let analytics = Analytics::load(store, config.clone())?;
    let ids: Vec<ToolId> = tools.iter().map(|t| t.id).collect();
    let score = analytics.harmony(&ids);

    handler.emit(OutputEvent::Harmony {
        tools: tools.into_iter().map(|t| t.name).collect(),
        score,
        strength: recommendation_strength(score),
        difficulty: difficulty(score),
    });
    Ok(0)
}

/// Most connected tools
pub fn hubs<S: CatalogStore + ?Sized>(
    store: &S,
    config: &AnalyticsConfig,
    query: &HubQuery,
    handler: &dyn OutputHandler,
) -> Result<i32> {
    let analytics = Analytics::load(store, config.clone())?;
    handler.emit(OutputEvent::Hubs {
        hubs: analytics.hubs(query),
    });
    Ok(0)
}

/// Average compatibility between categories
pub fn categories<S: CatalogStore + ?Sized>(
    store: &S,
    config: &AnalyticsConfig,
    handler: &dyn OutputHandler,
) -> Result<i32> {
    let analytics = Analytics::load(store, config.clone())?;
    handler.emit(OutputEvent::CategoryPairs {
        pairs: analytics.category_cross_analysis(),
    });
    Ok(0)
}

/// Compatibility of two tools: the stored record if any, else a fresh score
pub fn pair<S: CatalogStore + ?Sized>(
    store: &S,
    scorer: &Scorer,
    config: &AnalyticsConfig,
    first: &str,
    second: &str,
    handler: &dyn OutputHandler,
) -> Result<i32> {
    let one = resolve_tool(store, first)?;
    let two = resolve_tool(store, second)?;

    if one.id == two.id {
        handler.emit(OutputEvent::Error {
            error: format!("'{}' cannot be paired with itself", one.name),
        });
        return Ok(1);
    }

    let analytics = Analytics::load(store, config.clone())?;

    let report = match analytics.compatibility_between(one.id, two.id) {
        Some(record) => PairReport {
            tool_one: one.name,
            tool_two: two.name,
            score: record.compatibility_score,
            stored: true,
            verified: record.verified_integration,
            difficulty: record.integration_difficulty,
            strength: recommendation_strength(f64::from(record.compatibility_score)),
            notes: record.notes.clone(),
        },
        None => {
            let scored = scorer.score(&one, &two);
            PairReport {
                tool_one: one.name,
                tool_two: two.name,
                score: scored.score,
                stored: false,
                verified: scored.verified,
                difficulty: scored.difficulty,
                strength: recommendation_strength(f64::from(scored.score)),
                notes: scored.notes,
            }
        }
    };

    handler.emit(OutputEvent::Pair { report });
    Ok(0)
}

/// Fields of a hand-entered compatibility record
#[derive(Debug, Clone, Default)]
pub struct LinkRequest {
    pub score: u8,
    pub notes: Option<String>,
    pub verified: bool,
    /// Derived from the score when absent
    pub difficulty: Option<Difficulty>,
    pub setup_steps: Vec<String>,
    pub dependencies: Vec<String>,
}

/// Record a compatibility for a pair by hand
///
/// The CLI rejects scores above 100 while parsing. A `LinkRequest` built in
/// code skips that, so the score is checked again here before any lookup.
pub fn link<S: CatalogStore + ?Sized>(
    store: &mut S,
    first: &str,
    second: &str,
    request: &LinkRequest,
    handler: &dyn OutputHandler,
) -> Result<i32> {
    if request.score > 100 {
        handler.emit(OutputEvent::Error {
            error: format!("score {} is outside 0-100", request.score),
        });
        return Ok(1);
    }

    let one = resolve_tool(&*store, first)?;
    let two = resolve_tool(&*store, second)?;

    if one.id == two.id {
        handler.emit(OutputEvent::Error {
            error: format!("'{}' cannot be paired with itself", one.name),
        });
        return Ok(1);
    }

    let record = Compatibility {
        id: None,
        tool_one_id: one.id,
        tool_two_id: two.id,
        compatibility_score: request.score,
        notes: request.notes.clone().unwrap_or_default(),
        verified_integration: request.verified,
        integration_difficulty: request
            .difficulty
            .unwrap_or_else(|| difficulty(f64::from(request.score))),
        setup_steps: request.setup_steps.clone(),
        code_example: String::new(),
        dependencies: request.dependencies.clone(),
    };

    let compatibility = store
        .create_compatibility(&record)
        .with_context(|| format!("linking {} and {}", one.name, two.name))?;

    tracing::info!(
        tool_one = one.id,
        tool_two = two.id,
        score = request.score,
        "Linked tools"
    );

    handler.emit(OutputEvent::Linked { compatibility });
    Ok(0)
}

/// Print the effective configuration as TOML
pub fn show_config(config: &ToolmatrixConfig, handler: &dyn OutputHandler) -> Result<i32> {
    let toml = toml::to_string_pretty(config).context("serializing configuration")?;
    handler.emit(OutputEvent::Config { toml });
    Ok(0)
}
