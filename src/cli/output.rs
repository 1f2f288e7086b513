//! Output handlers for CLI commands
//!
//! Supports console (pretty), JSON, and quiet output modes. Command results go
//! to stdout; progress and diagnostics go to stderr.

use crate::catalog::{CatalogStats, Compatibility, Difficulty, ImportSummary, Tool, ToolId};
use crate::engine::{
    CategoryPairStats, RecommendationStrength, RegenerateSummary, ToolHub,
};
use serde::Serialize;

/// Output mode for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    #[default]
    Console,
    Json,
    Quiet,
}

impl OutputMode {
    /// Parse from string
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            "quiet" => Self::Quiet,
            _ => Self::Console,
        }
    }
}

/// A tool connected to the one being shown
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Partner {
    pub tool_id: ToolId,
    pub name: String,
    pub score: u8,
    pub difficulty: Difficulty,
}

/// One line of a regeneration preview
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewEntry {
    pub tool_id: ToolId,
    pub name: String,
    pub detail: String,
}

/// Compatibility of two named tools
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PairReport {
    pub tool_one: String,
    pub tool_two: String,
    pub score: u8,
    /// False when the score was computed on the fly rather than read from the matrix
    pub stored: bool,
    pub verified: bool,
    pub difficulty: Difficulty,
    pub strength: RecommendationStrength,
    pub notes: String,
}

/// Events emitted by CLI commands
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum OutputEvent {
    Imported {
        summary: ImportSummary,
    },
    Tools {
        tools: Vec<Tool>,
    },
    ToolDetail {
        tool: Tool,
        category: String,
        partners: Vec<Partner>,
    },
    Stats {
        stats: CatalogStats,
    },
    RegenerateStart {
        tools: usize,
    },
    Regenerated {
        summary: RegenerateSummary,
    },
    Preview {
        kept: Vec<PreviewEntry>,
        pruned: Vec<PreviewEntry>,
        rejected: Vec<PreviewEntry>,
    },
    Harmony {
        tools: Vec<String>,
        score: f64,
        strength: RecommendationStrength,
        difficulty: Difficulty,
    },
    Hubs {
        hubs: Vec<ToolHub>,
    },
    CategoryPairs {
        pairs: Vec<CategoryPairStats>,
    },
    Pair {
        report: PairReport,
    },
    Linked {
        compatibility: Compatibility,
    },
    Config {
        toml: String,
    },
    Debug {
        message: String,
    },
    Error {
        error: String,
    },
}

/// Output handler trait
pub trait OutputHandler: Send + Sync {
    /// Emit an event
    fn emit(&self, event: OutputEvent);

    /// Write final result
    fn result(&self, success: bool, output: Option<&str>);
}

/// Console output handler
pub struct ConsoleHandler {
    debug: bool,
}

impl ConsoleHandler {
    /// Create a new console handler
    pub fn new(debug: bool) -> Self {
        Self { debug }
    }

    fn format_score(score: f64) -> String {
        format!("{:.1}", score)
    }

    /// Result lines for events that carry command output
    fn lines(event: &OutputEvent) -> Vec<String> {
        match event {
            OutputEvent::Imported { summary } => vec![format!(
                "Imported {} categories: {} tools created, {} updated, {} skipped",
                summary.categories, summary.created, summary.updated, summary.skipped
            )],
            OutputEvent::Tools { tools } => {
                if tools.is_empty() {
                    return vec!["(no tools found)".into()];
                }
                tools
                    .iter()
                    .map(|t| format!("{:>5}  {} [{}]", t.id, t.name, t.category_id))
                    .collect()
            }
            OutputEvent::ToolDetail {
                tool,
                category,
                partners,
            } => {
                let mut lines = vec![format!("{} (#{})", tool.name, tool.id)];
                lines.push(format!("  category: {}", category));
                if let Some(ref description) = tool.description {
                    lines.push(format!("  {}", description));
                }
                if let Some(ref url) = tool.url {
                    lines.push(format!("  url: {}", url));
                }
                for (label, values) in [
                    ("languages", &tool.languages),
                    ("frameworks", &tool.frameworks),
                    ("features", &tool.features),
                    ("integrations", &tool.integrations),
                    ("strengths", &tool.strengths),
                    ("limitations", &tool.limitations),
                ] {
                    if !values.is_empty() {
                        lines.push(format!("  {}: {}", label, values.join(", ")));
                    }
                }
                if let Some(score) = tool.maturity_score {
                    lines.push(format!("  maturity: {}/10", score));
                }
                if let Some(score) = tool.popularity_score {
                    lines.push(format!("  popularity: {}/10", score));
                }
                if let Some(ref pricing) = tool.pricing {
                    lines.push(format!("  pricing: {}", pricing));
                }
                if partners.is_empty() {
                    lines.push("  (no compatibility records)".into());
                } else {
                    lines.push(format!("  compatible with ({}):", partners.len()));
                    lines.extend(partners.iter().map(|p| {
                        format!("    {:>3}  {} ({})", p.score, p.name, p.difficulty)
                    }));
                }
                lines
            }
            OutputEvent::Stats { stats } => {
                let mut lines = vec![
                    format!("Tools: {}", stats.total_tools),
                    format!("Categories: {}", stats.total_categories),
                ];
                lines.extend(
                    stats
                        .category_breakdown
                        .iter()
                        .map(|(name, count)| format!("  {:<28} {}", name, count)),
                );
                lines
            }
            OutputEvent::Regenerated { summary } => vec![
                format!(
                    "✓ Generated {} compatibilities for {} tools ({} skipped)",
                    summary.generated, summary.total_tools, summary.skipped
                ),
                format!(
                    "  pruned {} tools ({} failed), {} rejected by the quality filter",
                    summary.pruned, summary.prune_failures, summary.rejected
                ),
            ],
            OutputEvent::Preview {
                kept,
                pruned,
                rejected,
            } => {
                let mut lines = Vec::new();
                for (label, entries) in [("keep", kept), ("prune", pruned), ("reject", rejected)] {
                    lines.push(format!("{} ({}):", label, entries.len()));
                    lines.extend(
                        entries
                            .iter()
                            .map(|e| format!("  {:>5}  {} - {}", e.tool_id, e.name, e.detail)),
                    );
                }
                lines
            }
            OutputEvent::Harmony {
                tools,
                score,
                strength,
                difficulty,
            } => vec![format!(
                "Harmony of {}: {} ({}, {})",
                tools.join(" + "),
                Self::format_score(*score),
                strength,
                difficulty
            )],
            OutputEvent::Hubs { hubs } => {
                if hubs.is_empty() {
                    return vec!["(no connected tools)".into()];
                }
                hubs.iter()
                    .map(|h| {
                        format!(
                            "{:>6}  {:<24} {:>3} connections, {} high [{}]",
                            Self::format_score(h.avg_score),
                            h.name,
                            h.connection_count,
                            h.high_score_count,
                            h.category_id
                        )
                    })
                    .collect()
            }
            OutputEvent::CategoryPairs { pairs } => {
                if pairs.is_empty() {
                    return vec!["(no compatibility records)".into()];
                }
                pairs
                    .iter()
                    .map(|p| {
                        format!(
                            "{:>6}  {} / {} ({} pairs)",
                            Self::format_score(p.avg_score),
                            p.categories[0],
                            p.categories[1],
                            p.count
                        )
                    })
                    .collect()
            }
            OutputEvent::Pair { report } => {
                let source = if report.stored { "stored" } else { "computed" };
                vec![
                    format!(
                        "{} + {}: {} ({}, {}, {})",
                        report.tool_one,
                        report.tool_two,
                        report.score,
                        report.strength,
                        report.difficulty,
                        source
                    ),
                    format!("  {}", report.notes),
                ]
            }
            OutputEvent::Linked { compatibility } => vec![format!(
                "✓ Linked #{} and #{} at {}",
                compatibility.tool_one_id,
                compatibility.tool_two_id,
                compatibility.compatibility_score
            )],
            OutputEvent::Config { toml } => vec![toml.trim_end().to_string()],
            OutputEvent::RegenerateStart { .. }
            | OutputEvent::Debug { .. }
            | OutputEvent::Error { .. } => Vec::new(),
        }
    }
}

impl OutputHandler for ConsoleHandler {
    fn emit(&self, event: OutputEvent) {
        match event {
            OutputEvent::RegenerateStart { tools } => {
                eprintln!("Regenerating compatibility matrix ({} tools)...", tools);
            }
            OutputEvent::Debug { message } => {
                if self.debug {
                    eprintln!("[debug] {}", message);
                }
            }
            OutputEvent::Error { error } => {
                eprintln!("Error: {}", error);
            }
            other => {
                for line in Self::lines(&other) {
                    println!("{}", line);
                }
            }
        }
    }

    fn result(&self, _success: bool, output: Option<&str>) {
        if let Some(out) = output {
            println!("{}", out);
        }
    }
}

/// JSON output handler
pub struct JsonHandler {
    pretty: bool,
}

impl JsonHandler {
    /// Create a new JSON handler
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    fn render<T: Serialize>(&self, value: &T) -> Option<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        json.ok()
    }

    fn print_json<T: Serialize>(&self, value: &T) {
        if let Some(s) = self.render(value) {
            println!("{}", s);
        }
    }
}

impl OutputHandler for JsonHandler {
    fn emit(&self, event: OutputEvent) {
        self.print_json(&event);
    }

    fn result(&self, success: bool, output: Option<&str>) {
        #[derive(Serialize)]
        struct FinalResult<'a> {
            success: bool,
            output: Option<&'a str>,
        }

        self.print_json(&FinalResult { success, output });
    }
}

/// Quiet handler: errors only
pub struct QuietHandler;

impl OutputHandler for QuietHandler {
    fn emit(&self, event: OutputEvent) {
        if let OutputEvent::Error { error } = event {
            eprintln!("Error: {}", error);
        }
    }

    fn result(&self, _success: bool, output: Option<&str>) {
        if let Some(out) = output {
            println!("{}", out);
        }
    }
}

/// Create an output handler based on mode
pub fn create_handler(mode: OutputMode, debug: bool) -> Box<dyn OutputHandler> {
    match mode {
        OutputMode::Console => Box::new(ConsoleHandler::new(debug)),
        OutputMode::Json => Box::new(JsonHandler::new(true)),
        OutputMode::Quiet => Box::new(QuietHandler),
    }
}
