mod catalog;
mod cli;
mod config;
mod engine;
mod logging;

use anyhow::Result;
use catalog::{Difficulty, SqliteCatalog, ToolQuery};
use clap::{Parser, Subcommand};
use cli::{LinkRequest, OutputEvent, OutputHandler, OutputMode, commands, create_handler};
use config::ToolmatrixConfig;
use engine::{CatalogPruner, HubQuery, HubSort};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "toolmatrix")]
#[command(about = "Developer tool catalog with compatibility scoring and stack analytics")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Catalog database (overrides config)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Extra config file, applied after user and project config
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Project directory holding .toolmatrix/config.toml (defaults to current)
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    /// Output format: console, json or quiet
    #[arg(long, global = true, default_value = "console")]
    output: String,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,

    /// Suppress normal output
    #[arg(long, global = true)]
    quiet: bool,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Also write logs to a timestamped file in the data directory
    #[arg(long, global = true, conflicts_with = "log_file")]
    log: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Import categories and tools from a JSON seed file
    Import {
        /// Seed file
        file: PathBuf,
    },

    /// List tools, optionally filtered
    List {
        /// Category id (substring)
        #[arg(long)]
        category: Option<String>,

        /// Text in name, description or features
        #[arg(long)]
        search: Option<String>,

        /// Any of these languages
        #[arg(long = "language")]
        languages: Vec<String>,

        /// Any of these frameworks
        #[arg(long = "framework")]
        frameworks: Vec<String>,

        #[arg(long)]
        min_maturity: Option<u8>,

        #[arg(long)]
        min_popularity: Option<u8>,
    },

    /// Show a tool and its compatibility partners
    Show {
        /// Tool id or name
        tool: String,
    },

    /// Catalog totals per category
    Stats,

    /// Prune the catalog and rebuild the compatibility matrix
    Regenerate {
        /// Report what would be kept, pruned and rejected without writing
        #[arg(long)]
        dry_run: bool,
    },

    /// Harmony score of a stack of tools
    Harmony {
        /// Tool ids or names
        #[arg(required = true, num_args = 1..)]
        tools: Vec<String>,
    },

    /// Most connected tools
    Hubs {
        /// Only tools in this category
        #[arg(long)]
        category: Option<String>,

        /// Minimum average score
        #[arg(long)]
        min_score: Option<f64>,

        /// Order by score, connections or name
        #[arg(long, default_value = "score")]
        sort: HubSort,

        /// Number of hubs to show (defaults to config)
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Average compatibility between categories
    Categories,

    /// Compatibility of two tools
    Pair {
        /// Tool id or name
        first: String,

        /// Tool id or name
        second: String,
    },

    /// Record a compatibility between two tools by hand
    Link {
        /// Tool id or name
        first: String,

        /// Tool id or name
        second: String,

        /// Compatibility score (0-100)
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
        score: u8,

        #[arg(long)]
        notes: Option<String>,

        /// Mark as a verified integration
        #[arg(long)]
        verified: bool,

        /// easy, medium or hard (derived from the score when omitted)
        #[arg(long)]
        difficulty: Option<Difficulty>,

        /// Setup step (repeatable)
        #[arg(long = "step")]
        setup_steps: Vec<String>,

        /// Dependency (repeatable)
        #[arg(long = "dependency")]
        dependencies: Vec<String>,
    },

    /// Print the effective configuration
    Config,
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Import { .. } => "import",
            Commands::List { .. } => "list",
            Commands::Show { .. } => "show",
            Commands::Stats => "stats",
            Commands::Regenerate { .. } => "regenerate",
            Commands::Harmony { .. } => "harmony",
            Commands::Hubs { .. } => "hubs",
            Commands::Categories => "categories",
            Commands::Pair { .. } => "pair",
            Commands::Link { .. } => "link",
            Commands::Config => "config",
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mode = OutputMode::from_str(&cli.output);
    let quiet = cli.quiet || mode == OutputMode::Quiet;

    let log_file = match cli.log_file {
        Some(ref path) => Some(path.clone()),
        None if cli.log => Some(logging::default_log_path(cli.command.name())?),
        None => None,
    };
    logging::init_logging(cli.debug, quiet, log_file)?;

    let config = ToolmatrixConfig::load(cli.dir.as_deref(), cli.config.as_deref())?;
    let handler = create_handler(if cli.quiet { OutputMode::Quiet } else { mode }, cli.debug);

    let code = match cli.command {
        Commands::Config => commands::show_config(&config, &*handler)?,
        command => {
            let db_path = match cli.db.or_else(|| config.catalog.database_path()) {
                Some(path) => path,
                None => SqliteCatalog::default_path()?,
            };
            handler.emit(OutputEvent::Debug {
                message: format!("Using catalog at {}", db_path.display()),
            });

            let mut catalog = SqliteCatalog::open(&db_path)?;
            dispatch(command, &mut catalog, &config, &*handler)?
        }
    };

    handler.result(code == 0, None);

    if code != 0 {
        std::process::exit(code);
    }

    Ok(())
}

fn dispatch(
    command: Commands,
    catalog: &mut SqliteCatalog,
    config: &ToolmatrixConfig,
    handler: &dyn OutputHandler,
) -> Result<i32> {
    match command {
        Commands::Import { file } => commands::import(catalog, &file, handler),

        Commands::List {
            category,
            search,
            languages,
            frameworks,
            min_maturity,
            min_popularity,
        } => {
            let query = ToolQuery {
                text: search,
                category,
                min_maturity,
                min_popularity,
                frameworks,
                languages,
            };
            commands::list_tools(&*catalog, &query, handler)
        }

        Commands::Show { tool } => commands::show_tool(&*catalog, &tool, handler),

        Commands::Stats => commands::stats(&*catalog, handler),

        Commands::Regenerate { dry_run } => {
            let pruner = CatalogPruner::from_config(config)?;
            if dry_run {
                commands::preview(&*catalog, &pruner, handler)
            } else {
                commands::regenerate(catalog, &pruner, handler)
            }
        }

        Commands::Harmony { tools } => {
            commands::harmony(&*catalog, &config.analytics, &tools, handler)
        }

        Commands::Hubs {
            category,
            min_score,
            sort,
            limit,
        } => {
            let query = HubQuery {
                category,
                min_avg_score: min_score,
                sort,
                limit: limit.unwrap_or(config.analytics.hub_limit),
            };
            commands::hubs(&*catalog, &config.analytics, &query, handler)
        }

        Commands::Categories => commands::categories(&*catalog, &config.analytics, handler),

        Commands::Pair { first, second } => {
            let scorer = engine::Scorer::new(config.scoring.clone());
            commands::pair(&*catalog, &scorer, &config.analytics, &first, &second, handler)
        }

        Commands::Link {
            first,
            second,
            score,
            notes,
            verified,
            difficulty,
            setup_steps,
            dependencies,
        } => {
            let request = LinkRequest {
                score,
                notes,
                verified,
                difficulty,
                setup_steps,
                dependencies,
            };
            commands::link(catalog, &first, &second, &request, handler)
        }

        Commands::Config => commands::show_config(config, handler),
    }
}
