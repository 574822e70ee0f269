//! Nereus CLI - code-relationship graph analysis from the command line.
//!
//! Nereus reads the entity/relation graph an indexer produced and answers
//! call-graph, impact, cycle and ranking questions about it.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use colored::Colorize;
use nereus::{CallDirection, CycleStrategy};
use tracing_subscriber::EnvFilter;

mod cli;

use cli::Context;

/// Nereus: code-relationship graph analysis.
#[derive(Parser)]
#[command(name = "nereus")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Graph database path
    #[arg(long, global = true, default_value = ".nereus/graph.db")]
    db: PathBuf,

    /// Configuration file (defaults are used if it does not exist)
    #[arg(long, global = true, default_value = ".nereus/config.yaml")]
    config: PathBuf,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a JSON graph snapshot into the database
    Import {
        /// Snapshot file (`{"entities": [...], "relations": [...]}`)
        snapshot: PathBuf,
    },

    /// Resolve an identifier (id, name, qualified suffix or `file::name`)
    Resolve {
        /// Identifier to resolve
        identifier: String,
    },

    /// Search entities by name
    Search {
        /// Search pattern (case-insensitive substring)
        pattern: String,

        /// Filter by entity kind (function, method, class, module, ...)
        #[arg(short, long)]
        kind: Option<String>,

        /// Maximum number of results
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Show the caller tree of a function
    Callers {
        /// Function name or identifier
        name: String,

        /// Tree depth (defaults to the configured depth)
        #[arg(short, long)]
        depth: Option<u32>,
    },

    /// Show the callee tree of a function
    Callees {
        /// Function name or identifier
        name: String,

        /// Tree depth (defaults to the configured depth)
        #[arg(short, long)]
        depth: Option<u32>,
    },

    /// Analyze the impact of changing one or more files
    Impact {
        /// Changed files, relative to the repository root
        #[arg(required = true)]
        files: Vec<String>,
    },

    /// Detect circular import dependencies
    Cycles {
        /// Maximum files per cycle (defaults to the configured depth)
        #[arg(short, long)]
        max_depth: Option<u32>,

        /// Search strategy: path-tracking or three-color
        #[arg(short, long)]
        strategy: Option<CycleStrategy>,

        /// List groups of mutually importing files instead (no depth bound)
        #[arg(long)]
        scc: bool,
    },

    /// Rank entities by connectivity
    Hotspots {
        /// Maximum number of results
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Rank functions by line span
    Largest {
        /// Maximum number of results
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Suggest refactorings for one entity
    Refactor {
        /// Identifier to resolve
        identifier: String,
    },

    /// Show graph statistics
    Stats,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let ctx = Context {
        db: cli.db,
        config: cli.config,
        json: cli.json,
    };

    let result = match cli.command {
        Commands::Import { snapshot } => cli::import::run(&ctx, &snapshot),
        Commands::Resolve { identifier } => cli::resolve::run(&ctx, &identifier),
        Commands::Search {
            pattern,
            kind,
            limit,
        } => cli::search::run(&ctx, &pattern, kind.as_deref(), limit),
        Commands::Callers { name, depth } => {
            cli::callgraph::run(&ctx, &name, depth, CallDirection::Callers)
        }
        Commands::Callees { name, depth } => {
            cli::callgraph::run(&ctx, &name, depth, CallDirection::Callees)
        }
        Commands::Impact { files } => cli::impact::run(&ctx, &files),
        Commands::Cycles {
            max_depth,
            strategy,
            scc,
        } => cli::cycles::run(&ctx, max_depth, strategy, scc),
        Commands::Hotspots { limit } => cli::ranking::hotspots(&ctx, limit),
        Commands::Largest { limit } => cli::ranking::largest(&ctx, limit),
        Commands::Refactor { identifier } => cli::ranking::refactor(&ctx, &identifier),
        Commands::Stats => cli::stats::run(&ctx),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {e}", "error".red().bold());
            // Show cause chain for nested errors
            let mut source = std::error::Error::source(&e);
            while let Some(cause) = source {
                eprintln!("  {}: {cause}", "caused by".dimmed());
                source = std::error::Error::source(cause);
            }
            ExitCode::FAILURE
        }
    }
}
