//! # symgraph CLI Module
//!
//! This module implements the CLI interface for symgraph.
//!
//! ## Available Commands
//!
//! - `find` - Resolve a dotted identifier through attribute lookup
//! - `navigate` - Resolve a dotted path through members only
//! - `canonical` - Canonical name of a dotted identifier
//! - `anypath` - Canonical shortest path of a dotted identifier
//! - `attrs` - Attributes of a node, optionally grouped by kind
//! - `node` - Look a node up by persisted id
//! - `walk` - Depth-first listing of everything under an identifier
//! - `complete` - Complete a dotted prefix
//! - `status` - Show graph metrics
//! - `import` - Import flat JSON records into the graph
//! - `export` - Export the graph (canonical or json)
//! - `convert` - Copy the graph to another backend
//! - `hash` - Compute BLAKE3 cryptographic hash of graph

mod commands;

use crate::config::{AppConfig, Backend};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use symgraph_core::{Kind, SymGraphError};

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// symgraph - Python symbol graph queries
///
/// Loads a persisted graph of importable Python symbols and resolves dotted
/// names against it.
#[derive(Parser, Debug)]
#[command(name = "symgraph")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file (default: ./symgraph.toml if present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the persisted graph (overrides the config file)
    #[arg(short = 'G', long, global = true)]
    pub graph: Option<PathBuf>,

    /// Storage backend (overrides the config file)
    #[arg(short = 'B', long, global = true, value_enum)]
    pub backend: Option<Backend>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve a dotted identifier (members, then type, then bases)
    Find {
        /// Dotted identifier, e.g. os.path.join
        ident: String,
    },

    /// Resolve a dotted path through members only
    Navigate {
        /// Dotted path
        path: String,
    },

    /// Print the canonical name of a dotted identifier
    Canonical {
        /// Dotted identifier
        ident: String,
    },

    /// Print the canonical shortest path of a dotted identifier
    Anypath {
        /// Dotted identifier
        ident: String,
    },

    /// List the attributes of a node
    Attrs {
        /// Dotted identifier
        ident: String,

        /// Group attribute names by the kind of their target
        #[arg(short = 'k', long)]
        by_kind: bool,
    },

    /// Look a node up by persisted id
    Node {
        /// Node id
        id: u64,
    },

    /// Walk everything reachable from an identifier through members
    Walk {
        /// Dotted identifier
        ident: String,

        /// Maximum number of nodes to print
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Complete a dotted prefix
    Complete {
        /// Prefix, e.g. "os.pa" or "js"
        prefix: String,

        /// Maximum number of nodes to print
        #[arg(short, long)]
        limit: Option<usize>,

        /// Also list everything under each match
        #[arg(short, long)]
        recursive: bool,
    },

    /// Show graph metrics
    Status,

    /// Import flat JSON records (a JSON array of node records)
    Import {
        /// Input files; records from all of them resolve against each other
        #[arg(short, long, required = true, num_args = 1..)]
        input: Vec<PathBuf>,

        /// Merge into the existing graph instead of replacing it
        #[arg(short, long)]
        merge: bool,

        /// Dotted paths to link into the graph after loading
        #[arg(short, long)]
        link: Vec<String>,

        /// Kind given to linked leaves
        #[arg(long, default_value = "module")]
        link_kind: Kind,
    },

    /// Export the graph
    Export {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Export format (canonical, json)
        #[arg(short = 't', long, default_value = "canonical")]
        format: String,
    },

    /// Copy the graph to another path and backend
    Convert {
        /// Destination path
        #[arg(short, long)]
        output: PathBuf,

        /// Destination backend
        #[arg(short = 't', long, value_enum)]
        to: Backend,
    },

    /// Compute BLAKE3 cryptographic hash of graph
    Hash,
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Settings a command runs with, after flags are applied over the config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub graph: PathBuf,
    pub backend: Backend,
    pub json_mode: bool,
    pub walk_limit: usize,
}

impl Settings {
    /// Apply command-line overrides to `config`.
    #[must_use]
    pub fn resolve(cli: &Cli, config: AppConfig) -> Self {
        Self {
            graph: cli.graph.clone().unwrap_or(config.graph),
            backend: cli.backend.unwrap_or(config.backend),
            json_mode: cli.json_mode,
            walk_limit: config.walk_limit,
        }
    }
}

/// Execute the CLI with parsed arguments and return the text to print.
pub fn execute(cli: Cli, config: AppConfig) -> Result<String, SymGraphError> {
    let settings = Settings::resolve(&cli, config);
    tracing::debug!(
        graph = %settings.graph.display(),
        backend = settings.backend.name(),
        "resolved settings"
    );

    match cli.command {
        Some(Commands::Find { ident }) => cmd_find(&settings, &ident),
        Some(Commands::Navigate { path }) => cmd_navigate(&settings, &path),
        Some(Commands::Canonical { ident }) => cmd_canonical(&settings, &ident),
        Some(Commands::Anypath { ident }) => cmd_anypath(&settings, &ident),
        Some(Commands::Attrs { ident, by_kind }) => cmd_attrs(&settings, &ident, by_kind),
        Some(Commands::Node { id }) => cmd_node(&settings, id),
        Some(Commands::Walk { ident, limit }) => cmd_walk(&settings, &ident, limit),
        Some(Commands::Complete {
            prefix,
            limit,
            recursive,
        }) => cmd_complete(&settings, &prefix, limit, recursive),
        Some(Commands::Status) => cmd_status(&settings),
        Some(Commands::Import {
            input,
            merge,
            link,
            link_kind,
        }) => cmd_import(&settings, &input, merge, &link, link_kind),
        Some(Commands::Export { output, format }) => cmd_export(&settings, &output, &format),
        Some(Commands::Convert { output, to }) => cmd_convert(&settings, &output, to),
        Some(Commands::Hash) => cmd_hash(&settings),
        None => {
            // No subcommand - show status by default
            cmd_status(&settings)
        }
    }
}
