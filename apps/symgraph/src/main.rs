//! # symgraph
//!
//! Command-line front end for the symgraph engine.
//!
//! Loads a persisted symbol graph (canonical file or redb database) and
//! answers queries against it, or converts graphs between formats.
//!
//! ## Usage
//!
//! ```bash
//! # Import explorer output and persist it
//! symgraph -G symbols.db import -i symbols.json
//!
//! # Queries
//! symgraph find os.path.join
//! symgraph canonical os.path.join
//! symgraph walk json --limit 50
//! symgraph complete os.pa
//! ```

use clap::Parser;
use symgraph::cli;
use symgraph::config::{AppConfig, LogFormat};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    let cli = cli::Cli::parse();

    // The config decides the log format, so it is loaded before tracing exists.
    let config = match AppConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    init_tracing(config.log_format, cli.verbose);

    match cli::execute(cli, config) {
        Ok(output) => print!("{}", output),
        Err(e) => {
            tracing::error!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Install the global subscriber. `RUST_LOG` wins over the defaults.
fn init_tracing(format: LogFormat, verbose: bool) {
    let default_filter = if verbose {
        "symgraph=debug,symgraph_core=debug"
    } else {
        "symgraph=info,symgraph_core=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
