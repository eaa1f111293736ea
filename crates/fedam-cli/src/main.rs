//! fedam CLI - naming, configuration and allocation planning for the fedam aggregate manager.

use clap::{Parser, Subcommand};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::config::ConfigArgs;
use commands::{config, names, plan, urn};

#[derive(Parser)]
#[command(name = "fedam")]
#[command(about = "fedam aggregate manager naming and allocation planning CLI")]
struct Cli {
    /// Log filter (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a federation URN and show its parts
    Urn {
        /// URN to parse
        urn: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the slice hash and sliver names derived for a slice
    Names {
        /// Slice URN
        slice: String,
        /// Node client ids
        client_ids: Vec<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the objects a request RSpec would create, without creating them
    Plan {
        /// Request RSpec file (or stdin if not provided)
        rspec: Option<String>,
        /// Slice URN
        #[arg(long)]
        slice: String,
        /// Caller URN
        #[arg(long)]
        user: String,
        #[command(flatten)]
        config: ConfigArgs,
        /// Output the planned objects as JSON
        #[arg(long, conflicts_with = "manifest")]
        json: bool,
        /// Output the manifest RSpec
        #[arg(long)]
        manifest: bool,
    },
    /// Print the effective configuration as JSON
    Config {
        #[command(flatten)]
        config: ConfigArgs,
    },
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let result = match cli.command {
        Commands::Urn { urn, json } => urn::run(urn, json),
        Commands::Names {
            slice,
            client_ids,
            json,
        } => names::run(slice, client_ids, json),
        Commands::Plan {
            rspec,
            slice,
            user,
            config,
            json,
            manifest,
        } => plan::run(rspec, slice, user, config, json, manifest),
        Commands::Config { config } => config::run(config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
