//! wpmirror CLI - Multi-language WordPress mirror.
//!
//! Provides commands for:
//! - `serve`: Start the mirror server
//! - `warm`: Rebuild sitemaps and prefetch every page and asset
//! - `invalidate`: Re-render one page
//! - `clean`: Clear the cache
//! - `pages`: List the pages of a route

mod commands;
mod error;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{CleanArgs, InvalidateArgs, PagesArgs, ServeArgs, WarmArgs};
use error::CliError;
use output::Output;

/// Application version from Cargo.toml, also the cache format version.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// wpmirror - Multi-language WordPress mirror.
#[derive(Parser)]
#[command(name = "wpmirror", version, about)]
struct Cli {
    /// Path to configuration file (default: auto-discover wpmirror.toml).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the mirror server.
    Serve(ServeArgs),
    /// Rebuild sitemaps and prefetch every page and asset.
    Warm(WarmArgs),
    /// Re-render the translations of one page.
    Invalidate(InvalidateArgs),
    /// Clear the cache.
    Clean(CleanArgs),
    /// List the pages of a route.
    Pages(PagesArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Serve(args) => tokio::runtime::Runtime::new()
            .map_err(CliError::from)
            .and_then(|rt| rt.block_on(args.execute(config, VERSION))),
        Commands::Warm(args) => args.execute(config, VERSION),
        Commands::Invalidate(args) => args.execute(config, VERSION),
        Commands::Clean(args) => args.execute(config, VERSION),
        Commands::Pages(args) => args.execute(config, VERSION),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
