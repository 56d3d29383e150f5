//! Stage CLI
//!
//! Imports, exports and repacks resource bundles through disposable
//! workspaces.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Control log verbosity (default: `stage=info`)
//! - `STAGE_CONFIG`: Configuration file, same as `--config`

mod cli;
mod commands;
mod context;
mod error;

use clap::Parser;
use colored::Colorize;
use stage_core::StageConfig;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use error::Result;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Some(cmd) => {
            let config = context::load_config(cli.config.as_deref(), cli.cache_root.as_deref())?;
            execute_command(cmd, config).await
        }
        None => {
            println!("{} Resource bundle workspaces", "stage".green().bold());
            println!();
            println!("Run {} for available commands.", "stage --help".cyan());
            Ok(())
        }
    }
}

/// Logs go to stderr so that `--json` output on stdout stays parseable.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("stage=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("stage=info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .init();
    tracing::debug!("Verbose mode enabled");
}

async fn execute_command(cmd: Commands, config: StageConfig) -> Result<()> {
    match cmd {
        Commands::Import {
            locators,
            keep,
            json,
        } => commands::run_import(config, &locators, keep, json).await,
        Commands::Export {
            manifest,
            source,
            output,
            keep,
        } => commands::run_export(config, &manifest, &source, &output, keep).await,
        Commands::Repack { bundle, output } => {
            commands::run_repack(config, &bundle, &output).await
        }
        Commands::Purge { json } => commands::run_purge(config, json).await,
    }
}
