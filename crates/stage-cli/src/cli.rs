//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Stage - Import, export and repack resource bundles in disposable workspaces
#[derive(Parser, Debug)]
#[command(name = "stage")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (TOML, JSON or YAML)
    #[arg(long, global = true, env = "STAGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the cache root holding workspace directories
    #[arg(long, global = true)]
    pub cache_root: Option<PathBuf>,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Stage files into a new importer workspace and report what they contain
    ///
    /// Examples:
    ///   stage import a.flex b.txt          # Inspect two files
    ///   stage import --keep a.flex         # Leave the workspace on disk
    ///   stage import --json a.flex         # Machine-readable report
    Import {
        /// Files to import (paths or file:// URIs)
        #[arg(required = true)]
        locators: Vec<String>,

        /// Keep the workspace on disk until the next purge
        #[arg(long)]
        keep: bool,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Package a directory and a manifest into a bundle
    Export {
        /// Manifest file describing the bundle
        #[arg(short, long)]
        manifest: PathBuf,

        /// Directory whose contents go into the bundle
        #[arg(short, long)]
        source: PathBuf,

        /// Archive to write
        #[arg(short, long)]
        output: PathBuf,

        /// Keep the workspace on disk until the next purge
        #[arg(long)]
        keep: bool,
    },

    /// Unpack a bundle, check its manifest and pack it again
    Repack {
        /// Bundle to open
        bundle: PathBuf,

        /// Archive to write
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Remove workspace directories left behind by earlier runs
    Purge {
        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },
}
