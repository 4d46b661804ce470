//! Command line argument definitions.

use crate::models::config::DEFAULT_CONFIG_FILE;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Phase Runner - Run phased, parallel SQL workloads against database hosts
#[derive(Parser, Debug)]
#[command(name = "phase-runner")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true, visible_alias = "debug")]
    pub verbose: bool,

    /// Skip preflight checks
    #[arg(long, global = true)]
    pub skip_preflight: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the SQL pipeline against every configured host
    Run {
        /// YAML (or .toml) workload configuration
        #[arg(short, long, value_name = "CONFIG", default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,

        /// Override the parallelism of every phase
        #[arg(short, long, value_name = "N")]
        parallel: Option<usize>,

        /// Start from this phase; earlier phases are skipped
        #[arg(long, value_name = "PHASE")]
        phase: Option<String>,

        /// Do not recreate the schema and resource pools
        #[arg(short, long)]
        skip_init_db: bool,

        /// Log statements instead of sending them to a database
        #[arg(long)]
        dry_run: bool,
    },

    /// Validate the configuration and every statement without running anything
    Check {
        /// YAML (or .toml) workload configuration
        #[arg(short, long, value_name = "CONFIG", default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,
    },
}
