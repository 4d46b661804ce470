//! Phase Runner CLI
//!
//! A command-line tool for running phased, parallel SQL workloads against database hosts.

use clap::Parser;
use phase_runner::cli::{
    args::{Cli, Commands},
    commands::{check, run},
};
use phase_runner::core::pipeline::RunOptions;
use phase_runner::models::config::Config;
use phase_runner::preflight;
use std::path::Path;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose);

    match cli.command {
        Commands::Run {
            config,
            parallel,
            phase,
            skip_init_db,
            dry_run,
        } => {
            // Run preflight checks unless skipped
            if !cli.skip_preflight {
                run_preflight_checks(&config)?;
            }

            let options = RunOptions {
                parallel,
                start_phase: phase,
                skip_provisioning: skip_init_db,
            };
            let summary = run::run(&config, options, dry_run).await?;
            if !summary.is_success() {
                anyhow::bail!("Pipeline finished with failures");
            }
        }

        Commands::Check { config } => {
            check::check(&config)?;
        }
    }

    Ok(())
}

/// Initialize the logging system.
fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("phase_runner=debug")
    } else {
        EnvFilter::new("phase_runner=info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();
}

/// Run preflight checks and exit if any fail.
fn run_preflight_checks(config_path: &Path) -> anyhow::Result<()> {
    use colored::Colorize;

    println!("{}", "Running preflight checks...".bold());
    println!();

    let config = Config::load(config_path)?;
    let results = preflight::run_preflight_checks(&config);
    preflight::print_results(&results);

    println!();

    if !preflight::all_passed(&results) {
        anyhow::bail!("Preflight checks failed. Fix the issues above and try again.");
    }

    Ok(())
}
