//! Run command implementation.
//!
//! Loads the workload configuration and runs the pipeline on every host,
//! writing per-host result files.

use crate::core::cancel::CancellationToken;
use crate::core::pipeline::{PipelineController, RunOptions, RunSummary};
use crate::core::reporter::FileReportSink;
use crate::core::statements::SqlFileSource;
use crate::models::config::Config;
use crate::services::dry_run::DryRunExecutor;
use crate::Result;
use colored::Colorize;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;

/// Run the pipeline described by `config_path`.
pub async fn run(config_path: &Path, options: RunOptions, dry_run: bool) -> Result<RunSummary> {
    let config = Config::load(config_path)?;

    if !dry_run {
        return Err(crate::Error::config(
            "no database driver is built in; use --dry-run or embed the library with an Executor",
        ));
    }

    println!("{}", "[RUN] Running SQL pipeline (dry run)...".bold().cyan());
    println!("  {} {}", "Hosts:".bold(), config.hosts.len());
    println!("  {} {}", "Phases:".bold(), config.sql_pipeline.len());
    println!();

    let statements = SqlFileSource::new(config.base_dir.clone());
    let sink = FileReportSink::new(config.results_dir());
    let executor = Arc::new(DryRunExecutor::new());
    let mut controller =
        PipelineController::new(config, Arc::clone(&executor), statements, sink, options)?;

    let cancel = controller.cancel_handle();
    let ctrl_c = tokio::spawn(async move {
        if watch_interrupts(tokio::signal::ctrl_c, cancel).await {
            std::process::exit(130);
        }
    });

    let summary = controller.run().await;
    ctrl_c.abort();

    print_summary(&summary);
    tracing::debug!("Dry run saw {} statements", executor.statement_count());
    Ok(summary)
}

/// Cancel the run on the first interrupt.
///
/// Returns `true` on a second interrupt, meaning the caller should exit
/// without waiting for workers (an executor call may never return).
async fn watch_interrupts<F, Fut>(mut next_interrupt: F, cancel: CancellationToken) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<()>>,
{
    let mut received = 0;
    while next_interrupt().await.is_ok() {
        received += 1;
        if received == 1 {
            tracing::warn!("Interrupt received, stopping after the current polling interval");
            cancel.cancel();
        } else {
            tracing::error!("Second interrupt received, exiting without waiting for workers");
            return true;
        }
    }
    false
}

fn print_summary(summary: &RunSummary) {
    println!();
    println!("{}", "[Run Summary]".bold().green());
    for host in &summary.hosts {
        let status = match &host.error {
            None if host.failed_reports == 0 => "[OK]".green(),
            None => "[PARTIAL]".yellow(),
            Some(_) => "[FAILED]".red(),
        };
        println!(
            "  {} {} reports={} failed={} duration={}ms",
            status,
            host.host.to_string().bold(),
            host.reports,
            host.failed_reports,
            host.duration_ms
        );
        if let Some(ref error) = host.error {
            println!("    {} {}", "->".yellow(), error);
        }
    }
    if summary.cancelled {
        println!("  {}", "Run was cancelled".yellow());
    }
    println!("  {} {}ms", "Total time:".bold(), summary.duration_ms);
}
