//! Report sinks.
//!
//! The file sink prints one block per report and writes, per host:
//! - `<label>.csv` for every read query
//! - `summary.json` with every report minus its rows

use crate::generators::csv;
use crate::models::phase::{Host, QueryType};
use crate::models::request::{Report, ReportStatus};
use crate::utils::fs as fs_utils;
use crate::Result;
use chrono::Utc;
use colored::Colorize;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Receives the accumulated reports of one host.
pub trait ReportSink {
    fn publish(&mut self, host: &Host, reports: &[Report]) -> Result<()>;
}

/// Collects reports in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub published: Vec<(Host, Vec<Report>)>,
}

impl ReportSink for MemorySink {
    fn publish(&mut self, host: &Host, reports: &[Report]) -> Result<()> {
        self.published.push((host.clone(), reports.to_vec()));
        Ok(())
    }
}

/// Writes result files under a results directory and prints a summary.
#[derive(Debug, Clone)]
pub struct FileReportSink {
    results_dir: PathBuf,
    run_id: String,
    quiet: bool,
}

/// Per-host `summary.json` document.
#[derive(Debug, Serialize)]
struct HostSummary<'a> {
    run_id: &'a str,
    host: &'a Host,
    written_at: String,
    total: usize,
    failed: usize,
    reports: Vec<ReportEntry<'a>>,
}

#[derive(Debug, Serialize)]
struct ReportEntry<'a> {
    phase: &'a str,
    label: &'a str,
    status: ReportStatus,
    duration_ms: u64,
    rows: usize,
    #[serde(skip_serializing_if = "str::is_empty")]
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    result_file: Option<String>,
    /// The result file could not be written.
    #[serde(skip_serializing_if = "Option::is_none")]
    write_error: Option<String>,
}

impl FileReportSink {
    pub fn new<P: Into<PathBuf>>(results_dir: P) -> Self {
        Self {
            results_dir: results_dir.into(),
            run_id: Uuid::new_v4().to_string(),
            quiet: false,
        }
    }

    /// Do not print report blocks to stdout.
    pub fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Directory holding one host's result files.
    pub fn host_dir(&self, host: &Host) -> PathBuf {
        self.results_dir.join(fs_utils::safe_file_name(host.as_str()))
    }

    fn write_result_file(&self, host_dir: &Path, report: &Report) -> Result<PathBuf> {
        let path = host_dir.join(format!("{}.csv", fs_utils::safe_file_name(&report.label)));
        let mut content = String::new();
        for line in csv::render_rows(&report.rows) {
            content.push_str(&line);
            content.push('\n');
        }
        fs::write(&path, content)?;
        Ok(path)
    }

    fn print_report(&self, report: &Report, result_file: Option<&Path>) {
        if self.quiet {
            return;
        }
        println!("{}", "-".repeat(60));
        println!("-- host: {}", report.host);
        println!("-- phase: {}", report.phase);
        println!("-- query: {}", report.label.bold());
        let status = match report.status {
            ReportStatus::Ok => "ok".green(),
            ReportStatus::Error => "error".red(),
        };
        println!("-- return status: {}", status);
        println!("-- duration: {}", report.duration_ms);
        if !report.error.is_empty() {
            println!("-- error: {}", report.error.red());
        }
        if let Some(path) = result_file {
            println!("-- result_file_name: {}", path.display());
        }
    }
}

impl ReportSink for FileReportSink {
    fn publish(&mut self, host: &Host, reports: &[Report]) -> Result<()> {
        let host_dir = self.host_dir(host);
        fs_utils::create_dir_all(&host_dir)?;

        let mut entries = Vec::with_capacity(reports.len());
        for report in reports {
            let mut write_error = None;
            let result_file = if report.query_type == QueryType::Select {
                match self.write_result_file(&host_dir, report) {
                    Ok(path) => Some(path),
                    Err(e) => {
                        tracing::error!(
                            "host={} query_name=\"{}\" could not write result file: {}",
                            host,
                            report.label,
                            e
                        );
                        write_error = Some(e.to_string());
                        None
                    }
                }
            } else {
                None
            };
            self.print_report(report, result_file.as_deref());

            entries.push(ReportEntry {
                phase: &report.phase,
                label: &report.label,
                status: report.status,
                duration_ms: report.duration_ms,
                rows: report.rows.len(),
                error: &report.error,
                result_file: result_file.map(|p| p.display().to_string()),
                write_error,
            });
        }
        if !self.quiet {
            println!("{}", "-".repeat(60));
        }

        let summary = HostSummary {
            run_id: &self.run_id,
            host,
            written_at: Utc::now().to_rfc3339(),
            total: reports.len(),
            failed: reports.iter().filter(|r| !r.is_ok()).count(),
            reports: entries,
        };
        let summary_path = host_dir.join("summary.json");
        fs::write(&summary_path, serde_json::to_string_pretty(&summary)?)?;
        tracing::info!("Reports for host={} saved to {:?}", host, host_dir);
        Ok(())
    }
}
