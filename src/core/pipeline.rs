//! Pipeline controller.
//!
//! Runs every host in order and, per host, every phase in order. A failure on
//! one host is logged and handed to the report sink together with whatever
//! reports were collected; the next host still runs.

use super::cancel::CancellationToken;
use super::phase::{PhaseJob, PhaseRunner, PhaseSummary};
use super::provision::provision_host;
use super::reporter::ReportSink;
use super::request::RequestBuilder;
use super::statements::StatementSource;
use crate::models::config::{Config, DatabaseConfig};
use crate::models::phase::{Host, Phase};
use crate::models::request::Report;
use crate::services::executor::Executor;
use crate::Result;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Process-level overrides.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Parallelism applied to every phase instead of its own.
    pub parallel: Option<usize>,
    /// Skip phases before this one.
    pub start_phase: Option<String>,
    /// Do not recreate schema and resource pools.
    pub skip_provisioning: bool,
}

/// Result of one host.
#[derive(Debug, Clone, Serialize)]
pub struct HostOutcome {
    pub host: Host,
    pub phases: Vec<PhaseSummary>,
    pub reports: usize,
    pub failed_reports: usize,
    /// Host-level failure, if any.
    pub error: Option<String>,
    /// A phase was cut short, or the host stopped before a phase, on cancel.
    pub cancelled: bool,
    pub duration_ms: u64,
}

/// Result of a whole run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub hosts: Vec<HostOutcome>,
    pub cancelled: bool,
    pub duration_ms: u64,
}

impl RunSummary {
    /// No host failed and no statement failed.
    pub fn is_success(&self) -> bool {
        !self.cancelled
            && self
                .hosts
                .iter()
                .all(|h| h.error.is_none() && h.failed_reports == 0)
    }
}

/// Sequences hosts and phases.
pub struct PipelineController<E: Executor, S: StatementSource, R: ReportSink> {
    hosts: Vec<Host>,
    phases: Vec<Arc<Phase>>,
    database: Arc<DatabaseConfig>,
    poll_interval: Duration,
    executor: Arc<E>,
    statements: S,
    sink: R,
    options: RunOptions,
    shutdown: CancellationToken,
}

impl<E: Executor, S: StatementSource, R: ReportSink> PipelineController<E, S, R> {
    pub fn new(
        config: Config,
        executor: Arc<E>,
        statements: S,
        sink: R,
        options: RunOptions,
    ) -> Result<Self> {
        config.validate()?;
        if let Some(ref name) = options.start_phase {
            if config.phase(name).is_none() {
                return Err(crate::Error::config(format!("unknown start phase: {}", name)));
            }
        }
        if options.parallel == Some(0) {
            return Err(crate::Error::config("parallel override must be >= 1"));
        }

        Ok(Self {
            hosts: config.hosts,
            phases: config.sql_pipeline.into_iter().map(Arc::new).collect(),
            database: Arc::new(config.database),
            poll_interval: config.engine.poll_interval(),
            executor,
            statements,
            sink,
            options,
            shutdown: CancellationToken::new(),
        })
    }

    /// Token that stops the run from outside (e.g. on Ctrl-C).
    pub fn cancel_handle(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn sink(&self) -> &R {
        &self.sink
    }

    /// Phases that will run, honouring the start phase.
    pub fn selected_phases(&self) -> Vec<Arc<Phase>> {
        let mut started = self.options.start_phase.is_none();
        self.phases
            .iter()
            .filter(|phase| {
                if !started && self.options.start_phase.as_deref() == Some(phase.name.as_str()) {
                    started = true;
                }
                started
            })
            .cloned()
            .collect()
    }

    /// Run every host.
    pub async fn run(&mut self) -> RunSummary {
        let started = Instant::now();
        tracing::info!("START hosts={}", self.hosts.len());

        let mut summary = RunSummary::default();
        for host in self.hosts.clone() {
            if self.shutdown.is_cancelled() {
                tracing::warn!("Run cancelled, skipping host={}", host);
                summary.cancelled = true;
                break;
            }
            let outcome = self.run_host_and_report(&host).await;
            summary.cancelled |= outcome.cancelled;
            summary.hosts.push(outcome);
        }

        summary.duration_ms = started.elapsed().as_millis() as u64;
        tracing::info!("END time={}", summary.duration_ms);
        summary
    }

    async fn run_host_and_report(&mut self, host: &Host) -> HostOutcome {
        let started = Instant::now();
        tracing::info!("START host={}", host);

        let token = self.shutdown.child_token();
        let mut reports = Vec::new();
        let mut phases = Vec::new();
        let result = self.run_host(host, &token, &mut reports, &mut phases).await;

        // Workers are already joined; this releases anything else waiting on the token.
        token.cancel();

        let duration_ms = started.elapsed().as_millis() as u64;
        let cancelled = matches!(result, Err(crate::Error::Cancelled(_)));
        let error = match result {
            Ok(()) => {
                tracing::info!("END host={} duration={}", host, duration_ms);
                None
            }
            Err(e) => {
                tracing::error!("host={} failed: {}", host, e);
                Some(e.to_string())
            }
        };

        if let Err(e) = self.sink.publish(host, &reports) {
            tracing::error!("host={} could not publish reports: {}", host, e);
        }

        HostOutcome {
            host: host.clone(),
            phases,
            failed_reports: reports.iter().filter(|r| !r.is_ok()).count(),
            reports: reports.len(),
            error,
            cancelled,
            duration_ms,
        }
    }

    async fn run_host(
        &self,
        host: &Host,
        token: &CancellationToken,
        reports: &mut Vec<Report>,
        phases: &mut Vec<PhaseSummary>,
    ) -> Result<()> {
        let mut connection = self.executor.open(host, &self.database).await?;
        let result = self
            .run_phases(host, token, &mut connection, reports, phases)
            .await;
        self.executor.close(connection).await;
        result
    }

    async fn run_phases(
        &self,
        host: &Host,
        token: &CancellationToken,
        connection: &mut E::Connection,
        reports: &mut Vec<Report>,
        phases: &mut Vec<PhaseSummary>,
    ) -> Result<()> {
        if self.options.skip_provisioning {
            tracing::info!("Skipping provisioning on host={}", host);
        } else {
            provision_host(self.executor.as_ref(), connection, &self.database).await?;
        }

        let mut runner = PhaseRunner::new(
            Arc::clone(&self.executor),
            token.clone(),
            self.poll_interval,
        );
        let mut builder = RequestBuilder::new();

        for phase in self.selected_phases() {
            if token.is_cancelled() {
                return Err(crate::Error::Cancelled(format!(
                    "before phase {} on host {}",
                    phase.name, host
                )));
            }

            let parallelism = self.options.parallel.unwrap_or(phase.parallel);
            let statements = self.statements.statements(&phase)?;
            tracing::info!(
                "START host={} phase={} parallelism={} statements={}",
                host,
                phase.name,
                parallelism,
                statements.len()
            );

            let job = PhaseJob {
                host,
                phase: Arc::clone(&phase),
                database: Arc::clone(&self.database),
                parallelism,
                statements,
            };
            let summary = runner.run(job, &mut builder, connection, reports).await?;
            tracing::info!(
                "END host={} phase={} duration={} reports={} failed={}",
                host,
                phase.name,
                summary.duration_ms,
                summary.reported,
                summary.failed
            );

            let complete = summary.complete;
            phases.push(summary);
            if !complete {
                return Err(crate::Error::Cancelled(format!(
                    "during phase {} on host {}",
                    phase.name, host
                )));
            }
        }
        Ok(())
    }
}
