//! Phase runner.
//!
//! Runs one phase on one host:
//! `Idle -> Dispatching -> Draining -> Verifying -> Closing -> Done`.
//!
//! `Closing` (cancel the phase token, join every worker) runs on every path,
//! including validation and verification failures.

use super::cancel::{poll_dequeue, CancellationToken, Dequeued};
use super::queue::WorkQueue;
use super::request::RequestBuilder;
use super::verify::verify_phase;
use super::worker::WorkerPool;
use crate::models::config::DatabaseConfig;
use crate::models::phase::{Host, Phase};
use crate::models::request::{Report, Request};
use crate::services::executor::Executor;
use crate::Result;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Lifecycle state of a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseState {
    Idle,
    Dispatching,
    Draining,
    Verifying,
    Closing,
    Done,
}

impl fmt::Display for PhaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// What a phase run produced.
#[derive(Debug, Clone, Serialize)]
pub struct PhaseSummary {
    pub phase: String,
    pub parallelism: usize,
    /// Requests enqueued.
    pub submitted: usize,
    /// Reports received, including late ones collected after `join`.
    pub reported: usize,
    /// Reports with `error` status.
    pub failed: usize,
    /// Requests removed from the queue without being executed.
    pub discarded: usize,
    /// All reports arrived before cancellation.
    pub complete: bool,
    pub duration_ms: u64,
}

/// Everything needed to run one phase on one host.
pub struct PhaseJob<'a> {
    pub host: &'a Host,
    pub phase: Arc<Phase>,
    pub database: Arc<DatabaseConfig>,
    pub parallelism: usize,
    pub statements: Vec<String>,
}

struct Drained {
    submitted: usize,
    complete: bool,
}

/// Runs phases with a dedicated worker pool per phase.
///
/// Each phase gets its own child of `parent`, so cancelling the parent stops
/// the running phase, and closing a phase never affects the parent.
pub struct PhaseRunner<E: Executor> {
    executor: Arc<E>,
    parent: CancellationToken,
    token: CancellationToken,
    poll_interval: Duration,
    state: PhaseState,
}

impl<E: Executor> PhaseRunner<E> {
    pub fn new(executor: Arc<E>, parent: CancellationToken, poll_interval: Duration) -> Self {
        let token = parent.child_token();
        Self {
            executor,
            parent,
            token,
            poll_interval,
            state: PhaseState::Idle,
        }
    }

    pub fn state(&self) -> PhaseState {
        self.state
    }

    /// Token of the current (or last) phase, shared with its workers.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Run one phase.
    ///
    /// Reports are appended to `reports` as they are drained, so they survive
    /// a verification failure. `connection` is the controller's own
    /// connection, used for verification.
    pub async fn run(
        &mut self,
        job: PhaseJob<'_>,
        builder: &mut RequestBuilder,
        connection: &mut E::Connection,
        reports: &mut Vec<Report>,
    ) -> Result<PhaseSummary> {
        let started = Instant::now();
        let parallelism = job.parallelism.max(1);
        let reports_before = reports.len();

        self.state = PhaseState::Idle;
        self.token = self.parent.child_token();

        let requests: WorkQueue<Request> = WorkQueue::new();
        let report_queue: WorkQueue<Report> = WorkQueue::new();
        let pool = WorkerPool::start(
            &requests,
            &report_queue,
            &self.token,
            parallelism,
            Arc::clone(&self.executor),
            self.poll_interval,
        );

        let outcome = self
            .dispatch_drain_verify(&job, builder, connection, &requests, &report_queue, reports)
            .await;

        // Closing
        self.enter(PhaseState::Closing, &job.phase.name);
        self.token.cancel();
        let mut discarded = requests.drain_ready().len();
        let abnormal = pool.join().await;
        if abnormal > 0 {
            tracing::error!("{} workers of phase {} did not exit cleanly", abnormal, job.phase.name);
        }
        // A worker holding the receiver can hide items from the first sweep.
        discarded += requests.drain_ready().len();
        for _ in 0..discarded {
            requests.task_done();
        }
        if discarded > 0 {
            tracing::warn!(
                "Discarded {} pending requests of phase {}",
                discarded,
                job.phase.name
            );
        }
        debug_assert!(
            abnormal > 0 || requests.unfinished() == 0,
            "{} requests of phase {} unaccounted for",
            requests.unfinished(),
            job.phase.name
        );
        let late = report_queue.drain_ready();
        if !late.is_empty() {
            tracing::debug!("Collected {} late reports", late.len());
            reports.extend(late);
        }
        self.enter(PhaseState::Done, &job.phase.name);

        let drained = outcome?;
        let phase_reports = &reports[reports_before..];
        Ok(PhaseSummary {
            phase: job.phase.name.clone(),
            parallelism,
            submitted: drained.submitted,
            reported: phase_reports.len(),
            failed: phase_reports.iter().filter(|r| !r.is_ok()).count(),
            discarded,
            complete: drained.complete,
            duration_ms: started.elapsed().as_millis() as u64,
        })
    }

    async fn dispatch_drain_verify(
        &mut self,
        job: &PhaseJob<'_>,
        builder: &mut RequestBuilder,
        connection: &mut E::Connection,
        requests: &WorkQueue<Request>,
        report_queue: &WorkQueue<Report>,
        reports: &mut Vec<Report>,
    ) -> Result<Drained> {
        // Every statement is validated before the first one is enqueued.
        self.enter(PhaseState::Dispatching, &job.phase.name);
        let built = builder.build_all(&job.statements, job.host, &job.phase, &job.database)?;
        let submitted = built.len();
        for request in built {
            requests.push(request)?;
        }

        self.enter(PhaseState::Draining, &job.phase.name);
        let received = self.drain(report_queue, submitted, reports).await;
        let complete = received == submitted;
        if !complete {
            tracing::warn!(
                "Phase {} cancelled after {} of {} reports, skipping verification",
                job.phase.name,
                received,
                submitted
            );
            return Ok(Drained {
                submitted,
                complete,
            });
        }
        self.enter(PhaseState::Verifying, &job.phase.name);
        verify_phase(self.executor.as_ref(), connection, &job.phase, &job.database).await?;

        Ok(Drained {
            submitted,
            complete,
        })
    }

    /// Collect up to `expected` reports, stopping early on cancellation.
    async fn drain(
        &self,
        report_queue: &WorkQueue<Report>,
        expected: usize,
        reports: &mut Vec<Report>,
    ) -> usize {
        let pb = ProgressBar::new(expected as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );

        let mut received = 0;
        while received < expected {
            match poll_dequeue(report_queue, &self.token, self.poll_interval).await {
                Dequeued::Item(report) => {
                    pb.set_message(report.label.clone());
                    pb.inc(1);
                    reports.push(report);
                    received += 1;
                }
                Dequeued::Cancelled => break,
            }
        }

        pb.finish_and_clear();
        received
    }

    fn enter(&mut self, next: PhaseState, phase: &str) {
        tracing::trace!("phase={} {} -> {}", phase, self.state, next);
        self.state = next;
    }
}
