//! Worker pool.
//!
//! Each worker drains the shared request queue until cancellation, runs every
//! request on a fresh connection and publishes exactly one report for it.
//! A failing or panicking statement is turned into an `error` report and the
//! worker goes straight back to the queue.

use super::cancel::{poll_dequeue, CancellationToken, Dequeued};
use super::queue::WorkQueue;
use crate::error::ExecutorError;
use crate::models::phase::QueryType;
use crate::models::request::{Outcome, Report, Request, Row};
use crate::services::executor::{setup_session, Executor};
use futures::future::join_all;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

/// Running workers of one phase.
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `worker_count` workers.
    pub fn start<E: Executor>(
        requests: &WorkQueue<Request>,
        reports: &WorkQueue<Report>,
        token: &CancellationToken,
        worker_count: usize,
        executor: Arc<E>,
        poll_interval: Duration,
    ) -> Self {
        let handles = (0..worker_count)
            .map(|id| {
                let requests = requests.clone();
                let reports = reports.clone();
                let token = token.clone();
                let executor = Arc::clone(&executor);
                tokio::spawn(async move {
                    worker_loop(id, executor, requests, reports, token, poll_interval).await;
                })
            })
            .collect();

        tracing::debug!("Started {} workers", worker_count);
        Self { handles }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait until every worker has observed cancellation and exited.
    ///
    /// Returns the number of workers that terminated abnormally.
    pub async fn join(self) -> usize {
        let mut failed = 0;
        for result in join_all(self.handles).await {
            if let Err(e) = result {
                tracing::error!("Worker terminated abnormally: {}", e);
                failed += 1;
            }
        }
        failed
    }
}

async fn worker_loop<E: Executor>(
    id: usize,
    executor: Arc<E>,
    requests: WorkQueue<Request>,
    reports: WorkQueue<Report>,
    token: CancellationToken,
    poll_interval: Duration,
) {
    loop {
        let request = match poll_dequeue(&requests, &token, poll_interval).await {
            Dequeued::Item(request) => request,
            Dequeued::Cancelled => break,
        };

        let report = execute_request(executor.as_ref(), request).await;
        tracing::debug!(
            "worker={} query_name=\"{}\" status={} duration={} result_size={} error={}",
            id,
            report.label,
            report.status,
            report.duration_ms,
            report.rows.len(),
            report.error
        );

        if let Err(e) = reports.push(report) {
            tracing::error!("worker={} could not publish report: {}", id, e);
        }
        requests.task_done();
    }
    tracing::trace!("worker={} exiting", id);
}

/// Execute one request and turn it into its report. Never fails.
pub async fn execute_request<E: Executor>(executor: &E, request: Request) -> Report {
    let started = Instant::now();

    let outcome = match AssertUnwindSafe(run_statement(executor, &request))
        .catch_unwind()
        .await
    {
        Ok(Ok(rows)) => Outcome::Rows(rows),
        Ok(Err(e)) => Outcome::Failed(e.to_string()),
        Err(panic) => Outcome::Failed(format!("executor panicked: {}", panic_message(panic.as_ref()))),
    };

    let duration_ms = started.elapsed().as_millis() as u64;
    request.into_report(outcome, duration_ms)
}

async fn run_statement<E: Executor>(
    executor: &E,
    request: &Request,
) -> Result<Vec<Row>, ExecutorError> {
    let mut connection = executor.open(&request.host, &request.database).await?;

    let result = async {
        setup_session(
            executor,
            &mut connection,
            &request.database.schema_name,
            &request.phase.pool_name,
        )
        .await?;

        let query_type = request.query_type();
        let rows = executor
            .run(&mut connection, &request.statement, query_type)
            .await?;
        if query_type.commits() {
            executor.run(&mut connection, "commit", QueryType::Ddl).await?;
        }

        Ok::<_, ExecutorError>(if query_type.expects_rows() { rows } else { Vec::new() })
    }
    .await;

    executor.close(connection).await;
    result
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
