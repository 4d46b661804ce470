//! Shared fixtures for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use phase_runner::core::statements::StatementSource;
use phase_runner::error::ExecutorError;
use phase_runner::models::config::{Config, DatabaseConfig};
use phase_runner::models::phase::{Host, Phase, QueryType};
use phase_runner::models::request::Row;
use phase_runner::services::executor::Executor;
use phase_runner::Result;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// In-memory executor driven by markers in statement text.
///
/// - statements containing a `fail_markers` entry fail with `boom: <marker>`
/// - statements containing a `panic_markers` entry panic mid-call
/// - selects return one row carrying the statement's label
/// - `analyze_constraints('<t>')` returns a violation for tables in `bad_tables`
#[derive(Default)]
pub struct ScriptedExecutor {
    pub delay: Duration,
    pub fail_markers: Vec<String>,
    pub panic_markers: Vec<String>,
    pub bad_tables: HashSet<String>,
    pub unreachable_hosts: HashSet<String>,
    log: Mutex<Vec<(String, String)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

pub struct ScriptedConnection {
    host: Host,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing_on(mut self, marker: &str) -> Self {
        self.fail_markers.push(marker.to_string());
        self
    }

    pub fn panicking_on(mut self, marker: &str) -> Self {
        self.panic_markers.push(marker.to_string());
        self
    }

    pub fn with_bad_table(mut self, table: &str) -> Self {
        self.bad_tables.insert(table.to_string());
        self
    }

    pub fn with_unreachable_host(mut self, host: &str) -> Self {
        self.unreachable_hosts.insert(host.to_string());
        self
    }

    /// Every statement run so far, in call order.
    pub fn statements(&self) -> Vec<String> {
        self.log.lock().unwrap().iter().map(|(_, s)| s.clone()).collect()
    }

    pub fn statements_for(&self, host: &str) -> Vec<String> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|(h, _)| h == host)
            .map(|(_, s)| s.clone())
            .collect()
    }

    pub fn saw(&self, needle: &str) -> bool {
        self.statements().iter().any(|s| s.contains(needle))
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Executor for ScriptedExecutor {
    type Connection = ScriptedConnection;

    async fn open(
        &self,
        host: &Host,
        _database: &DatabaseConfig,
    ) -> std::result::Result<ScriptedConnection, ExecutorError> {
        if self.unreachable_hosts.contains(host.as_str()) {
            return Err(ExecutorError::Connection(format!("{} refused connection", host)));
        }
        Ok(ScriptedConnection { host: host.clone() })
    }

    async fn run(
        &self,
        connection: &mut ScriptedConnection,
        statement: &str,
        query_type: QueryType,
    ) -> std::result::Result<Vec<Row>, ExecutorError> {
        self.log
            .lock()
            .unwrap()
            .push((connection.host.to_string(), statement.to_string()));

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if let Some(marker) = self.panic_markers.iter().find(|m| statement.contains(m.as_str())) {
            panic!("driver crashed on {}", marker);
        }
        if let Some(marker) = self.fail_markers.iter().find(|m| statement.contains(m.as_str())) {
            return Err(ExecutorError::Execution(format!("boom: {}", marker)));
        }

        if statement.contains("analyze_statistics(") {
            return Ok(vec![row(&[("analyze_result", Value::from(0))])]);
        }
        if statement.contains("analyze_constraints(") {
            let bad = self
                .bad_tables
                .iter()
                .any(|t| statement.contains(&format!("analyze_constraints('{}')", t)));
            return Ok(if bad {
                vec![row(&[("column_names", Value::from("customer_id"))])]
            } else {
                Vec::new()
            });
        }
        if query_type == QueryType::Select {
            let label = phase_runner::core::request::extract_label(statement).unwrap_or_default();
            return Ok(vec![row(&[("label", Value::from(label)), ("n", Value::from(1))])]);
        }
        Ok(Vec::new())
    }

    async fn close(&self, _connection: ScriptedConnection) {}
}

pub fn row(columns: &[(&str, Value)]) -> Row {
    Row::new(
        columns
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect(),
    )
}

/// Statement source keyed by phase name.
#[derive(Default)]
pub struct MapSource(pub HashMap<String, Vec<String>>);

impl MapSource {
    pub fn with(mut self, phase: &str, statements: Vec<String>) -> Self {
        self.0.insert(phase.to_string(), statements);
        self
    }
}

impl StatementSource for MapSource {
    fn statements(&self, phase: &Phase) -> Result<Vec<String>> {
        Ok(self.0.get(&phase.name).cloned().unwrap_or_default())
    }
}

/// Labelled statements `<prefix>_0 .. <prefix>_<count-1>`.
pub fn labelled(prefix: &str, count: usize, body: &str) -> Vec<String> {
    (0..count)
        .map(|i| format!("{} /*+ label({}_{}) */ {}", verb(body), prefix, i, rest(body)))
        .collect()
}

fn verb(body: &str) -> &str {
    body.split_whitespace().next().unwrap_or("select")
}

fn rest(body: &str) -> &str {
    body.split_once(' ').map(|(_, r)| r).unwrap_or("")
}

pub fn phase(name: &str, query_type: QueryType, parallel: usize) -> Phase {
    Phase {
        name: name.to_string(),
        sql_file: PathBuf::from(format!("{}.sql", name)),
        query_type,
        pool_name: "general".to_string(),
        parallel,
        analyze_tables: Vec::new(),
        analyze_constraints: Vec::new(),
    }
}

pub fn database() -> DatabaseConfig {
    serde_json::from_str(
        r#"{
            "user": "dbadmin",
            "dbname": "bench",
            "schema_name": "bench",
            "resource_pools": [
                {"pool_name": "load_pool", "maxmemorysize": "10%", "maxconcurrency": 4, "plannedconcurrency": 4}
            ]
        }"#,
    )
    .unwrap()
}

pub fn config(hosts: &[&str], phases: Vec<Phase>) -> Config {
    Config {
        hosts: hosts.iter().map(|h| Host::new(*h)).collect(),
        database: database(),
        sql_pipeline: phases,
        results: Default::default(),
        engine: phase_runner::models::config::EngineConfig {
            poll_interval_ms: 10,
        },
        base_dir: PathBuf::new(),
    }
}

pub fn shared(executor: ScriptedExecutor) -> Arc<ScriptedExecutor> {
    Arc::new(executor)
}
