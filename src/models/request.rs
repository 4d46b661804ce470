//! Request and report models.

use super::config::DatabaseConfig;
use super::phase::{Host, Phase, QueryType};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// One result row: column names with their values, in column order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row(pub Vec<(String, serde_json::Value)>);

impl Row {
    pub fn new(columns: Vec<(String, serde_json::Value)>) -> Self {
        Self(columns)
    }

    /// Look up a column value by name.
    pub fn get(&self, column: &str) -> Option<&serde_json::Value> {
        self.0
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(name, _)| name.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &serde_json::Value> {
        self.0.iter().map(|(_, value)| value)
    }
}

/// One statement bound to a host and a phase, waiting for execution.
#[derive(Debug, Clone)]
pub struct Request {
    pub host: Host,
    /// Label extracted from the statement.
    pub label: String,
    /// Statement text after classification rewrites.
    pub statement: String,
    pub phase: Arc<Phase>,
    pub database: Arc<DatabaseConfig>,
}

impl Request {
    pub fn query_type(&self) -> QueryType {
        self.phase.query_type
    }

    /// Turn the request into its terminal report.
    pub fn into_report(self, outcome: Outcome, duration_ms: u64) -> Report {
        let (status, error, rows) = match outcome {
            Outcome::Rows(rows) => (ReportStatus::Ok, String::new(), rows),
            Outcome::Failed(message) => (ReportStatus::Error, message, Vec::new()),
        };
        Report {
            host: self.host,
            phase: self.phase.name.clone(),
            query_type: self.phase.query_type,
            label: self.label,
            status,
            error,
            duration_ms,
            rows,
        }
    }
}

/// What happened when a worker executed a request.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Rows(Vec<Row>),
    Failed(String),
}

/// Terminal status of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Ok,
    Error,
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportStatus::Ok => f.write_str("ok"),
            ReportStatus::Error => f.write_str("error"),
        }
    }
}

/// Outcome record of one executed request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub host: Host,
    pub phase: String,
    pub query_type: QueryType,
    pub label: String,
    pub status: ReportStatus,
    /// Empty on success.
    pub error: String,
    pub duration_ms: u64,
    /// Empty unless the phase is a read query.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rows: Vec<Row>,
}

impl Report {
    pub fn is_ok(&self) -> bool {
        self.status == ReportStatus::Ok
    }
}
