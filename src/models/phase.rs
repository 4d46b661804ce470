//! Workload model: hosts, phases and query classification.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Address of one target database instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Host(String);

impl Host {
    pub fn new<S: Into<String>>(address: S) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Query classification of every statement in a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    /// Data manipulation, committed after execution.
    Dml,
    /// Schema definition. The dialect rejects hint annotations here.
    Ddl,
    /// Bulk load, correlated with its label through a stream name.
    Load,
    /// Read query producing a result set.
    Select,
}

impl QueryType {
    /// Whether the executor should hand back rows.
    pub fn expects_rows(self) -> bool {
        matches!(self, QueryType::Select)
    }

    /// Whether a `COMMIT` follows execution.
    pub fn commits(self) -> bool {
        matches!(self, QueryType::Dml)
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QueryType::Dml => "dml",
            QueryType::Ddl => "ddl",
            QueryType::Load => "load",
            QueryType::Select => "select",
        };
        f.write_str(name)
    }
}

/// One named batch of statements with its own parallelism.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Phase {
    /// Phase name, unique within the pipeline.
    pub name: String,
    /// SQL file holding the phase statements.
    pub sql_file: PathBuf,
    /// Classification of every statement in the file.
    pub query_type: QueryType,
    /// Resource pool the statements run in.
    #[serde(default = "default_pool_name")]
    pub pool_name: String,
    /// Number of concurrent workers.
    #[serde(default = "default_parallel")]
    pub parallel: usize,
    /// Tables to refresh statistics for and audit after the phase.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub analyze_tables: Vec<String>,
    /// Additional tables to audit after the phase.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub analyze_constraints: Vec<String>,
}

impl Phase {
    /// Tables checked by the post-phase verification step, in order.
    pub fn verify_tables(&self) -> impl Iterator<Item = &str> {
        self.analyze_tables
            .iter()
            .chain(self.analyze_constraints.iter())
            .map(String::as_str)
    }

    pub fn needs_verification(&self) -> bool {
        !self.analyze_tables.is_empty() || !self.analyze_constraints.is_empty()
    }
}

fn default_pool_name() -> String {
    "general".to_string()
}

fn default_parallel() -> usize {
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_type_shape() {
        assert!(QueryType::Select.expects_rows());
        assert!(!QueryType::Dml.expects_rows());
        assert!(QueryType::Dml.commits());
        assert!(!QueryType::Load.commits());
    }

    #[test]
    fn test_phase_defaults() {
        let phase: Phase = serde_json::from_str(
            r#"{"name": "ddl", "sql_file": "ddl.sql", "query_type": "ddl"}"#,
        )
        .unwrap();
        assert_eq!(phase.parallel, 1);
        assert_eq!(phase.pool_name, "general");
        assert!(!phase.needs_verification());
    }

    #[test]
    fn test_verify_tables_order() {
        let phase = Phase {
            name: "load".to_string(),
            sql_file: PathBuf::from("load.sql"),
            query_type: QueryType::Load,
            pool_name: "load_pool".to_string(),
            parallel: 4,
            analyze_tables: vec!["orders".to_string()],
            analyze_constraints: vec!["customers".to_string()],
        };
        let tables: Vec<_> = phase.verify_tables().collect();
        assert_eq!(tables, vec!["orders", "customers"]);
    }
}
