//! Request builder.
//!
//! Turns raw statements into validated requests:
//! - extracts the mandatory `label(...)` hint
//! - rejects labels already used on the same host
//! - rewrites the statement text for its query type

use crate::models::config::DatabaseConfig;
use crate::models::phase::{Host, Phase, QueryType};
use crate::models::request::Request;
use crate::Result;
use regex::Regex;
use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

fn label_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)label\(([^)]+)\)").expect("label pattern is valid"))
}

fn hint_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)/\*\+[^*]+\*/").expect("hint pattern is valid"))
}

/// Extract the label embedded in a statement's hint annotation.
pub fn extract_label(statement: &str) -> Option<String> {
    label_regex()
        .captures(statement)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|label| !label.is_empty())
}

/// Remove every `/*+ ... */` hint annotation.
pub fn strip_hints(statement: &str) -> String {
    hint_regex().replace_all(statement, "").into_owned()
}

/// Rewrite a statement for dispatch.
pub fn rewrite_statement(statement: &str, label: &str, query_type: QueryType) -> String {
    match query_type {
        QueryType::Ddl => strip_hints(statement),
        QueryType::Load => format!("{}\nSTREAM NAME '{}'", strip_hints(statement), label),
        QueryType::Dml | QueryType::Select => statement.to_string(),
    }
}

/// Builds requests for one host, keeping labels unique across its phases.
#[derive(Debug, Default)]
pub struct RequestBuilder {
    labels: HashSet<String>,
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build one request.
    pub fn build(
        &mut self,
        raw_statement: &str,
        host: &Host,
        phase: &Arc<Phase>,
        database: &Arc<DatabaseConfig>,
    ) -> Result<Request> {
        let label = extract_label(raw_statement)
            .ok_or_else(|| crate::Error::MissingLabel(raw_statement.trim().to_string()))?;

        if self.labels.contains(&label) {
            return Err(crate::Error::DuplicateLabel {
                phase: phase.name.clone(),
                label,
            });
        }

        let statement = rewrite_statement(raw_statement, &label, phase.query_type);
        self.labels.insert(label.clone());

        Ok(Request {
            host: host.clone(),
            label,
            statement,
            phase: Arc::clone(phase),
            database: Arc::clone(database),
        })
    }

    /// Build every request of a phase, failing on the first invalid statement.
    pub fn build_all(
        &mut self,
        statements: &[String],
        host: &Host,
        phase: &Arc<Phase>,
        database: &Arc<DatabaseConfig>,
    ) -> Result<Vec<Request>> {
        statements
            .iter()
            .map(|statement| self.build(statement, host, phase, database))
            .collect()
    }

    /// Labels handed out so far.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn phase(query_type: QueryType) -> Arc<Phase> {
        Arc::new(Phase {
            name: "phase".to_string(),
            sql_file: PathBuf::from("phase.sql"),
            query_type,
            pool_name: "general".to_string(),
            parallel: 1,
            analyze_tables: Vec::new(),
            analyze_constraints: Vec::new(),
        })
    }

    fn database() -> Arc<DatabaseConfig> {
        Arc::new(serde_json::from_str(r#"{"user": "dbadmin", "dbname": "bench"}"#).unwrap())
    }

    #[test]
    fn test_extract_label() {
        assert_eq!(
            extract_label("select /*+ LABEL( q_01 ) */ 1"),
            Some("q_01".to_string())
        );
        assert_eq!(extract_label("select 1"), None);
        assert_eq!(extract_label("select /*+ label() */ 1"), None);
    }

    #[test]
    fn test_missing_label_for_every_type() {
        for query_type in [QueryType::Dml, QueryType::Ddl, QueryType::Load, QueryType::Select] {
            let mut builder = RequestBuilder::new();
            let err = builder
                .build("insert into t values (1)", &Host::new("db1"), &phase(query_type), &database())
                .unwrap_err();
            assert!(matches!(err, crate::Error::MissingLabel(_)));
        }
    }

    #[test]
    fn test_ddl_strips_hints() {
        let mut builder = RequestBuilder::new();
        let request = builder
            .build(
                "create /*+ label(create_orders) */ table orders (id int)",
                &Host::new("db1"),
                &phase(QueryType::Ddl),
                &database(),
            )
            .unwrap();
        assert_eq!(request.label, "create_orders");
        assert!(!request.statement.contains("/*+"));
        assert!(!request.statement.contains("label("));
    }

    #[test]
    fn test_load_appends_stream_name() {
        let mut builder = RequestBuilder::new();
        let raw = "copy /*+ label(load_orders) */ orders from local '/data/orders.csv'";
        let request = builder
            .build(raw, &Host::new("db1"), &phase(QueryType::Load), &database())
            .unwrap();
        assert!(!request.statement.contains("/*+"));
        assert!(request.statement.ends_with("STREAM NAME 'load_orders'"));
    }

    #[test]
    fn test_dml_and_select_unchanged() {
        for query_type in [QueryType::Dml, QueryType::Select] {
            let mut builder = RequestBuilder::new();
            let raw = "\nselect /*+ label(q1) */ count(*) from orders\n";
            let request = builder
                .build(raw, &Host::new("db1"), &phase(query_type), &database())
                .unwrap();
            assert_eq!(request.statement, raw);
        }
    }

    #[test]
    fn test_duplicate_label_rejected() {
        let mut builder = RequestBuilder::new();
        let statements = vec![
            "select /*+ label(q1) */ 1".to_string(),
            "select /*+ label(q1) */ 2".to_string(),
        ];
        let err = builder
            .build_all(&statements, &Host::new("db1"), &phase(QueryType::Select), &database())
            .unwrap_err();
        assert!(matches!(err, crate::Error::DuplicateLabel { .. }));
    }
}
