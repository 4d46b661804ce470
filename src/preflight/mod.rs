//! Preflight checks module.

mod results_dir;
mod sql_files;

use crate::models::config::Config;
use colored::Colorize;

/// Result of a preflight check.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub success: bool,
    pub message: String,
    pub hint: Option<String>,
}

impl CheckResult {
    pub fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            success: true,
            message: message.to_string(),
            hint: None,
        }
    }

    pub fn fail(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            success: false,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }
}

/// Run all preflight checks.
pub fn run_preflight_checks(config: &Config) -> Vec<CheckResult> {
    let mut results = sql_files::check(config);
    results.push(results_dir::check(config));
    results
}

/// Print preflight check results.
pub fn print_results(results: &[CheckResult]) {
    for result in results {
        if result.success {
            println!(
                "{} {}: {}",
                "[OK]".green(),
                result.name.bold(),
                result.message
            );
        } else {
            println!(
                "{} {}: {}",
                "[FAIL]".red(),
                result.name.bold(),
                result.message
            );
            if let Some(ref hint) = result.hint {
                println!("  {} {}", "->".yellow(), hint);
            }
        }
    }
}

/// Check if all preflight checks passed.
pub fn all_passed(results: &[CheckResult]) -> bool {
    results.iter().all(|r| r.success)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> Config {
        let yaml = r#"
hosts: [db1]
database: {user: dbadmin, dbname: bench}
sql_pipeline:
  - {name: ddl, sql_file: ddl.sql, query_type: ddl}
  - {name: load, sql_file: load.sql, query_type: load}
results: {directory: out}
"#;
        let mut config: Config = serde_yml::from_str(yaml).unwrap();
        config.base_dir = dir.path().to_path_buf();
        config
    }

    #[test]
    fn test_missing_sql_file_fails() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("ddl.sql"), "create /*+ label(a) */ table t (i int)").unwrap();

        let results = run_preflight_checks(&config(&temp_dir));
        assert_eq!(results.len(), 3);
        assert!(results[0].success);
        assert!(!results[1].success);
        assert!(results[2].success);
        assert!(!all_passed(&results));
        assert!(temp_dir.path().join("out").is_dir());
    }
}
