//! SQL file preflight check.

use super::CheckResult;
use crate::models::config::Config;

/// Check that every phase's SQL file can be read.
pub fn check(config: &Config) -> Vec<CheckResult> {
    config
        .sql_pipeline
        .iter()
        .map(|phase| {
            let name = format!("SQL {}", phase.name);
            let path = config.sql_path(phase);
            match std::fs::metadata(&path) {
                Ok(meta) if meta.is_file() => CheckResult::ok(&name, &path.display().to_string()),
                Ok(_) => CheckResult::fail(
                    &name,
                    &format!("{} is not a file", path.display()),
                    "Point sql_file at a SQL file",
                ),
                Err(_) => CheckResult::fail(
                    &name,
                    &format!("{} not found", path.display()),
                    "sql_file is resolved relative to the config file",
                ),
            }
        })
        .collect()
}
