//! Check command implementation.
//!
//! Builds every request of the pipeline without executing anything, so label
//! and configuration mistakes surface before a run.

use crate::core::request::RequestBuilder;
use crate::core::statements::{SqlFileSource, StatementSource};
use crate::models::config::Config;
use crate::Result;
use colored::Colorize;
use std::path::Path;
use std::sync::Arc;

/// Validate configuration and statements. Returns the number of requests.
pub fn check(config_path: &Path) -> Result<usize> {
    println!("{}", "[CHECK] Validating pipeline...".bold().cyan());

    let config = Config::load(config_path)?;
    let source = SqlFileSource::new(config.base_dir.clone());
    let database = Arc::new(config.database.clone());
    let host = &config.hosts[0];

    let mut builder = RequestBuilder::new();
    let mut total = 0;
    for phase in &config.sql_pipeline {
        let phase = Arc::new(phase.clone());
        let statements = source.statements(&phase)?;
        let requests = builder.build_all(&statements, host, &phase, &database)?;
        println!(
            "{} {}: {} statements ({}, parallel {})",
            "[OK]".green(),
            phase.name.bold(),
            requests.len(),
            phase.query_type,
            phase.parallel
        );
        total += requests.len();
    }

    println!();
    println!("{} {} requests across {} hosts", "[OK]".green(), total, config.hosts.len());
    Ok(total)
}
