//! Configuration model.

use super::phase::{Host, Phase};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "phase_runner.yaml";

/// Workload configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Hosts to run the pipeline against, in order.
    pub hosts: Vec<Host>,
    /// Database connection and provisioning settings.
    pub database: DatabaseConfig,
    /// Phases, in execution order.
    pub sql_pipeline: Vec<Phase>,
    /// Result output settings.
    #[serde(default)]
    pub results: ResultsConfig,
    /// Engine tuning.
    #[serde(default)]
    pub engine: EngineConfig,
    /// Directory relative SQL file paths are resolved against.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    pub user: String,
    #[serde(default)]
    pub password: String,
    pub dbname: String,
    /// Read timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default = "default_schema")]
    pub schema_name: String,
    /// Resource pools recreated during provisioning.
    #[serde(default)]
    pub resource_pools: Vec<ResourcePoolConfig>,
}

/// Resource pool declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourcePoolConfig {
    pub pool_name: String,
    pub maxmemorysize: String,
    pub maxconcurrency: u32,
    pub plannedconcurrency: u32,
}

/// Result output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultsConfig {
    /// Root directory for per-host result files.
    pub directory: PathBuf,
}

/// Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Cancellation polling interval in milliseconds.
    pub poll_interval_ms: u64,
}

impl Default for ResultsConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("results"),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
        }
    }
}

impl EngineConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

fn default_port() -> u16 {
    5433
}

fn default_timeout() -> u64 {
    600
}

fn default_schema() -> String {
    "public".to_string()
}

impl Config {
    /// Load and validate configuration from a YAML or TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(crate::Error::PathNotFound(path.display().to_string()));
        }

        let content = std::fs::read_to_string(path)?;
        let is_toml = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("toml"))
            .unwrap_or(false);

        let mut config: Config = if is_toml {
            toml::from_str(&content)?
        } else {
            serde_yml::from_str(&content)?
        };

        config.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        config.validate()?;
        tracing::debug!(
            "Loaded config {:?}: {} hosts, {} phases",
            path,
            config.hosts.len(),
            config.sql_pipeline.len()
        );
        Ok(config)
    }

    /// Check invariants serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.hosts.is_empty() {
            return Err(crate::Error::config("no hosts configured"));
        }
        if self.sql_pipeline.is_empty() {
            return Err(crate::Error::config("sql_pipeline is empty"));
        }

        let mut names = HashSet::new();
        for phase in &self.sql_pipeline {
            if !names.insert(phase.name.as_str()) {
                return Err(crate::Error::config(format!(
                    "duplicate phase name: {}",
                    phase.name
                )));
            }
            if phase.parallel == 0 {
                return Err(crate::Error::config(format!(
                    "phase {} must have parallel >= 1",
                    phase.name
                )));
            }
        }
        Ok(())
    }

    /// Resolve a phase's SQL file against the config directory.
    pub fn sql_path(&self, phase: &Phase) -> PathBuf {
        if phase.sql_file.is_absolute() {
            phase.sql_file.clone()
        } else {
            self.base_dir.join(&phase.sql_file)
        }
    }

    /// Resolve the results directory against the config directory.
    pub fn results_dir(&self) -> PathBuf {
        if self.results.directory.is_absolute() {
            self.results.directory.clone()
        } else {
            self.base_dir.join(&self.results.directory)
        }
    }

    pub fn phase(&self, name: &str) -> Option<&Phase> {
        self.sql_pipeline.iter().find(|p| p.name == name)
    }
}
