//! Error types for the phase runner.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the phase runner.
#[derive(Error, Debug)]
pub enum Error {
    // Validation errors
    #[error("Statement does not contain a label: {0}")]
    MissingLabel(String),

    #[error("Duplicate statement label '{label}' in phase {phase}")]
    DuplicateLabel { phase: String, label: String },

    // Phase-level errors
    #[error("Verification failed for table {table} in phase {phase}: {message}")]
    Verification {
        phase: String,
        table: String,
        message: String,
    },

    #[error("Run cancelled: {0}")]
    Cancelled(String),

    // Collaborator errors raised outside of a worker
    #[error("Executor error: {0}")]
    Executor(#[from] ExecutorError),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Path not found: {0}")]
    PathNotFound(String),

    #[error("Not a directory: {0}")]
    NotADirectory(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    // Generic errors
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a generic error from a string.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Error::Other(msg.into())
    }

    /// Create a configuration error from a string.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    /// Whether this error is a workload definition bug caught before dispatch.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::MissingLabel(_) | Error::DuplicateLabel { .. })
    }
}

/// Failure reported by an [`Executor`](crate::services::executor::Executor).
///
/// Driver detail is kept as an opaque message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutorError {
    #[error("Unable to connect to DB: {0}")]
    Connection(String),

    #[error("Unable to execute statement: {0}")]
    Execution(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_classification() {
        assert!(Error::MissingLabel("select 1".to_string()).is_validation());
        assert!(Error::DuplicateLabel {
            phase: "load".to_string(),
            label: "q1".to_string()
        }
        .is_validation());
        assert!(!Error::config("no hosts").is_validation());
    }

    #[test]
    fn test_executor_error_message() {
        let err = Error::from(ExecutorError::Connection("refused".to_string()));
        assert_eq!(err.to_string(), "Executor error: Unable to connect to DB: refused");
    }
}
