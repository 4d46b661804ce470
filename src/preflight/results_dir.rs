//! Results directory preflight check.

use super::CheckResult;
use crate::models::config::Config;

/// Check that the results directory exists or can be created, and is writable.
pub fn check(config: &Config) -> CheckResult {
    let dir = config.results_dir();

    if let Err(e) = std::fs::create_dir_all(&dir) {
        return CheckResult::fail(
            "Results",
            &format!("cannot create {}: {}", dir.display(), e),
            "Set results.directory to a writable location",
        );
    }

    let probe = dir.join(".phase_runner_probe");
    match std::fs::write(&probe, b"") {
        Ok(()) => {
            let _ = std::fs::remove_file(&probe);
            CheckResult::ok("Results", &dir.display().to_string())
        }
        Err(e) => CheckResult::fail(
            "Results",
            &format!("{} is not writable: {}", dir.display(), e),
            "Set results.directory to a writable location",
        ),
    }
}
