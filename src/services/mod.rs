//! External collaborators.

pub mod dry_run;
pub mod executor;
