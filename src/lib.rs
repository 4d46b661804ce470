//! Phase Runner Library
//!
//! Runs declarative, multi-phase SQL workloads against database hosts with a
//! bounded-parallelism worker pool per phase.

pub mod cli;
pub mod core;
pub mod error;
pub mod generators;
pub mod models;
pub mod preflight;
pub mod services;
pub mod utils;

pub use error::{Error, Result};
