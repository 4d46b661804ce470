//! Data models.

pub mod config;
pub mod phase;
pub mod request;
