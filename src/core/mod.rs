//! Phase execution engine.

pub mod cancel;
pub mod phase;
pub mod pipeline;
pub mod provision;
pub mod queue;
pub mod reporter;
pub mod request;
pub mod statements;
pub mod verify;
pub mod worker;
