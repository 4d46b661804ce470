//! Output generators.

pub mod csv;
