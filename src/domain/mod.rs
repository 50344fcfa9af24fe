//! Domain layer for the exploration engine
//!
//! Deviation data, trust levels, task templates, configuration types and the
//! error taxonomy. No I/O happens here.

pub mod errors;
pub mod models;

pub use errors::{ConfigError, ExplorationError, ExplorationResult};
