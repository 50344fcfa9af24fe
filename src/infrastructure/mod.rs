//! Infrastructure layer module
//!
//! Configuration loading and logging setup. Nothing in here knows about
//! exploration reports or schedulers.

pub mod config;
pub mod logging;
