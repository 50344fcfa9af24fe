//! Configuration management infrastructure
//!
//! Hierarchical configuration using figment:
//! - YAML file loading
//! - Environment variable overrides
//! - Configuration validation

pub mod loader;

pub use crate::domain::errors::ConfigError;
pub use loader::{ConfigLoader, ENV_PREFIX};
