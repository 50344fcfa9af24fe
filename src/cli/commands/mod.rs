//! CLI command implementations.

pub mod status;
pub mod validate;

use std::path::Path;

use anyhow::{Context, Result};

use crate::domain::models::Config;
use crate::infrastructure::config::ConfigLoader;
use crate::infrastructure::logging::LoggerImpl;

/// Load configuration and install the logger it describes. The returned
/// logger must be kept alive for file output to be flushed.
fn load_config_with_logging(path: &Path) -> Result<(Config, LoggerImpl)> {
    let config = ConfigLoader::load(path)?;
    let logger = LoggerImpl::init(&config.logging).context("Failed to initialize logging")?;
    Ok((config, logger))
}
