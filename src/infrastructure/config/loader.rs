use std::path::Path;

use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};

use crate::domain::errors::ConfigError;
use crate::domain::models::config::Config;

/// Environment variable prefix; nested keys are separated by `__`.
pub const ENV_PREFIX: &str = "MLIP_EXPLORE_";

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. The YAML file at `path` (skipped if it does not exist)
    /// 3. Environment variables (`MLIP_EXPLORE_*`, e.g.
    ///    `MLIP_EXPLORE_EXPLORE__FP_TASK_MAX=20`)
    pub fn load(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        let config: Config = Self::figment(path)
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file, ignoring the environment
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        let config: Config = Self::figment(path)
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    fn figment(path: &Path) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path))
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        // Logging
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        // Exploration
        let explore = &config.explore;
        if explore.fp_task_max == 0 {
            return Err(ConfigError::InvalidFpTaskMax(explore.fp_task_max));
        }
        if explore.max_numb_iter == 0 {
            return Err(ConfigError::InvalidMaxIterations(explore.max_numb_iter));
        }
        if explore.stages.is_empty() {
            return Err(ConfigError::NoStages);
        }
        for (idx, stage) in explore.stages.iter().enumerate() {
            if stage.max_numb_iter == Some(0) {
                return Err(ConfigError::InvalidMaxIterations(0));
            }
            if stage.task_groups.iter().all(|g| g.is_empty()) {
                return Err(ConfigError::ValidationFailed(format!(
                    "stage {} ({}) has no tasks",
                    idx,
                    stage.name.as_deref().unwrap_or("unnamed")
                )));
            }
        }

        explore.report.validate()
    }
}
