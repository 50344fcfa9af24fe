use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::report_config::ExplorationReportConfig;
use super::task_group::{ExplorationStage, ExplorationTaskGroup};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Logging configuration
    #[serde(default)]
    pub logging: LogConfig,

    /// Exploration schedule configuration
    #[serde(default)]
    pub explore: ExploreConfig,
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format (json, pretty)
    #[serde(default = "default_format")]
    pub format: LogFormat,

    /// Directory for log files (optional, if None logs only to stderr)
    pub log_dir: Option<PathBuf>,

    /// Enable stderr logging
    #[serde(default = "default_true")]
    pub enable_stderr: bool,

    /// Log rotation policy
    #[serde(default)]
    pub rotation: RotationPolicy,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RotationPolicy {
    #[default]
    Daily,
    Hourly,
    Never,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_format(),
            log_dir: None,
            enable_stderr: true,
            rotation: RotationPolicy::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

const fn default_format() -> LogFormat {
    LogFormat::Pretty
}

const fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Exploration
// ---------------------------------------------------------------------------

/// Exploration schedule: shared report settings plus an ordered list of stages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ExploreConfig {
    /// Maximum number of frames sent to labeling per iteration
    #[serde(default = "default_fp_task_max")]
    pub fp_task_max: usize,

    /// Default iteration cap per stage
    #[serde(default = "default_max_numb_iter")]
    pub max_numb_iter: usize,

    /// Whether hitting the iteration cap without converging is fatal
    #[serde(default = "default_true")]
    pub fatal_at_max: bool,

    /// Report used to classify every iteration
    #[serde(default)]
    pub report: ExplorationReportConfig,

    /// Stages, explored in order
    #[serde(default)]
    pub stages: Vec<StageConfig>,
}

const fn default_fp_task_max() -> usize {
    50
}

const fn default_max_numb_iter() -> usize {
    10
}

impl Default for ExploreConfig {
    fn default() -> Self {
        Self {
            fp_task_max: default_fp_task_max(),
            max_numb_iter: default_max_numb_iter(),
            fatal_at_max: true,
            report: ExplorationReportConfig::default(),
            stages: vec![],
        }
    }
}

/// One exploration stage
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StageConfig {
    /// Human-readable label used in logs
    #[serde(default)]
    pub name: Option<String>,

    /// Task groups re-emitted unchanged every iteration of this stage
    #[serde(default)]
    pub task_groups: Vec<ExplorationTaskGroup>,

    /// Overrides `explore.max_numb_iter` for this stage
    #[serde(default)]
    pub max_numb_iter: Option<usize>,

    /// Overrides `explore.fatal_at_max` for this stage
    #[serde(default)]
    pub fatal_at_max: Option<bool>,
}

impl StageConfig {
    /// Build the stage template from the configured task groups.
    pub fn stage(&self) -> ExplorationStage {
        ExplorationStage {
            task_groups: self.task_groups.clone(),
        }
    }
}
