//! `validate`: load a configuration and build the scheduler from it.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use crate::cli::output::{output, CommandOutput};
use crate::domain::models::{Config, ExplorationReportConfig};
use crate::infrastructure::config::ConfigLoader;
use crate::services::ExplorationScheduler;

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Exploration configuration (YAML)
    #[arg(short, long, env = "MLIP_EXPLORE_CONFIG")]
    pub config: PathBuf,

    /// Also print the effective configuration (defaults and environment
    /// overrides applied) as YAML
    #[arg(long)]
    pub print_config: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidateOutput {
    pub config: PathBuf,
    pub report: &'static str,
    pub fp_task_max: usize,
    pub stages: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_config: Option<String>,
}

impl CommandOutput for ValidateOutput {
    fn to_human(&self) -> String {
        let summary = format!(
            "{} is valid: {} report, {} stage(s) [{}], at most {} frames labeled per iteration",
            self.config.display(),
            self.report,
            self.stages.len(),
            self.stages.join(", "),
            self.fp_task_max
        );
        match &self.effective_config {
            Some(yaml) => format!("{summary}\n\n{}", yaml.trim_end()),
            None => summary,
        }
    }
}

pub fn execute(args: ValidateArgs, json_mode: bool) -> Result<()> {
    let config = ConfigLoader::load(&args.config)?;
    let mut result = summarize(args.config, &config)?;
    if args.print_config {
        result.effective_config =
            Some(serde_yaml::to_string(&config).context("Failed to render configuration")?);
    }
    output(&result, json_mode);
    Ok(())
}

/// Check that a scheduler can be built from `config` and describe it.
pub fn summarize(path: PathBuf, config: &Config) -> Result<ValidateOutput> {
    let scheduler = ExplorationScheduler::from_config(&config.explore)
        .context("Failed to build exploration scheduler")?;
    let report = match config.explore.report {
        ExplorationReportConfig::AdaptiveLower(_) => "adaptive_lower",
        ExplorationReportConfig::TrustLevels(_) => "trust_levels",
    };
    Ok(ValidateOutput {
        config: path,
        report,
        fp_task_max: config.explore.fp_task_max,
        stages: scheduler
            .stages()
            .iter()
            .map(|s| s.name().to_string())
            .collect(),
        effective_config: None,
    })
}
