//! `status`: replay recorded deviation snapshots through the scheduler.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use super::load_config_with_logging;
use crate::cli::output::table::StageRow;
use crate::cli::output::{output, CommandOutput, TableFormatter};
use crate::domain::errors::ExplorationError;
use crate::domain::models::{Config, DeviationManager};
use crate::services::{
    ExplorationPlan, ExplorationScheduler, ReportSummary, SchedulerState,
};

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Exploration configuration (YAML)
    #[arg(short, long, env = "MLIP_EXPLORE_CONFIG")]
    pub config: PathBuf,

    /// JSON array of per-iteration deviation snapshots, e.g.
    /// `[{"max_devi_f": [[0.1, 0.2], [0.3]]}]`
    #[arg(short, long)]
    pub input: PathBuf,

    /// Seed for candidate down-selection
    #[arg(long, default_value_t = 0)]
    pub seed: u64,
}

/// One replayed iteration.
#[derive(Debug, Clone, Serialize)]
pub struct IterationOutput {
    pub iteration: usize,
    pub stage: usize,
    pub idx_in_stage: usize,
    #[serde(flatten)]
    pub summary: ReportSummary,
    pub candidates: usize,
    pub selected: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusOutput {
    pub generated_at: DateTime<Utc>,
    pub seed: u64,
    pub converged: bool,
    pub complete: bool,
    /// Message of the fatal convergence failure that halted exploration.
    pub fatal: Option<String>,
    /// Snapshots left over after exploration completed or halted.
    pub unused_snapshots: usize,
    pub iterations: Vec<IterationOutput>,
    pub stages: Vec<StageRow>,
    pub state: SchedulerState,
    #[serde(skip)]
    pub convergence_table: String,
}

impl CommandOutput for StatusOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![
            self.convergence_table.trim_end().to_string(),
            String::new(),
            TableFormatter::new().format_stages(&self.stages),
        ];
        if let Some(fatal) = &self.fatal {
            lines.push(format!("Exploration halted: {fatal}"));
        } else if !self.complete {
            lines.push(format!(
                "Exploration in progress after {} iteration(s)",
                self.iterations.len()
            ));
        }
        if self.unused_snapshots > 0 {
            lines.push(format!(
                "{} snapshot(s) not replayed",
                self.unused_snapshots
            ));
        }
        lines.join("\n")
    }
}

pub fn execute(args: StatusArgs, json_mode: bool) -> Result<()> {
    let (config, _logger) = load_config_with_logging(&args.config)?;
    let snapshots = read_snapshots(&args.input)?;
    let result = run(&config, &snapshots, args.seed)?;
    output(&result, json_mode);
    Ok(())
}

/// Read a JSON array of deviation snapshots.
pub fn read_snapshots(path: &Path) -> Result<Vec<DeviationManager>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse deviation snapshots in {}", path.display()))
}

/// Drive the scheduler with one snapshot per iteration until the snapshots
/// run out, every stage completes, or a stage fails fatally.
pub fn run(config: &Config, snapshots: &[DeviationManager], seed: u64) -> Result<StatusOutput> {
    let scheduler = ExplorationScheduler::from_config(&config.explore)
        .context("Failed to build exploration scheduler")?;
    let mut state = scheduler.initial_state();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let mut plan = scheduler.plan_next_iteration(&mut state, None, &[])?;
    let mut iterations = Vec::new();
    let mut fatal = None;

    for (iteration, devi) in snapshots.iter().enumerate() {
        let ExplorationPlan::Continue {
            stage_index,
            stage_iteration,
            selector,
            ..
        } = &plan
        else {
            break;
        };
        let (report, confs) = selector
            .select_from_deviations(devi, &[], &mut rng)
            .with_context(|| format!("Failed to process deviation snapshot {iteration}"))?;
        iterations.push(IterationOutput {
            iteration,
            stage: *stage_index,
            idx_in_stage: *stage_iteration,
            summary: report.summary(),
            candidates: report.candidate().len(),
            selected: confs.len(),
        });

        match scheduler.plan_next_iteration(&mut state, Some(&report), &[]) {
            Ok(next) => plan = next,
            Err(err @ ExplorationError::FatalConvergence { .. }) => {
                fatal = Some(err.to_string());
                break;
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("Failed to plan after snapshot {iteration}"));
            }
        }
    }

    let stages = scheduler
        .stages()
        .iter()
        .zip(&state.stages)
        .enumerate()
        .map(|(index, (stage, stage_state))| StageRow {
            index,
            name: stage.name().to_string(),
            status: stage_state.status,
            iterations: stage_state.iteration,
            max_numb_iter: stage.max_numb_iter(),
            last_accurate_ratio: stage_state.history.last().map(|s| s.accurate_ratio),
        })
        .collect();

    Ok(StatusOutput {
        generated_at: Utc::now(),
        seed,
        converged: scheduler.converged(&state),
        complete: scheduler.complete(&state),
        fatal,
        unused_snapshots: snapshots.len() - iterations.len(),
        convergence_table: scheduler.print_convergence(&state),
        iterations,
        stages,
        state,
    })
}
