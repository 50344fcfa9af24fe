//! Multi-stage exploration scheduling.
//!
//! [`ExplorationScheduler`] holds an ordered list of stage schedulers and
//! walks through them one at a time. Progress is kept in a caller-owned
//! [`SchedulerState`]; the scheduler itself is never mutated after it has
//! been built.

use std::fmt::Write as _;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::errors::{ExplorationError, ExplorationResult};
use crate::domain::models::{ExploreConfig, ExplorationTaskGroup};
use crate::services::conf_selector::{ConfSelector, FrameSelector};
use crate::services::report::{ExplorationReport, ReportSummary};
use crate::services::stage_scheduler::{
    ConvergenceCheckStageScheduler, StagePlan, StageScheduler, StageState, StageStatus,
};

/// Progress through all stages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchedulerState {
    /// Index of the active stage; equals the stage count once all are done.
    pub cursor: usize,
    /// Whether the active stage has handed out its first task group.
    pub started: bool,
    pub stages: Vec<StageState>,
}

impl SchedulerState {
    /// Whether a stage failed fatally. A halted scheduler plans nothing more.
    pub fn halted(&self) -> bool {
        self.stages
            .iter()
            .any(|s| s.status == StageStatus::ExhaustedFatal)
    }
}

/// Outcome of [`ExplorationScheduler::plan_next_iteration`].
#[derive(Debug, Clone, PartialEq)]
pub enum ExplorationPlan {
    Continue {
        stage_index: usize,
        /// Reports recorded so far in this stage.
        stage_iteration: usize,
        task_group: ExplorationTaskGroup,
        selector: ConfSelector,
    },
    /// Every stage is done.
    Complete,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExplorationScheduler {
    stages: Vec<StageScheduler>,
}

impl ExplorationScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// One convergence-check stage per configured stage, all sharing the
    /// report settings and the labeling cap.
    pub fn from_config(config: &ExploreConfig) -> ExplorationResult<Self> {
        if config.stages.is_empty() {
            return Err(ExplorationError::NoStages);
        }
        let selector =
            ConfSelector::LammpsFrames(FrameSelector::new(config.report.clone(), config.fp_task_max));

        let mut scheduler = Self::new();
        for (idx, stage) in config.stages.iter().enumerate() {
            let name = stage
                .name
                .clone()
                .unwrap_or_else(|| format!("stage-{idx}"));
            scheduler.add_stage_scheduler(StageScheduler::ConvergenceCheck(
                ConvergenceCheckStageScheduler::new(
                    name,
                    stage.stage(),
                    selector.clone(),
                    stage.max_numb_iter.unwrap_or(config.max_numb_iter),
                    stage.fatal_at_max.unwrap_or(config.fatal_at_max),
                ),
            ));
        }
        tracing::debug!(stages = scheduler.stages.len(), "exploration scheduler built");
        Ok(scheduler)
    }

    pub fn add_stage_scheduler(&mut self, stage: StageScheduler) {
        self.stages.push(stage);
    }

    pub fn stages(&self) -> &[StageScheduler] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Fresh state with one slot per stage.
    pub fn initial_state(&self) -> SchedulerState {
        SchedulerState {
            cursor: 0,
            started: false,
            stages: vec![StageState::new(); self.stages.len()],
        }
    }

    /// Plan the next iteration.
    ///
    /// The first call (with `report == None`) starts stage 0. Each later
    /// call feeds the report of the previous iteration to the active stage.
    /// When that stage completes, the cursor advances and the next stage is
    /// started within the same call; once no stages remain the plan is
    /// [`ExplorationPlan::Complete`].
    ///
    /// A fatal exhaustion is returned unchanged and halts the scheduler:
    /// every later call returns the same error.
    pub fn plan_next_iteration(
        &self,
        state: &mut SchedulerState,
        report: Option<&ExplorationReport>,
        trajs: &[PathBuf],
    ) -> ExplorationResult<ExplorationPlan> {
        if self.stages.is_empty() {
            return Err(ExplorationError::NoStages);
        }
        if state.stages.len() != self.stages.len() {
            state.stages.resize_with(self.stages.len(), StageState::new);
        }

        let mut report = report;
        loop {
            let Some(stage) = self.stages.get(state.cursor) else {
                return Ok(ExplorationPlan::Complete);
            };
            let stage_state = &mut state.stages[state.cursor];
            if stage_state.status == StageStatus::ExhaustedFatal {
                return Err(ExplorationError::FatalConvergence {
                    stage: stage.name().to_string(),
                    iterations: stage_state.iteration,
                });
            }
            if !state.started && report.is_some() {
                tracing::warn!(
                    stage = %stage.name(),
                    "report passed before the stage was started, ignoring it"
                );
                report = None;
            }

            match stage.plan_next_iteration(stage_state, report, trajs) {
                Ok(StagePlan::Continue {
                    task_group,
                    selector,
                }) => {
                    state.started = true;
                    return Ok(ExplorationPlan::Continue {
                        stage_index: state.cursor,
                        stage_iteration: stage_state.iteration,
                        task_group,
                        selector,
                    });
                }
                Ok(StagePlan::Complete { converged }) => {
                    tracing::info!(
                        stage = %stage.name(),
                        stage_index = state.cursor,
                        converged,
                        "advancing to next stage"
                    );
                    state.cursor += 1;
                    state.started = false;
                    report = None;
                }
                Err(err) => {
                    tracing::error!(
                        stage = %stage.name(),
                        stage_index = state.cursor,
                        error = %err,
                        "exploration halted"
                    );
                    return Err(err);
                }
            }
        }
    }

    /// Every stage converged or ran out of iterations non-fatally.
    pub fn converged(&self, state: &SchedulerState) -> bool {
        state.stages.len() == self.stages.len()
            && state.stages.iter().all(|s| s.status.is_complete())
    }

    /// Nothing more will be planned, either because all stages are done or
    /// because one failed fatally.
    pub fn complete(&self, state: &SchedulerState) -> bool {
        state.cursor >= self.stages.len() || state.halted()
    }

    /// Active stage index and the number of reports it has recorded. After
    /// the last stage completes this points at the last stage.
    pub fn stage_and_iteration(&self, state: &SchedulerState) -> (usize, usize) {
        let stage = state.cursor.min(self.stages.len().saturating_sub(1));
        let iteration = state.stages.get(stage).map_or(0, |s| s.iteration);
        (stage, iteration)
    }

    /// `(stage index, index within stage)` of every recorded iteration, in
    /// global iteration order.
    pub fn stage_of_iterations(&self, state: &SchedulerState) -> Vec<(usize, usize)> {
        state
            .stages
            .iter()
            .enumerate()
            .flat_map(|(stage, s)| (0..s.history.len()).map(move |idx| (stage, idx)))
            .collect()
    }

    /// Convergence table: a header and one row per recorded iteration, with
    /// iterations numbered globally across stages.
    pub fn print_convergence(&self, state: &SchedulerState) -> String {
        let mut out = ReportSummary::print_header();
        out.push('\n');
        let mut global_iter = 0;
        for (stage_idx, stage) in state.stages.iter().enumerate() {
            for (idx_in_stage, summary) in stage.history.iter().enumerate() {
                out.push_str(&summary.print(stage_idx, idx_in_stage, global_iter));
                out.push('\n');
                global_iter += 1;
            }
        }

        if self.converged(state) {
            out.push_str("# All stages converged\n");
        } else if let Some((idx, stage)) = state
            .stages
            .iter()
            .enumerate()
            .find(|(_, s)| s.status == StageStatus::ExhaustedFatal)
        {
            let _ = writeln!(
                out,
                "# Stage {idx} did not converge after {} iterations",
                stage.iteration
            );
        }
        out
    }
}
