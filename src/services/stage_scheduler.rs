//! Per-stage iteration control.
//!
//! A stage scheduler owns the configuration of one exploration stage; the
//! mutable part (history, iteration count, status) lives in a separate
//! [`StageState`] that the caller owns and passes in, so an orchestrator can
//! persist it between iterations.
//!
//! ```text
//!   Iterating ──converged──────────────▶ Converged
//!       │
//!       └─max_numb_iter reached─┬─fatal──▶ ExhaustedFatal (error)
//!                               └────────▶ ExhaustedNonfatal
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::errors::{ExplorationError, ExplorationResult};
use crate::domain::models::{ExplorationStage, ExplorationTaskGroup, TrustLevel};
use crate::services::conf_selector::ConfSelector;
use crate::services::report::{ExplorationReport, ReportSummary};

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    #[default]
    Iterating,
    Converged,
    ExhaustedFatal,
    ExhaustedNonfatal,
}

impl StageStatus {
    /// Finished without a fatal error.
    pub const fn is_complete(self) -> bool {
        matches!(self, Self::Converged | Self::ExhaustedNonfatal)
    }

    /// No further iterations will be planned.
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Iterating)
    }
}

/// Mutable progress of one stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageState {
    pub status: StageStatus,
    /// One entry per recorded iteration, oldest first.
    pub history: Vec<ReportSummary>,
    /// Number of reports recorded.
    pub iteration: usize,
}

impl StageState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Thresholds of every recorded iteration, oldest first.
    pub fn trust_levels(&self) -> Vec<TrustLevel> {
        self.history.iter().map(|s| s.trust_level).collect()
    }
}

/// What a stage wants to happen next.
#[derive(Debug, Clone, PartialEq)]
pub enum StagePlan {
    /// Run another iteration with these tasks and this selector.
    Continue {
        task_group: ExplorationTaskGroup,
        selector: ConfSelector,
    },
    /// The stage is done.
    Complete { converged: bool },
}

impl StagePlan {
    pub const fn is_complete(&self) -> bool {
        matches!(self, Self::Complete { .. })
    }
}

// ---------------------------------------------------------------------------
// StageScheduler
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum StageScheduler {
    ConvergenceCheck(ConvergenceCheckStageScheduler),
}

impl StageScheduler {
    pub fn name(&self) -> &str {
        match self {
            Self::ConvergenceCheck(scheduler) => &scheduler.name,
        }
    }

    pub const fn max_numb_iter(&self) -> usize {
        match self {
            Self::ConvergenceCheck(scheduler) => scheduler.max_numb_iter,
        }
    }

    pub fn plan_next_iteration(
        &self,
        state: &mut StageState,
        report: Option<&ExplorationReport>,
        trajs: &[PathBuf],
    ) -> ExplorationResult<StagePlan> {
        match self {
            Self::ConvergenceCheck(scheduler) => scheduler.plan_next_iteration(state, report, trajs),
        }
    }
}

/// Iterates a stage until its report says converged or the iteration cap is
/// hit.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvergenceCheckStageScheduler {
    name: String,
    stage: ExplorationStage,
    selector: ConfSelector,
    max_numb_iter: usize,
    fatal_at_max: bool,
}

impl ConvergenceCheckStageScheduler {
    pub fn new(
        name: impl Into<String>,
        stage: ExplorationStage,
        selector: ConfSelector,
        max_numb_iter: usize,
        fatal_at_max: bool,
    ) -> Self {
        Self {
            name: name.into(),
            stage,
            selector,
            max_numb_iter,
            fatal_at_max,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn max_numb_iter(&self) -> usize {
        self.max_numb_iter
    }

    pub const fn fatal_at_max(&self) -> bool {
        self.fatal_at_max
    }

    pub const fn selector(&self) -> &ConfSelector {
        &self.selector
    }

    /// Plan the next iteration of the stage.
    ///
    /// With `report == None` the stage is being started: the first task
    /// group and the configured selector are returned and `state` is left
    /// alone. Otherwise the report is appended to the history and checked
    /// against the entries recorded before it.
    ///
    /// Reaching `max_numb_iter` without converging marks the stage
    /// `ExhaustedFatal` and returns [`ExplorationError::FatalConvergence`]
    /// when `fatal_at_max` is set.
    pub fn plan_next_iteration(
        &self,
        state: &mut StageState,
        report: Option<&ExplorationReport>,
        trajs: &[PathBuf],
    ) -> ExplorationResult<StagePlan> {
        if state.status.is_terminal() {
            return Err(ExplorationError::StageComplete(self.name.clone()));
        }
        let Some(report) = report else {
            tracing::info!(stage = %self.name, "stage started");
            return Ok(StagePlan::Continue {
                task_group: self.stage.make_task(),
                selector: self.selector.clone(),
            });
        };

        let converged = report.converged(&state.trust_levels());
        state.history.push(report.summary());
        state.iteration += 1;

        if converged {
            state.status = StageStatus::Converged;
            tracing::info!(
                stage = %self.name,
                iteration = state.iteration,
                accurate_ratio = report.accurate_ratio(),
                "stage converged"
            );
            return Ok(StagePlan::Complete { converged: true });
        }

        if state.iteration >= self.max_numb_iter {
            if self.fatal_at_max {
                state.status = StageStatus::ExhaustedFatal;
                tracing::error!(
                    stage = %self.name,
                    iterations = state.iteration,
                    "stage reached max_numb_iter without converging"
                );
                return Err(ExplorationError::FatalConvergence {
                    stage: self.name.clone(),
                    iterations: state.iteration,
                });
            }
            state.status = StageStatus::ExhaustedNonfatal;
            tracing::warn!(
                stage = %self.name,
                iterations = state.iteration,
                "stage reached max_numb_iter without converging, moving on"
            );
            return Ok(StagePlan::Complete { converged: false });
        }

        tracing::debug!(
            stage = %self.name,
            iteration = state.iteration,
            candidate_ratio = report.candidate_ratio(),
            ntrajs = trajs.len(),
            "stage continues"
        );
        Ok(StagePlan::Continue {
            task_group: self.stage.make_task(),
            selector: self.selector.bound_to(report),
        })
    }
}
