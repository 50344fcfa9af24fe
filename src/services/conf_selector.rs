//! Configuration selectors: turn a report's candidates into labeling tasks.

use std::path::{Path, PathBuf};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::domain::errors::{ExplorationError, ExplorationResult};
use crate::domain::models::{DeviationManager, ExplorationReportConfig, FrameId, TrustLevel};
use crate::services::report::ExplorationReport;

/// One frame handed to the labeling pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedConf {
    pub traj_index: usize,
    /// Trajectory the frame came from, when the caller supplied references.
    pub traj: Option<PathBuf>,
    pub frame_index: usize,
    pub devi_f: Option<f64>,
    pub devi_v: Option<f64>,
}

/// Frames selected for labeling in one iteration, ordered by trajectory and
/// then frame index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectedConfs {
    pub confs: Vec<SelectedConf>,
}

impl SelectedConfs {
    pub fn len(&self) -> usize {
        self.confs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.confs.is_empty()
    }

    /// Frame identities of the selection.
    pub fn frame_ids(&self) -> impl Iterator<Item = FrameId> + '_ {
        self.confs
            .iter()
            .map(|c| FrameId::new(c.traj_index, c.frame_index))
    }
}

// ---------------------------------------------------------------------------
// ConfSelector
// ---------------------------------------------------------------------------

/// Selector variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConfSelector {
    /// Picks individual frames out of simulation trajectories.
    LammpsFrames(FrameSelector),
}

impl ConfSelector {
    pub const fn max_numb_sel(&self) -> usize {
        match self {
            Self::LammpsFrames(selector) => selector.max_numb_sel,
        }
    }

    pub fn record(&self, devi: &DeviationManager) -> ExplorationResult<ExplorationReport> {
        match self {
            Self::LammpsFrames(selector) => selector.record(devi),
        }
    }

    pub fn select<R: Rng + ?Sized>(
        &self,
        report: &ExplorationReport,
        trajs: &[PathBuf],
        rng: &mut R,
    ) -> ExplorationResult<SelectedConfs> {
        match self {
            Self::LammpsFrames(selector) => selector.select(report, trajs, rng),
        }
    }

    pub fn select_from_deviations<R: Rng + ?Sized>(
        &self,
        devi: &DeviationManager,
        trajs: &[PathBuf],
        rng: &mut R,
    ) -> ExplorationResult<(ExplorationReport, SelectedConfs)> {
        match self {
            Self::LammpsFrames(selector) => selector.select_from_deviations(devi, trajs, rng),
        }
    }

    /// Same selector, remembering the thresholds of the report it was
    /// planned from.
    #[must_use]
    pub fn bound_to(&self, report: &ExplorationReport) -> Self {
        match self {
            Self::LammpsFrames(selector) => Self::LammpsFrames(selector.bound_to(report)),
        }
    }
}

// ---------------------------------------------------------------------------
// FrameSelector
// ---------------------------------------------------------------------------

/// Records a report from each iteration's deviations and picks at most
/// `max_numb_sel` candidate frames for labeling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameSelector {
    pub report: ExplorationReportConfig,
    pub max_numb_sel: usize,
    /// Thresholds of the report this selector was planned from, if any.
    #[serde(default)]
    pub previous_trust_level: Option<TrustLevel>,
}

impl FrameSelector {
    pub const fn new(report: ExplorationReportConfig, max_numb_sel: usize) -> Self {
        Self {
            report,
            max_numb_sel,
            previous_trust_level: None,
        }
    }

    #[must_use]
    pub fn bound_to(&self, report: &ExplorationReport) -> Self {
        Self {
            previous_trust_level: Some(*report.trust_level()),
            ..self.clone()
        }
    }

    pub fn record(&self, devi: &DeviationManager) -> ExplorationResult<ExplorationReport> {
        self.report.record(devi)
    }

    /// Pick frames from `report`.
    ///
    /// `trajs` is either empty or holds one reference per trajectory of the
    /// report, in trajectory order.
    pub fn select<R: Rng + ?Sized>(
        &self,
        report: &ExplorationReport,
        trajs: &[PathBuf],
        rng: &mut R,
    ) -> ExplorationResult<SelectedConfs> {
        if !trajs.is_empty() && trajs.len() != report.ntraj() {
            return Err(ExplorationError::TrajectoryCountMismatch {
                expected: report.ntraj(),
                actual: trajs.len(),
            });
        }
        let picked = report.get_candidate_ids(self.max_numb_sel, rng)?;

        let mut confs = Vec::with_capacity(picked.iter().map(Vec::len).sum());
        for (traj_index, frames) in picked.into_iter().enumerate() {
            let traj = trajs.get(traj_index).map(PathBuf::as_path);
            for frame_index in frames {
                confs.push(selected_conf(report, traj_index, traj, frame_index));
            }
        }

        tracing::debug!(
            selected = confs.len(),
            candidates = report.candidate().len(),
            max_numb_sel = self.max_numb_sel,
            previous_trust_level = ?self.previous_trust_level,
            "configurations selected"
        );
        Ok(SelectedConfs { confs })
    }

    /// Record a report from `devi` and select from it.
    pub fn select_from_deviations<R: Rng + ?Sized>(
        &self,
        devi: &DeviationManager,
        trajs: &[PathBuf],
        rng: &mut R,
    ) -> ExplorationResult<(ExplorationReport, SelectedConfs)> {
        let report = self.record(devi)?;
        let confs = self.select(&report, trajs, rng)?;
        Ok((report, confs))
    }
}

fn selected_conf(
    report: &ExplorationReport,
    traj_index: usize,
    traj: Option<&Path>,
    frame_index: usize,
) -> SelectedConf {
    let devi = report.frame_deviation(FrameId::new(traj_index, frame_index));
    SelectedConf {
        traj_index,
        traj: traj.map(Path::to_path_buf),
        frame_index,
        devi_f: devi.map(|(f, _)| f),
        devi_v: devi.and_then(|(_, v)| v),
    }
}
