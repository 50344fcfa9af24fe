//! Exploration reports.
//!
//! A report is recorded once per iteration from a [`DeviationManager`]
//! snapshot. It partitions every frame into accurate, candidate, and failed,
//! remembers the thresholds it actually used, and answers convergence
//! queries against the thresholds of earlier iterations of the same stage.
//!
//! Reports are immutable once recorded; build one through
//! [`ExplorationReportConfig::record`].

mod adaptive_lower;
mod selection;
mod trust_levels;

use std::collections::BTreeSet;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::domain::errors::ExplorationResult;
use crate::domain::models::{DeviationManager, ExplorationReportConfig, FrameId, TrustLevel};

pub use adaptive_lower::AdaptiveLowerReport;
pub use selection::{inverse_population_weights, select_uniform, select_weighted};
pub use trust_levels::TrustLevelReport;

// ---------------------------------------------------------------------------
// ExplorationReport
// ---------------------------------------------------------------------------

/// A recorded exploration report.
#[derive(Debug, Clone, PartialEq)]
pub enum ExplorationReport {
    /// Fixed upper bounds, lower bounds recomputed every iteration.
    AdaptiveLower(AdaptiveLowerReport),
    /// Fixed lower and upper bounds.
    TrustLevels(TrustLevelReport),
}

impl ExplorationReportConfig {
    /// Classify every frame of `devi` with these settings.
    pub fn record(&self, devi: &DeviationManager) -> ExplorationResult<ExplorationReport> {
        match self {
            Self::AdaptiveLower(config) => {
                AdaptiveLowerReport::record(config.clone(), devi).map(ExplorationReport::AdaptiveLower)
            }
            Self::TrustLevels(config) => {
                TrustLevelReport::record(config.clone(), devi).map(ExplorationReport::TrustLevels)
            }
        }
    }
}

impl ExplorationReport {
    fn frames(&self) -> &FrameClassification {
        match self {
            Self::AdaptiveLower(report) => report.frames(),
            Self::TrustLevels(report) => report.frames(),
        }
    }

    /// Thresholds actually used by this report.
    pub fn trust_level(&self) -> &TrustLevel {
        match self {
            Self::AdaptiveLower(report) => report.trust_level(),
            Self::TrustLevels(report) => report.trust_level(),
        }
    }

    pub fn accurate(&self) -> &BTreeSet<FrameId> {
        &self.frames().accurate
    }

    pub fn candidate(&self) -> &BTreeSet<FrameId> {
        &self.frames().candidate
    }

    pub fn failed(&self) -> &BTreeSet<FrameId> {
        &self.frames().failed
    }

    pub fn ntraj(&self) -> usize {
        self.frames().ntraj
    }

    pub fn nframes(&self) -> usize {
        self.frames().nframes
    }

    pub fn accurate_ratio(&self) -> f64 {
        self.frames().ratio(self.accurate().len())
    }

    pub fn candidate_ratio(&self) -> f64 {
        self.frames().ratio(self.candidate().len())
    }

    pub fn failed_ratio(&self) -> f64 {
        self.frames().ratio(self.failed().len())
    }

    /// Whether this report, together with the trailing `history` of the
    /// stage (oldest first), shows the stage has converged.
    pub fn converged(&self, history: &[TrustLevel]) -> bool {
        match self {
            Self::AdaptiveLower(report) => report.converged(history),
            Self::TrustLevels(report) => report.converged(history),
        }
    }

    /// Candidate frame indices per trajectory, at most `max_numb` in total.
    ///
    /// The outer vector always has one entry per trajectory; frame indices
    /// within a trajectory are sorted.
    pub fn get_candidate_ids<R: Rng + ?Sized>(
        &self,
        max_numb: usize,
        rng: &mut R,
    ) -> ExplorationResult<Vec<Vec<usize>>> {
        match self {
            Self::AdaptiveLower(report) => report.get_candidate_ids(max_numb, rng),
            Self::TrustLevels(report) => Ok(report.get_candidate_ids(max_numb, rng)),
        }
    }

    /// Force and (if monitored) virial deviation of a frame.
    pub fn frame_deviation(&self, id: FrameId) -> Option<(f64, Option<f64>)> {
        match self {
            Self::AdaptiveLower(report) => report.frame_deviation(id),
            Self::TrustLevels(report) => report.frame_deviation(id),
        }
    }

    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            trust_level: *self.trust_level(),
            accurate_ratio: self.accurate_ratio(),
            candidate_ratio: self.candidate_ratio(),
            failed_ratio: self.failed_ratio(),
        }
    }

    pub fn print_header() -> String {
        ReportSummary::print_header()
    }

    pub fn print(&self, stage_idx: usize, idx_in_stage: usize, iter_idx: usize) -> String {
        self.summary().print(stage_idx, idx_in_stage, iter_idx)
    }
}

// ---------------------------------------------------------------------------
// ReportSummary
// ---------------------------------------------------------------------------

/// What a stage keeps from each report once the iteration is over.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub trust_level: TrustLevel,
    pub accurate_ratio: f64,
    pub candidate_ratio: f64,
    pub failed_ratio: f64,
}

impl ReportSummary {
    /// Column header matching [`print`](Self::print).
    pub fn print_header() -> String {
        format!(
            "{:>9}{:>9}{:>9}{:>11}{:>11}{:>11}{:>11}{:>11}{:>11}{:>9}",
            "#   stage",
            "id_stg.",
            "iter.",
            "accu.",
            "cand.",
            "fail.",
            "lvl_f_lo",
            "lvl_f_hi",
            "v_lo",
            "v_hi",
        )
    }

    /// Fixed-width status row. Virial columns read `nan` when the virial
    /// criterion is disabled.
    pub fn print(&self, stage_idx: usize, idx_in_stage: usize, iter_idx: usize) -> String {
        let tl = &self.trust_level;
        format!(
            "{:9}{:9}{:9}{:11.4}{:11.4}{:11.4}{:11.4}{:11.4}{}{}",
            stage_idx,
            idx_in_stage,
            iter_idx,
            self.accurate_ratio,
            self.candidate_ratio,
            self.failed_ratio,
            tl.level_f_lo,
            tl.level_f_hi,
            format_level(tl.level_v_lo, 11),
            format_level(tl.level_v_hi, 9),
        )
    }
}

fn format_level(level: Option<f64>, width: usize) -> String {
    match level {
        Some(value) => format!("{value:width$.4}"),
        None => format!("{:>width$}", "nan"),
    }
}

// ---------------------------------------------------------------------------
// FrameClassification
// ---------------------------------------------------------------------------

/// Disjoint accurate / candidate / failed sets covering every frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct FrameClassification {
    pub accurate: BTreeSet<FrameId>,
    pub candidate: BTreeSet<FrameId>,
    pub failed: BTreeSet<FrameId>,
    pub ntraj: usize,
    pub nframes: usize,
}

impl FrameClassification {
    fn ratio(&self, count: usize) -> f64 {
        if self.nframes == 0 {
            0.0
        } else {
            count as f64 / self.nframes as f64
        }
    }

    /// Group picked frames by trajectory, sorted within each trajectory.
    fn group_by_traj(&self, picked: impl IntoIterator<Item = FrameId>) -> Vec<Vec<usize>> {
        let mut grouped = vec![Vec::new(); self.ntraj];
        for id in picked {
            grouped[id.traj].push(id.frame);
        }
        for frames in &mut grouped {
            frames.sort_unstable();
        }
        grouped
    }
}

/// Value of frame `id` in a per-trajectory array.
fn frame_value(values: &[Vec<f64>], id: FrameId) -> Option<f64> {
    values.get(id.traj).and_then(|t| t.get(id.frame)).copied()
}
