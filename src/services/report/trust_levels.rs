//! Report with fixed trust levels.

use rand::Rng;

use super::selection::select_uniform;
use super::{frame_value, FrameClassification};
use crate::domain::errors::ExplorationResult;
use crate::domain::models::{
    DeviQuantity, DeviationManager, FrameClass, FrameId, TrustLevel, TrustLevelReportConfig,
};

/// Classifies frames against a fixed [`TrustLevel`]; the stage converges
/// once enough frames are accurate.
#[derive(Debug, Clone, PartialEq)]
pub struct TrustLevelReport {
    config: TrustLevelReportConfig,
    frames: FrameClassification,
    md_f: Vec<Vec<f64>>,
    md_v: Option<Vec<Vec<f64>>>,
}

impl TrustLevelReport {
    pub fn record(config: TrustLevelReportConfig, devi: &DeviationManager) -> ExplorationResult<Self> {
        let md_f = devi.get(DeviQuantity::MaxDeviF)?.to_vec();
        let md_v = if config.trust_level.has_virial() {
            Some(devi.get(DeviQuantity::MaxDeviV)?.to_vec())
        } else {
            None
        };

        let mut frames = FrameClassification {
            ntraj: md_f.len(),
            nframes: md_f.iter().map(Vec::len).sum(),
            ..Default::default()
        };
        for (traj, values) in md_f.iter().enumerate() {
            for (frame, &devi_f) in values.iter().enumerate() {
                let id = FrameId::new(traj, frame);
                let devi_v = md_v.as_ref().and_then(|md| frame_value(md, id));
                let set = match config.trust_level.classify(devi_f, devi_v) {
                    FrameClass::Accurate => &mut frames.accurate,
                    FrameClass::Candidate => &mut frames.candidate,
                    FrameClass::Failed => &mut frames.failed,
                };
                set.insert(id);
            }
        }

        tracing::debug!(
            nframes = frames.nframes,
            accurate = frames.accurate.len(),
            candidate = frames.candidate.len(),
            failed = frames.failed.len(),
            "trust-level report recorded"
        );

        Ok(Self {
            config,
            frames,
            md_f,
            md_v,
        })
    }

    pub(crate) const fn frames(&self) -> &FrameClassification {
        &self.frames
    }

    pub const fn trust_level(&self) -> &TrustLevel {
        &self.config.trust_level
    }

    /// History plays no part: the accurate ratio alone decides.
    pub fn converged(&self, _history: &[TrustLevel]) -> bool {
        self.frames.ratio(self.frames.accurate.len()) >= self.config.conv_accuracy
    }

    pub fn get_candidate_ids<R: Rng + ?Sized>(&self, max_numb: usize, rng: &mut R) -> Vec<Vec<usize>> {
        let candidates: Vec<FrameId> = self.frames.candidate.iter().copied().collect();
        if candidates.len() <= max_numb {
            return self.frames.group_by_traj(candidates);
        }
        self.frames
            .group_by_traj(select_uniform(candidates, max_numb, rng))
    }

    pub fn frame_deviation(&self, id: FrameId) -> Option<(f64, Option<f64>)> {
        let devi_f = frame_value(&self.md_f, id)?;
        let devi_v = self.md_v.as_ref().and_then(|md| frame_value(md, id));
        Some((devi_f, devi_v))
    }
}
