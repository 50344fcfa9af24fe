//! Report with fixed upper bounds and adaptively chosen lower bounds.
//!
//! Each iteration the lower bound of every monitored quantity is moved so
//! that about `max(numb_candi, ceil(rate_candi * N))` of the non-failed
//! frames sit above it. The stage has converged once those lower bounds stop
//! moving, i.e. stay within `conv_tolerance` over `n_checked_steps`
//! consecutive iterations.

use std::collections::BTreeSet;
use std::iter;

use rand::Rng;

use super::selection::{inverse_population_weights, select_uniform, select_weighted};
use super::{frame_value, FrameClassification};
use crate::domain::errors::{ExplorationError, ExplorationResult};
use crate::domain::models::{
    AdaptiveLowerConfig, CandidateSelection, DeviQuantity, DeviationManager, FrameId, TrustLevel,
};

#[derive(Debug, Clone, PartialEq)]
pub struct AdaptiveLowerReport {
    config: AdaptiveLowerConfig,
    trust_level: TrustLevel,
    frames: FrameClassification,
    md_f: Vec<Vec<f64>>,
    md_v: Option<Vec<Vec<f64>>>,
}

impl AdaptiveLowerReport {
    /// Classify every frame of `devi`.
    ///
    /// Failed frames are settled first and never enter the lower-bound
    /// search. A frame is a candidate if any monitored quantity puts it above
    /// that quantity's new lower bound.
    pub fn record(config: AdaptiveLowerConfig, devi: &DeviationManager) -> ExplorationResult<Self> {
        let md_f = devi.get(DeviQuantity::MaxDeviF)?.to_vec();
        let md_v = if config.has_virial() {
            Some(devi.get(DeviQuantity::MaxDeviV)?.to_vec())
        } else {
            None
        };
        let upper = TrustLevel {
            level_f_lo: 0.0,
            level_f_hi: config.level_f_hi,
            level_v_lo: None,
            level_v_hi: config.level_v_hi,
        };

        let mut frames = FrameClassification {
            ntraj: md_f.len(),
            nframes: md_f.iter().map(Vec::len).sum(),
            ..Default::default()
        };
        let mut coll_f = Vec::new();
        let mut coll_v = Vec::new();
        for (traj, values) in md_f.iter().enumerate() {
            for (frame, &devi_f) in values.iter().enumerate() {
                let id = FrameId::new(traj, frame);
                let devi_v = md_v.as_ref().and_then(|md| frame_value(md, id));
                if upper.is_failed(devi_f, devi_v) {
                    frames.failed.insert(id);
                    continue;
                }
                coll_f.push((devi_f, id));
                if let Some(v) = devi_v {
                    coll_v.push((v, id));
                }
            }
        }

        let budget_f = candidate_budget(config.numb_candi_f, config.rate_candi_f, frames.nframes);
        let (level_f_lo, candi_f) = adaptive_lower(coll_f, budget_f, config.level_f_hi);
        frames.candidate.extend(candi_f);

        let level_v_lo = match config.level_v_hi {
            Some(level_v_hi) => {
                let budget_v =
                    candidate_budget(config.numb_candi_v, config.rate_candi_v, frames.nframes);
                let (level_v_lo, candi_v) = adaptive_lower(coll_v, budget_v, level_v_hi);
                frames.candidate.extend(candi_v);
                Some(level_v_lo)
            }
            None => None,
        };

        frames.accurate = all_frames(&md_f)
            .filter(|id| !frames.failed.contains(id) && !frames.candidate.contains(id))
            .collect();

        let trust_level = TrustLevel {
            level_f_lo,
            level_v_lo,
            ..upper
        };

        tracing::debug!(
            ntraj = frames.ntraj,
            nframes = frames.nframes,
            accurate = frames.accurate.len(),
            candidate = frames.candidate.len(),
            failed = frames.failed.len(),
            level_f_lo,
            level_v_lo = ?level_v_lo,
            "adaptive-lower report recorded"
        );

        Ok(Self {
            config,
            trust_level,
            frames,
            md_f,
            md_v,
        })
    }

    pub(crate) const fn frames(&self) -> &FrameClassification {
        &self.frames
    }

    pub const fn trust_level(&self) -> &TrustLevel {
        &self.trust_level
    }

    pub const fn config(&self) -> &AdaptiveLowerConfig {
        &self.config
    }

    /// Converged when the lower bounds of the last `n_checked_steps - 1`
    /// history entries plus this report all lie within `conv_tolerance`.
    ///
    /// Fewer history entries than the window needs means not converged.
    /// Entries older than the window are ignored.
    pub fn converged(&self, history: &[TrustLevel]) -> bool {
        let window = self.config.n_checked_steps.saturating_sub(1);
        if history.len() < window {
            return false;
        }
        let levels: Vec<&TrustLevel> = history[history.len() - window..]
            .iter()
            .chain(iter::once(&self.trust_level))
            .collect();
        let tolerance = self.config.conv_tolerance;

        let force_stable = spread_within(levels.iter().map(|tl| Some(tl.level_f_lo)), tolerance);
        let virial_stable = !self.config.has_virial()
            || spread_within(levels.iter().map(|tl| tl.level_v_lo), tolerance);
        force_stable && virial_stable
    }

    pub fn get_candidate_ids<R: Rng + ?Sized>(
        &self,
        max_numb: usize,
        rng: &mut R,
    ) -> ExplorationResult<Vec<Vec<usize>>> {
        let candidates: Vec<FrameId> = self.frames.candidate.iter().copied().collect();
        if candidates.len() <= max_numb {
            return Ok(self.frames.group_by_traj(candidates));
        }
        let picked = match self.config.candi_sel_prob {
            CandidateSelection::Uniform => select_uniform(candidates, max_numb, rng),
            CandidateSelection::InversePopulation { quantity, bins } => {
                let values = candidates
                    .iter()
                    .map(|&id| self.value_of(quantity, id))
                    .collect::<ExplorationResult<Vec<f64>>>()?;
                let weights = inverse_population_weights(&values, bins);
                select_weighted(&candidates, &weights, max_numb, rng)?
            }
        };
        Ok(self.frames.group_by_traj(picked))
    }

    pub fn frame_deviation(&self, id: FrameId) -> Option<(f64, Option<f64>)> {
        let devi_f = frame_value(&self.md_f, id)?;
        let devi_v = self.md_v.as_ref().and_then(|md| frame_value(md, id));
        Some((devi_f, devi_v))
    }

    fn value_of(&self, quantity: DeviQuantity, id: FrameId) -> ExplorationResult<f64> {
        let values = match quantity {
            DeviQuantity::MaxDeviF => Some(&self.md_f),
            DeviQuantity::MaxDeviV => self.md_v.as_ref(),
            _ => None,
        };
        values
            .and_then(|md| frame_value(md, id))
            .ok_or(ExplorationError::MissingQuantity(quantity))
    }
}

/// `max(numb_candi, ceil(rate_candi * nframes))`.
fn candidate_budget(numb_candi: usize, rate_candi: f64, nframes: usize) -> usize {
    let by_rate = (rate_candi * nframes as f64).ceil() as usize;
    numb_candi.max(by_rate)
}

/// Pick the lower bound for one quantity over the non-failed frames.
///
/// Returns the realized lower bound and the frames above it. With a zero
/// budget the bound collapses onto `level_hi`; a budget covering every frame
/// drops it to zero. Otherwise the candidates are the frames strictly above
/// the `(budget + 1)`-th largest value, so ties at the boundary never push
/// the count over budget, and the bound reported is the `budget`-th largest
/// value.
fn adaptive_lower(
    mut coll: Vec<(f64, FrameId)>,
    budget: usize,
    level_hi: f64,
) -> (f64, Vec<FrameId>) {
    if budget == 0 {
        return (level_hi, Vec::new());
    }
    if budget >= coll.len() {
        return (0.0, coll.into_iter().map(|(_, id)| id).collect());
    }
    coll.sort_by(|a, b| b.0.total_cmp(&a.0));
    let cut = coll[budget].0;
    let level_lo = coll[budget - 1].0;
    let picked = coll[..budget]
        .iter()
        .filter(|(value, _)| *value > cut)
        .map(|&(_, id)| id)
        .collect();
    (level_lo, picked)
}

fn spread_within(values: impl Iterator<Item = Option<f64>>, tolerance: f64) -> bool {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for value in values {
        let Some(value) = value else {
            return false;
        };
        min = min.min(value);
        max = max.max(value);
    }
    max - min <= tolerance
}

fn all_frames(md: &[Vec<f64>]) -> impl Iterator<Item = FrameId> + '_ {
    md.iter()
        .enumerate()
        .flat_map(|(traj, values)| (0..values.len()).map(move |frame| FrameId::new(traj, frame)))
}
