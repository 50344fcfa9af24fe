//! Trust levels separating accurate, candidate, and failed frames.

use serde::{Deserialize, Serialize};

/// Where a single frame falls relative to a [`TrustLevel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameClass {
    /// Ensemble agrees; no labeling needed.
    Accurate,
    /// Informative disagreement; worth labeling.
    Candidate,
    /// Ensemble is untrustworthy on this frame.
    Failed,
}

/// Lower and upper thresholds for the force and (optionally) virial
/// deviations.
///
/// The virial criterion is enabled only when `level_v_hi` is present.
/// `lo <= hi` is expected but not enforced: adaptive reports recompute the
/// lower bounds every iteration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrustLevel {
    pub level_f_lo: f64,
    pub level_f_hi: f64,
    #[serde(default)]
    pub level_v_lo: Option<f64>,
    #[serde(default)]
    pub level_v_hi: Option<f64>,
}

impl TrustLevel {
    /// Force-only trust level.
    pub const fn new(level_f_lo: f64, level_f_hi: f64) -> Self {
        Self {
            level_f_lo,
            level_f_hi,
            level_v_lo: None,
            level_v_hi: None,
        }
    }

    /// Trust level with both force and virial thresholds.
    pub const fn with_virial(
        level_f_lo: f64,
        level_f_hi: f64,
        level_v_lo: f64,
        level_v_hi: f64,
    ) -> Self {
        Self {
            level_f_lo,
            level_f_hi,
            level_v_lo: Some(level_v_lo),
            level_v_hi: Some(level_v_hi),
        }
    }

    pub const fn has_virial(&self) -> bool {
        self.level_v_hi.is_some()
    }

    /// A frame fails if either monitored quantity exceeds its upper bound.
    pub fn is_failed(&self, devi_f: f64, devi_v: Option<f64>) -> bool {
        if devi_f > self.level_f_hi {
            return true;
        }
        matches!((self.level_v_hi, devi_v), (Some(hi), Some(v)) if v > hi)
    }

    /// Classify a frame against both bounds.
    ///
    /// A frame without a virial value is judged on force alone. A missing
    /// `level_v_lo` with the virial criterion enabled means every non-failed
    /// virial value counts as a candidate.
    pub fn classify(&self, devi_f: f64, devi_v: Option<f64>) -> FrameClass {
        if self.is_failed(devi_f, devi_v) {
            return FrameClass::Failed;
        }
        let cand_f = devi_f > self.level_f_lo;
        let cand_v = match (self.has_virial(), devi_v) {
            (true, Some(v)) => self.level_v_lo.is_none_or(|lo| v > lo),
            _ => false,
        };
        if cand_f || cand_v {
            FrameClass::Candidate
        } else {
            FrameClass::Accurate
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_force_only_classification() {
        let tl = TrustLevel::new(0.1, 0.3);
        assert!(!tl.has_virial());
        assert_eq!(tl.classify(0.05, None), FrameClass::Accurate);
        assert_eq!(tl.classify(0.1, None), FrameClass::Accurate);
        assert_eq!(tl.classify(0.2, None), FrameClass::Candidate);
        assert_eq!(tl.classify(0.3, None), FrameClass::Candidate);
        assert_eq!(tl.classify(0.31, None), FrameClass::Failed);
        // Virial values are ignored when the criterion is disabled.
        assert_eq!(tl.classify(0.05, Some(100.0)), FrameClass::Accurate);
    }

    #[test]
    fn test_virial_fails_frame_on_its_own() {
        let tl = TrustLevel::with_virial(0.1, 0.3, 0.2, 0.5);
        assert!(tl.is_failed(0.05, Some(0.6)));
        assert!(tl.is_failed(0.4, Some(0.0)));
        assert!(!tl.is_failed(0.05, Some(0.5)));
    }

    #[test]
    fn test_virial_makes_candidate() {
        let tl = TrustLevel::with_virial(0.1, 0.3, 0.2, 0.5);
        assert_eq!(tl.classify(0.05, Some(0.3)), FrameClass::Candidate);
        assert_eq!(tl.classify(0.05, Some(0.1)), FrameClass::Accurate);
    }

    #[test]
    fn test_serde_defaults_virial_to_none() {
        let tl: TrustLevel = serde_yaml::from_str("level_f_lo: 0.1\nlevel_f_hi: 0.3\n").unwrap();
        assert_eq!(tl, TrustLevel::new(0.1, 0.3));
    }
}
