//! Per-frame model deviations collected from an exploration round.
//!
//! The simulation layer runs every trajectory against an ensemble of models
//! and reports, per sampled frame, how far the models disagree. A
//! [`DeviationManager`] stores those numbers per [`DeviQuantity`] as one
//! sequence of frames per trajectory, and refuses data whose shape does not
//! line up with what is already stored.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::errors::{ExplorationError, ExplorationResult};

// ---------------------------------------------------------------------------
// DeviQuantity
// ---------------------------------------------------------------------------

/// A named per-frame statistic computed across the model ensemble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviQuantity {
    /// Maximum atomic force deviation in the frame.
    MaxDeviF,
    /// Minimum atomic force deviation in the frame.
    MinDeviF,
    /// Average atomic force deviation in the frame.
    AvgDeviF,
    /// Maximum virial deviation in the frame.
    MaxDeviV,
    /// Minimum virial deviation in the frame.
    MinDeviV,
    /// Average virial deviation in the frame.
    AvgDeviV,
}

impl DeviQuantity {
    /// All known quantities, in canonical order.
    pub const ALL: [Self; 6] = [
        Self::MaxDeviF,
        Self::MinDeviF,
        Self::AvgDeviF,
        Self::MaxDeviV,
        Self::MinDeviV,
        Self::AvgDeviV,
    ];

    /// Canonical snake-case name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::MaxDeviF => "max_devi_f",
            Self::MinDeviF => "min_devi_f",
            Self::AvgDeviF => "avg_devi_f",
            Self::MaxDeviV => "max_devi_v",
            Self::MinDeviV => "min_devi_v",
            Self::AvgDeviV => "avg_devi_v",
        }
    }
}

impl fmt::Display for DeviQuantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviQuantity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|q| q.as_str() == s)
            .ok_or_else(|| format!("unknown deviation quantity: {s}"))
    }
}

// ---------------------------------------------------------------------------
// FrameId
// ---------------------------------------------------------------------------

/// Identity of one sampled frame: `(trajectory index, frame index)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FrameId {
    pub traj: usize,
    pub frame: usize,
}

impl FrameId {
    pub const fn new(traj: usize, frame: usize) -> Self {
        Self { traj, frame }
    }
}

impl From<(usize, usize)> for FrameId {
    fn from((traj, frame): (usize, usize)) -> Self {
        Self { traj, frame }
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.traj, self.frame)
    }
}

// ---------------------------------------------------------------------------
// DeviationManager
// ---------------------------------------------------------------------------

/// Named arrays of per-frame deviations, one sequence per trajectory.
///
/// Every quantity stored in the same manager must describe the same
/// trajectories with the same number of frames each. Frame counts are
/// checked as trajectories are added; trajectory counts can only be
/// compared once all quantities are in, so [`get`](Self::get) and
/// [`validate`](Self::validate) check them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<DeviQuantity, Vec<Vec<f64>>>",
    into = "BTreeMap<DeviQuantity, Vec<Vec<f64>>>"
)]
pub struct DeviationManager {
    data: BTreeMap<DeviQuantity, Vec<Vec<f64>>>,
}

impl DeviationManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one trajectory's values for `quantity`.
    ///
    /// The trajectory index is the number of trajectories already stored for
    /// that quantity. Fails with [`ExplorationError::Shape`] when another
    /// quantity already holds that trajectory with a different frame count.
    pub fn add(&mut self, quantity: DeviQuantity, values: Vec<f64>) -> ExplorationResult<()> {
        let traj = self.data.get(&quantity).map_or(0, Vec::len);
        for (other, trajs) in &self.data {
            if *other == quantity {
                continue;
            }
            if let Some(existing) = trajs.get(traj) {
                if existing.len() != values.len() {
                    return Err(ExplorationError::Shape {
                        quantity,
                        reason: format!(
                            "trajectory {traj} has {} frames but {other} has {}",
                            values.len(),
                            existing.len()
                        ),
                    });
                }
            }
        }
        self.data.entry(quantity).or_default().push(values);
        Ok(())
    }

    /// Stored per-trajectory values for `quantity`.
    pub fn get(&self, quantity: DeviQuantity) -> ExplorationResult<&[Vec<f64>]> {
        self.validate()?;
        self.data
            .get(&quantity)
            .map(Vec::as_slice)
            .ok_or(ExplorationError::MissingQuantity(quantity))
    }

    /// Whether any trajectory has been recorded for `quantity`.
    pub fn contains(&self, quantity: DeviQuantity) -> bool {
        self.data.contains_key(&quantity)
    }

    /// Check that all quantities agree on trajectory and frame counts.
    pub fn validate(&self) -> ExplorationResult<()> {
        let mut iter = self.data.iter();
        let Some((first_q, first)) = iter.next() else {
            return Ok(());
        };
        for (quantity, trajs) in iter {
            if trajs.len() != first.len() {
                return Err(ExplorationError::Shape {
                    quantity: *quantity,
                    reason: format!(
                        "{} trajectories recorded but {first_q} has {}",
                        trajs.len(),
                        first.len()
                    ),
                });
            }
            for (traj, (a, b)) in trajs.iter().zip(first).enumerate() {
                if a.len() != b.len() {
                    return Err(ExplorationError::Shape {
                        quantity: *quantity,
                        reason: format!(
                            "trajectory {traj} has {} frames but {first_q} has {}",
                            a.len(),
                            b.len()
                        ),
                    });
                }
            }
        }
        Ok(())
    }

    /// Number of trajectories (taken from the first stored quantity).
    pub fn ntraj(&self) -> usize {
        self.data.values().next().map_or(0, Vec::len)
    }

    /// Number of frames in trajectory `traj`, if it exists.
    pub fn nframes(&self, traj: usize) -> Option<usize> {
        self.data
            .values()
            .next()
            .and_then(|trajs| trajs.get(traj))
            .map(Vec::len)
    }

    /// Total number of frames across all trajectories.
    pub fn total_frames(&self) -> usize {
        self.data
            .values()
            .next()
            .map_or(0, |trajs| trajs.iter().map(Vec::len).sum())
    }

    /// Quantities currently stored.
    pub fn quantities(&self) -> impl Iterator<Item = DeviQuantity> + '_ {
        self.data.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Drop all stored data.
    pub fn clear(&mut self) {
        self.data.clear();
    }
}

impl TryFrom<BTreeMap<DeviQuantity, Vec<Vec<f64>>>> for DeviationManager {
    type Error = ExplorationError;

    fn try_from(data: BTreeMap<DeviQuantity, Vec<Vec<f64>>>) -> Result<Self, Self::Error> {
        let manager = Self { data };
        manager.validate()?;
        Ok(manager)
    }
}

impl From<DeviationManager> for BTreeMap<DeviQuantity, Vec<Vec<f64>>> {
    fn from(manager: DeviationManager) -> Self {
        manager.data
    }
}
