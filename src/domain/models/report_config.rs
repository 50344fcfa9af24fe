//! Settings for exploration reports and candidate down-selection.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::deviation::DeviQuantity;
use super::trust_level::TrustLevel;
use crate::domain::errors::ConfigError;

// ---------------------------------------------------------------------------
// CandidateSelection
// ---------------------------------------------------------------------------

/// How candidates are down-selected when there are more than the budget.
///
/// Written as `"uniform"` or `"inv_pop_<f|v>:<bins>"` in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CandidateSelection {
    /// Every candidate is equally likely to be picked.
    #[default]
    Uniform,
    /// Weight each candidate by the reciprocal of the population of its
    /// histogram bin over `quantity`, favouring rare deviation magnitudes.
    InversePopulation { quantity: DeviQuantity, bins: usize },
}

impl FromStr for CandidateSelection {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "uniform" {
            return Ok(Self::Uniform);
        }
        let invalid = || ConfigError::InvalidSelectionProbability(s.to_string());
        let rest = s.strip_prefix("inv_pop_").ok_or_else(invalid)?;
        let (quantity, bins) = rest.split_once(':').ok_or_else(invalid)?;
        let quantity = match quantity {
            "f" => DeviQuantity::MaxDeviF,
            "v" => DeviQuantity::MaxDeviV,
            _ => return Err(invalid()),
        };
        let bins: usize = bins.parse().map_err(|_| invalid())?;
        if bins == 0 {
            return Err(invalid());
        }
        Ok(Self::InversePopulation { quantity, bins })
    }
}

impl TryFrom<String> for CandidateSelection {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for CandidateSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uniform => f.write_str("uniform"),
            Self::InversePopulation { quantity, bins } => {
                let suffix = if *quantity == DeviQuantity::MaxDeviV {
                    "v"
                } else {
                    "f"
                };
                write!(f, "inv_pop_{suffix}:{bins}")
            }
        }
    }
}

impl From<CandidateSelection> for String {
    fn from(value: CandidateSelection) -> Self {
        value.to_string()
    }
}

// ---------------------------------------------------------------------------
// AdaptiveLowerConfig
// ---------------------------------------------------------------------------

/// Settings of the adaptive-lower report.
///
/// Upper bounds are fixed; lower bounds are chosen every iteration so that
/// roughly `max(numb_candi, ceil(rate_candi * N))` frames per quantity become
/// candidates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveLowerConfig {
    #[serde(default = "default_level_f_hi")]
    pub level_f_hi: f64,
    #[serde(default = "default_numb_candi_f")]
    pub numb_candi_f: usize,
    #[serde(default = "default_rate_candi_f")]
    pub rate_candi_f: f64,

    /// Upper virial bound; `None` disables the virial criterion.
    #[serde(default)]
    pub level_v_hi: Option<f64>,
    #[serde(default)]
    pub numb_candi_v: usize,
    #[serde(default)]
    pub rate_candi_v: f64,

    /// Number of consecutive iterations whose lower bounds must agree.
    #[serde(default = "default_n_checked_steps")]
    pub n_checked_steps: usize,
    #[serde(default = "default_conv_tolerance")]
    pub conv_tolerance: f64,

    #[serde(default)]
    pub candi_sel_prob: CandidateSelection,
}

const fn default_level_f_hi() -> f64 {
    0.5
}

const fn default_numb_candi_f() -> usize {
    200
}

const fn default_rate_candi_f() -> f64 {
    0.01
}

const fn default_n_checked_steps() -> usize {
    2
}

const fn default_conv_tolerance() -> f64 {
    0.005
}

impl Default for AdaptiveLowerConfig {
    fn default() -> Self {
        Self {
            level_f_hi: default_level_f_hi(),
            numb_candi_f: default_numb_candi_f(),
            rate_candi_f: default_rate_candi_f(),
            level_v_hi: None,
            numb_candi_v: 0,
            rate_candi_v: 0.0,
            n_checked_steps: default_n_checked_steps(),
            conv_tolerance: default_conv_tolerance(),
            candi_sel_prob: CandidateSelection::Uniform,
        }
    }
}

impl AdaptiveLowerConfig {
    pub const fn has_virial(&self) -> bool {
        self.level_v_hi.is_some()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_checked_steps == 0 {
            return Err(ConfigError::InvalidCheckedSteps(self.n_checked_steps));
        }
        if self.conv_tolerance.is_nan() || self.conv_tolerance < 0.0 {
            return Err(ConfigError::InvalidTolerance(self.conv_tolerance));
        }
        check_rate("rate_candi_f", self.rate_candi_f)?;
        check_rate("rate_candi_v", self.rate_candi_v)?;
        if !self.has_virial() && (self.numb_candi_v > 0 || self.rate_candi_v > 0.0) {
            return Err(ConfigError::ValidationFailed(
                "numb_candi_v/rate_candi_v set but level_v_hi is missing".to_string(),
            ));
        }
        if let CandidateSelection::InversePopulation {
            quantity: DeviQuantity::MaxDeviV,
            ..
        } = self.candi_sel_prob
        {
            if !self.has_virial() {
                return Err(ConfigError::ValidationFailed(
                    "inv_pop_v selection requires level_v_hi".to_string(),
                ));
            }
        }
        Ok(())
    }
}

fn check_rate(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidRate { name, value })
    }
}

// ---------------------------------------------------------------------------
// TrustLevelReportConfig
// ---------------------------------------------------------------------------

/// Settings of the fixed trust-level report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustLevelReportConfig {
    #[serde(flatten)]
    pub trust_level: TrustLevel,
    /// A stage converges once this fraction of frames is accurate.
    #[serde(default = "default_conv_accuracy")]
    pub conv_accuracy: f64,
}

const fn default_conv_accuracy() -> f64 {
    0.9
}

impl TrustLevelReportConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.conv_accuracy) {
            return Err(ConfigError::InvalidConvAccuracy(self.conv_accuracy));
        }
        if self.trust_level.level_v_lo.is_some() != self.trust_level.level_v_hi.is_some() {
            return Err(ConfigError::ValidationFailed(
                "level_v_lo and level_v_hi must be given together".to_string(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ExplorationReportConfig
// ---------------------------------------------------------------------------

/// Which report classifies each iteration, and with what settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExplorationReportConfig {
    AdaptiveLower(AdaptiveLowerConfig),
    TrustLevels(TrustLevelReportConfig),
}

impl Default for ExplorationReportConfig {
    fn default() -> Self {
        Self::AdaptiveLower(AdaptiveLowerConfig::default())
    }
}

impl ExplorationReportConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Self::AdaptiveLower(config) => config.validate(),
            Self::TrustLevels(config) => config.validate(),
        }
    }
}
