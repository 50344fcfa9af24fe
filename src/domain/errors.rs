//! Domain errors for the exploration engine.

use thiserror::Error;

use super::models::deviation::DeviQuantity;

/// Errors raised while classifying frames or scheduling exploration stages.
///
/// Only [`ExplorationError::FatalConvergence`] is a scheduling outcome; every
/// other variant points at malformed input from the upstream collaborators.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExplorationError {
    #[error("Shape mismatch for {quantity}: {reason}")]
    Shape { quantity: DeviQuantity, reason: String },

    #[error("Deviation quantity not recorded: {0}")]
    MissingQuantity(DeviQuantity),

    #[error(
        "Stage '{stage}' reached the maximum number of iterations ({iterations}) without converging"
    )]
    FatalConvergence { stage: String, iterations: usize },

    #[error("Invalid selection weights: {0}")]
    InvalidWeights(String),

    #[error("Report covers {expected} trajectories but {actual} trajectory references were given")]
    TrajectoryCountMismatch { expected: usize, actual: usize },

    #[error("Stage '{0}' is already complete")]
    StageComplete(String),

    #[error("Exploration scheduler has no stages")]
    NoStages,
}

pub type ExplorationResult<T> = Result<T, ExplorationError>;

/// Configuration errors caught by validation after loading.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid n_checked_steps: {0}. Must be at least 1")]
    InvalidCheckedSteps(usize),

    #[error("Invalid conv_tolerance: {0}. Must be non-negative")]
    InvalidTolerance(f64),

    #[error("Invalid {name}: {value}. Must be between 0 and 1")]
    InvalidRate { name: &'static str, value: f64 },

    #[error("Invalid conv_accuracy: {0}. Must be between 0 and 1")]
    InvalidConvAccuracy(f64),

    #[error("Invalid candidate selection probability: {0}. Expected 'uniform' or 'inv_pop_<f|v>:<bins>'")]
    InvalidSelectionProbability(String),

    #[error("Invalid fp_task_max: {0}. Must be at least 1")]
    InvalidFpTaskMax(usize),

    #[error("Invalid max_numb_iter: {0}. Must be at least 1")]
    InvalidMaxIterations(usize),

    #[error("No exploration stages configured")]
    NoStages,

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_convergence_message() {
        let err = ExplorationError::FatalConvergence {
            stage: "stage-2".to_string(),
            iterations: 10,
        };
        assert_eq!(
            err.to_string(),
            "Stage 'stage-2' reached the maximum number of iterations (10) without converging"
        );
    }

    #[test]
    fn test_config_error_message() {
        let err = ConfigError::InvalidRate {
            name: "rate_candi_f",
            value: 1.5,
        };
        assert_eq!(
            err.to_string(),
            "Invalid rate_candi_f: 1.5. Must be between 0 and 1"
        );
    }

    #[test]
    fn test_missing_quantity_message() {
        let err = ExplorationError::MissingQuantity(DeviQuantity::MaxDeviV);
        assert_eq!(err.to_string(), "Deviation quantity not recorded: max_devi_v");
    }
}
