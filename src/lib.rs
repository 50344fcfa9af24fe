//! mlip-explore - exploration/convergence engine for interatomic potential
//! training loops
//!
//! Every iteration, an ensemble of models is run over freshly simulated
//! trajectories and the spread of their predictions (the model deviation) is
//! recorded per frame. This crate classifies those frames as accurate,
//! candidate, or failed, picks candidates for first-principles labeling and
//! decides when an exploration stage has converged.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): deviation data, trust levels, configuration
//!   and error types
//! - **Service Layer** (`services`): reports, configuration selectors, stage
//!   and exploration schedulers
//! - **Infrastructure Layer** (`infrastructure`): configuration loading and
//!   logging
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```no_run
//! use mlip_explore::{ConfigLoader, ExplorationScheduler};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = ConfigLoader::load("explore.yaml")?;
//!     let scheduler = ExplorationScheduler::from_config(&config.explore)?;
//!     let mut state = scheduler.initial_state();
//!     let _first = scheduler.plan_next_iteration(&mut state, None, &[])?;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{ConfigError, ExplorationError, ExplorationResult};
pub use domain::models::{
    AdaptiveLowerConfig, CandidateSelection, Config, DeviQuantity, DeviationManager,
    ExplorationReportConfig, ExplorationStage, ExplorationTask, ExplorationTaskGroup,
    ExploreConfig, FrameId, StageConfig, TrustLevel, TrustLevelReportConfig,
};
pub use infrastructure::config::ConfigLoader;
pub use services::{
    ConfSelector, ConvergenceCheckStageScheduler, ExplorationPlan, ExplorationReport,
    ExplorationScheduler, FrameSelector, ReportSummary, SchedulerState, SelectedConfs,
    StagePlan, StageScheduler, StageState, StageStatus,
};
