pub mod config;
pub mod deviation;
pub mod report_config;
pub mod task_group;
pub mod trust_level;

pub use config::{Config, ExploreConfig, LogConfig, LogFormat, RotationPolicy, StageConfig};
pub use deviation::{DeviQuantity, DeviationManager, FrameId};
pub use report_config::{
    AdaptiveLowerConfig, CandidateSelection, ExplorationReportConfig, TrustLevelReportConfig,
};
pub use task_group::{ExplorationStage, ExplorationTask, ExplorationTaskGroup};
pub use trust_level::{FrameClass, TrustLevel};
