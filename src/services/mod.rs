//! Exploration services: reports, configuration selection and scheduling.

pub mod conf_selector;
pub mod exploration_scheduler;
pub mod report;
pub mod stage_scheduler;

pub use conf_selector::{ConfSelector, FrameSelector, SelectedConf, SelectedConfs};
pub use exploration_scheduler::{ExplorationPlan, ExplorationScheduler, SchedulerState};
pub use report::{AdaptiveLowerReport, ExplorationReport, ReportSummary, TrustLevelReport};
pub use stage_scheduler::{
    ConvergenceCheckStageScheduler, StagePlan, StageScheduler, StageState, StageStatus,
};
