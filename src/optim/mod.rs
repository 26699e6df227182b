//! Optimizers, parameter groups and the two-stage schedule

mod adam;
mod groups;
mod optimizer;
mod stage;

pub use adam::Adam;
pub use groups::{GroupRates, GroupedOptimizer, ParamGroup, ParameterRegistry, ParameterState};
pub use optimizer::Optimizer;
pub use stage::{StageScheduler, StageTransition, TrainingStage, JOINT_LR_SCALE};
