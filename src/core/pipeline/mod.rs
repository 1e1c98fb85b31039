//! Provisioning pipeline engine: an ordered list of steps executed one at a time
//! against a shared context, aborting on the first failure.

mod builder;
mod context;
mod executor;
mod step;

pub use builder::{Pipeline, PipelineBuilder, PlannedStep, PREFIX_STEPS, SUFFIX_STEPS};
pub use context::{ExecutionContext, PolicyRecord, RunMode, ServiceToken, StepStatus};
pub use executor::{
    execute, PipelineRun, PipelineRunResult, PipelineRunSummary, PipelineState, StepReport,
    StepRunStatus,
};
pub use step::{Step, StepOutcome};
