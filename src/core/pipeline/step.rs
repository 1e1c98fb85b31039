use super::context::{ExecutionContext, RunMode};
use crate::error::Result;

/// What a step reports back to the executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Success,
    /// Nothing to do (an optional resource was absent). Not fatal.
    Skipped { reason: String },
    Failed { reason: String },
}

impl StepOutcome {
    pub fn skipped(reason: impl Into<String>) -> Self {
        StepOutcome::Skipped {
            reason: reason.into(),
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        StepOutcome::Failed {
            reason: reason.into(),
        }
    }
}

/// A single unit of provisioning work.
///
/// Steps capture their configuration and collaborators at construction time and
/// read everything else from the context. Returning `Err` is equivalent to
/// `StepOutcome::Failed`; the executor converts it at the step boundary.
pub trait Step {
    fn name(&self) -> &str;

    /// Whether this step takes part in a run of the given mode. Must be pure.
    fn applies_to(&self, _mode: RunMode) -> bool {
        true
    }

    fn run(&self, ctx: &mut ExecutionContext) -> Result<StepOutcome>;
}

impl std::fmt::Debug for dyn Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Step").field("name", &self.name()).finish()
    }
}
