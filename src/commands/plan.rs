use std::sync::Arc;

use clap::Args;
use serde::Serialize;

use nexus::defaults;
use nexus::paths;
use nexus::pipeline::{PipelineBuilder, PlannedStep, RunMode};
use nexus::registry::ConsulClient;
use nexus::solution;
use nexus::steps::{Collaborators, Workspace};
use nexus::tools::ProcessRunner;

use super::{CmdResult, GlobalArgs, ModeArg};

#[derive(Args)]
pub struct PlanArgs {
    /// Run mode to plan for
    #[arg(value_enum)]
    pub mode: ModeArg,
}

#[derive(Debug, Serialize)]
pub struct PlanOutput {
    pub command: &'static str,
    pub solution: String,
    pub mode: RunMode,
    pub total_steps: usize,
    pub steps: Vec<PlannedStep>,
}

/// List the steps `nexus run` would execute, without running any of them.
pub fn run(args: PlanArgs, global: &GlobalArgs) -> CmdResult<PlanOutput> {
    let mode = RunMode::from(args.mode);
    let root = paths::solution_root(global.path.as_deref())?;
    let solution = solution::load(&root)?;
    let defaults = defaults::load_defaults();

    let collaborators = Collaborators::new(
        Arc::new(ConsulClient::new(&defaults.registry)?),
        Arc::new(ProcessRunner),
    );
    let workspace = Arc::new(Workspace::new(root, defaults));
    let pipeline = PipelineBuilder::new(&solution, workspace, collaborators).build();
    let steps = pipeline.plan(mode);

    Ok((
        PlanOutput {
            command: "plan",
            solution: solution.name.clone(),
            mode,
            total_steps: steps.len(),
            steps,
        },
        0,
    ))
}
