use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use serde::Serialize;

use nexus::defaults;
use nexus::log_status;
use nexus::paths;
use nexus::pipeline::{self, ExecutionContext, PipelineBuilder, PipelineRunResult, RunMode};
use nexus::registry::ConsulClient;
use nexus::solution;
use nexus::steps::{Collaborators, Workspace};
use nexus::tools::ProcessRunner;

use super::{CmdResult, GlobalArgs, ModeArg};

#[derive(Args)]
pub struct RunArgs {
    /// Where the services run
    #[arg(value_enum)]
    pub mode: ModeArg,
}

#[derive(Debug, Serialize)]
pub struct RunOutput {
    pub command: &'static str,
    pub solution: String,
    pub root: PathBuf,
    #[serde(flatten)]
    pub result: PipelineRunResult,
}

pub fn run(args: RunArgs, global: &GlobalArgs) -> CmdResult<RunOutput> {
    let mode = RunMode::from(args.mode);
    let root = paths::solution_root(global.path.as_deref())?;
    let solution = solution::load(&root)?;
    let defaults = defaults::load_defaults();

    let collaborators = Collaborators::new(
        Arc::new(ConsulClient::new(&defaults.registry)?),
        Arc::new(ProcessRunner),
    );
    let workspace = Arc::new(Workspace::new(root.clone(), defaults));
    let pipeline = PipelineBuilder::new(&solution, workspace, collaborators).build();

    log_status!(
        "run",
        "Provisioning {} ({} steps, {})",
        solution.name,
        pipeline.len(),
        mode
    );
    let run = pipeline::execute(pipeline, ExecutionContext::new(mode));
    print_report(&run.result);

    let exit_code = if run.result.success { 0 } else { 1 };
    Ok((
        RunOutput {
            command: "run",
            solution: solution.name,
            root,
            result: run.result,
        },
        exit_code,
    ))
}

fn print_report(result: &PipelineRunResult) {
    if result.success {
        log_status!("run", "Development environment is ready");
    } else {
        log_status!(
            "run",
            "Setup aborted at {}; environment is partially provisioned",
            result
                .summary
                .failed_step
                .as_deref()
                .unwrap_or("unknown step")
        );
    }

    for policy in &result.policies {
        log_status!("run", "Policy {} ({})", policy.name, policy.id);
    }
}
