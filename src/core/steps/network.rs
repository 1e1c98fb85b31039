use std::sync::Arc;

use super::Workspace;
use crate::error::Result;
use crate::pipeline::{ExecutionContext, Step, StepOutcome};
use crate::tools::ToolRunner;

/// Creates the external docker network shared by every compose project.
pub struct InitializeNetworkStep {
    workspace: Arc<Workspace>,
    tools: Arc<dyn ToolRunner>,
}

impl InitializeNetworkStep {
    pub fn new(workspace: Arc<Workspace>, tools: Arc<dyn ToolRunner>) -> Self {
        Self { workspace, tools }
    }
}

impl Step for InitializeNetworkStep {
    fn name(&self) -> &str {
        "initialize-network"
    }

    fn run(&self, _ctx: &mut ExecutionContext) -> Result<StepOutcome> {
        let program = &self.workspace.defaults.compose.program;
        let network = &self.workspace.defaults.environment.network_name;

        let inspect = self.tools.run(
            program,
            &[
                "network".to_string(),
                "inspect".to_string(),
                network.clone(),
            ],
            self.workspace.root(),
        )?;
        if inspect.success {
            return Ok(StepOutcome::skipped(format!(
                "network '{}' already exists",
                network
            )));
        }

        log_status!("network", "Creating network {}", network);
        self.tools.run_checked(
            program,
            &["network".to_string(), "create".to_string(), network.clone()],
            self.workspace.root(),
        )?;
        Ok(StepOutcome::Success)
    }
}
