use std::sync::Arc;

use super::Workspace;
use crate::error::{Error, Result};
use crate::paths;
use crate::pipeline::{ExecutionContext, Step, StepOutcome};
use crate::tools::{compose_args, ToolRunner};

/// Brings up every compose service for the run mode.
pub struct ComposeUpStep {
    workspace: Arc<Workspace>,
    tools: Arc<dyn ToolRunner>,
}

impl ComposeUpStep {
    pub fn new(workspace: Arc<Workspace>, tools: Arc<dyn ToolRunner>) -> Self {
        Self { workspace, tools }
    }
}

impl Step for ComposeUpStep {
    fn name(&self) -> &str {
        "compose-up"
    }

    fn run(&self, ctx: &mut ExecutionContext) -> Result<StepOutcome> {
        let files = self.workspace.compose_files(ctx.run_mode());
        for file in files {
            let path = self.workspace.resolve(file);
            if !path.is_file() {
                return Err(Error::resource_missing("compose file", path.display().to_string()));
            }
        }

        let env_file = paths::env_file(self.workspace.root());
        let env_arg = env_file.is_file().then_some(paths::ENV_FILE);
        let args = compose_args(files, env_arg, &["up", "-d"]);

        log_status!("compose", "Starting services ({})", ctx.run_mode());
        self.tools.run_checked(
            &self.workspace.defaults.compose.program,
            &args,
            self.workspace.root(),
        )?;
        Ok(StepOutcome::Success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::RunMode;
    use crate::steps::testing::{workspace, FakeTools};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn containerized_run_uses_both_compose_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("docker-compose.yml"), "services: {}").unwrap();
        fs::write(
            dir.path().join("docker-compose.services.yml"),
            "services: {}",
        )
        .unwrap();
        fs::write(dir.path().join(".env"), "A=1\n").unwrap();
        let tools = Arc::new(FakeTools::default());

        ComposeUpStep::new(workspace(dir.path()), tools.clone())
            .run(&mut ExecutionContext::new(RunMode::Containerized))
            .unwrap();

        assert_eq!(
            tools.calls.borrow()[0],
            "docker compose -f docker-compose.yml -f docker-compose.services.yml --env-file .env up -d"
        );
    }

    #[test]
    fn missing_compose_file_is_required_resource() {
        let dir = TempDir::new().unwrap();
        let tools = Arc::new(FakeTools::default());

        let err = ComposeUpStep::new(workspace(dir.path()), tools.clone())
            .run(&mut ExecutionContext::new(RunMode::Local))
            .unwrap_err();

        assert_eq!(err.code.as_str(), "resource.missing");
        assert!(tools.calls.borrow().is_empty());
    }
}
