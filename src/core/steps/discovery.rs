use std::sync::Arc;

use super::{Collaborators, Workspace};
use crate::error::Result;
use crate::pipeline::{ExecutionContext, Step, StepOutcome};
use crate::tools::compose_args;

/// Starts the discovery server container, waits for a leader and bootstraps ACLs.
///
/// The bootstrap token becomes the run's global credential.
pub struct DiscoveryServerStep {
    service: String,
    workspace: Arc<Workspace>,
    collaborators: Collaborators,
}

impl DiscoveryServerStep {
    pub fn new(
        service: impl Into<String>,
        workspace: Arc<Workspace>,
        collaborators: Collaborators,
    ) -> Self {
        Self {
            service: service.into(),
            workspace,
            collaborators,
        }
    }
}

impl Step for DiscoveryServerStep {
    fn name(&self) -> &str {
        "discovery-server"
    }

    fn run(&self, ctx: &mut ExecutionContext) -> Result<StepOutcome> {
        let compose = &self.workspace.defaults.compose;
        let args = compose_args(
            self.workspace.compose_files(ctx.run_mode()),
            None,
            &["up", "-d", self.service.as_str()],
        );
        log_status!("discovery", "Starting {}", self.service);
        self.collaborators
            .tools
            .run_checked(&compose.program, &args, self.workspace.root())?;

        self.collaborators.registry.wait_until_ready()?;
        let token = self.collaborators.registry.bootstrap_acl()?;
        ctx.set_global_token(token)?;

        Ok(StepOutcome::Success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::RunMode;
    use crate::steps::testing::{collaborators, workspace, FakeRegistry, FakeTools};
    use tempfile::TempDir;

    #[test]
    fn starts_container_then_records_bootstrap_token() {
        let dir = TempDir::new().unwrap();
        let registry = Arc::new(FakeRegistry::default());
        let tools = Arc::new(FakeTools::default());
        let step = DiscoveryServerStep::new(
            "consul",
            workspace(dir.path()),
            collaborators(registry.clone(), tools.clone()),
        );
        let mut ctx = ExecutionContext::new(RunMode::Local);

        step.run(&mut ctx).unwrap();

        assert_eq!(ctx.global_token(), Some("root-token"));
        assert_eq!(
            tools.calls.borrow()[0],
            "docker compose -f docker-compose.yml up -d consul"
        );
        assert_eq!(*registry.calls.borrow(), vec!["wait", "bootstrap"]);
    }

    #[test]
    fn compose_failure_stops_before_registry_calls() {
        let dir = TempDir::new().unwrap();
        let registry = Arc::new(FakeRegistry::default());
        let tools = Arc::new(FakeTools {
            failing: vec!["docker compose".to_string()],
            ..Default::default()
        });
        let step = DiscoveryServerStep::new(
            "consul",
            workspace(dir.path()),
            collaborators(registry.clone(), tools),
        );
        let mut ctx = ExecutionContext::new(RunMode::Containerized);

        assert!(step.run(&mut ctx).is_err());
        assert!(registry.calls.borrow().is_empty());
        assert!(ctx.global_token().is_none());
    }
}
