use std::sync::Arc;

use super::Workspace;
use crate::error::Result;
use crate::pipeline::{ExecutionContext, RunMode, Step, StepOutcome};
use crate::tools::ToolRunner;
use crate::utils::io;

const DOTNET: &str = "dotnet";

/// Exports and trusts the HTTPS development certificate used by locally run services.
///
/// Local runs only: containerized services mount the exported file instead.
pub struct DevCertsStep {
    workspace: Arc<Workspace>,
    tools: Arc<dyn ToolRunner>,
}

impl DevCertsStep {
    pub fn new(workspace: Arc<Workspace>, tools: Arc<dyn ToolRunner>) -> Self {
        Self { workspace, tools }
    }
}

impl Step for DevCertsStep {
    fn name(&self) -> &str {
        "dev-certs"
    }

    fn applies_to(&self, mode: RunMode) -> bool {
        mode == RunMode::Local
    }

    fn run(&self, _ctx: &mut ExecutionContext) -> Result<StepOutcome> {
        let env = &self.workspace.defaults.environment;
        let cert_path = self.workspace.resolve(&env.dev_certs_path);
        if let Some(parent) = cert_path.parent() {
            io::ensure_dir(parent, "create dev certificate directory")?;
        }

        let export = vec![
            "dev-certs".to_string(),
            "https".to_string(),
            "-ep".to_string(),
            cert_path.display().to_string(),
            "-p".to_string(),
            env.dev_certs_password.clone(),
        ];
        self.tools
            .run_checked(DOTNET, &export, self.workspace.root())?;

        let trust = vec![
            "dev-certs".to_string(),
            "https".to_string(),
            "--trust".to_string(),
        ];
        let trusted = self.tools.run(DOTNET, &trust, self.workspace.root())?;
        if !trusted.success {
            // Not supported on every platform; the exported file is still usable.
            log_status!(
                "dev-certs",
                "Certificate could not be trusted: {}",
                trusted.stderr
            );
        }

        Ok(StepOutcome::Success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steps::testing::{workspace, FakeTools};
    use tempfile::TempDir;

    #[test]
    fn applies_only_to_local_runs() {
        let dir = TempDir::new().unwrap();
        let step = DevCertsStep::new(workspace(dir.path()), Arc::new(FakeTools::default()));
        assert!(step.applies_to(RunMode::Local));
        assert!(!step.applies_to(RunMode::Containerized));
    }

    #[test]
    fn exports_then_trusts_certificate() {
        let dir = TempDir::new().unwrap();
        let tools = Arc::new(FakeTools::default());
        let step = DevCertsStep::new(workspace(dir.path()), tools.clone());

        step.run(&mut ExecutionContext::new(RunMode::Local))
            .unwrap();

        let calls = tools.calls.borrow();
        let expected_path = dir.path().join("devcerts/aspnetapp.pfx");
        assert_eq!(
            calls[0],
            format!(
                "dotnet dev-certs https -ep {} -p dev123",
                expected_path.display()
            )
        );
        assert_eq!(calls[1], "dotnet dev-certs https --trust");
        assert!(dir.path().join("devcerts").is_dir());
    }

    #[test]
    fn untrusted_certificate_is_not_fatal() {
        let dir = TempDir::new().unwrap();
        let tools = Arc::new(FakeTools {
            failing: vec!["dotnet dev-certs https --trust".to_string()],
            ..Default::default()
        });
        let step = DevCertsStep::new(workspace(dir.path()), tools);

        let outcome = step
            .run(&mut ExecutionContext::new(RunMode::Local))
            .unwrap();
        assert_eq!(outcome, StepOutcome::Success);
    }
}
