use std::sync::Arc;

use super::Workspace;
use crate::env_file::EnvFile;
use crate::error::Result;
use crate::naming::token_env_key;
use crate::paths;
use crate::pipeline::{ExecutionContext, Step, StepOutcome};

/// `.env` key holding the bootstrap (management) token.
pub const GLOBAL_TOKEN_KEY: &str = "CONSUL_MANAGEMENT_TOKEN";

/// Writes network, certificate and token values into the solution's `.env` so
/// the compose tool can pass them to containers.
pub struct EnvironmentUpdateStep {
    workspace: Arc<Workspace>,
}

impl EnvironmentUpdateStep {
    pub fn new(workspace: Arc<Workspace>) -> Self {
        Self { workspace }
    }
}

impl Step for EnvironmentUpdateStep {
    fn name(&self) -> &str {
        "environment-update"
    }

    fn run(&self, ctx: &mut ExecutionContext) -> Result<StepOutcome> {
        let path = paths::env_file(self.workspace.root());
        let env_config = &self.workspace.defaults.environment;
        let mut env = EnvFile::load(&path)?;

        env.set("NETWORK_NAME", &env_config.network_name);
        env.set("DEV_CERTS_PASSWORD", &env_config.dev_certs_password);
        env.set("DEV_CERTS_PATH", &env_config.dev_certs_path);
        if let Some(token) = ctx.global_token() {
            env.set(GLOBAL_TOKEN_KEY, token);
        }
        for entry in ctx.service_tokens() {
            env.set(&token_env_key(&entry.service), &entry.token);
        }

        env.save(&path)?;
        log_status!("environment", "Updated {}", path.display());
        Ok(StepOutcome::Success)
    }
}
