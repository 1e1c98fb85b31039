use std::path::PathBuf;
use std::sync::Arc;

use super::{Collaborators, Workspace};
use crate::config_files::{self, RewriteOutcome, APP_CONFIG_FILE, OCELOT_GLOBAL_FILE, RULES_FILE};
use crate::error::{Error, Result};
use crate::pipeline::{ExecutionContext, Step, StepOutcome};
use crate::solution::{ApiGatewayConfig, ComponentConfig};
use crate::utils::io;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentKind {
    ApiGateway { ocelot_directory: String },
    HealthChecksDashboard,
    Service,
}

/// Provisions one registry-backed component: policy, token, config rewrites and
/// the app-config upload.
///
/// `rules.hcl` is required. Config files are optional; when any is absent the
/// step still issues credentials and reports a skip naming the missing files.
pub struct RegistryComponentStep {
    name: String,
    kind: ComponentKind,
    component: ComponentConfig,
    workspace: Arc<Workspace>,
    collaborators: Collaborators,
}

impl RegistryComponentStep {
    pub fn api_gateway(
        config: &ApiGatewayConfig,
        workspace: Arc<Workspace>,
        collaborators: Collaborators,
    ) -> Self {
        Self {
            name: "api-gateway".to_string(),
            kind: ComponentKind::ApiGateway {
                ocelot_directory: config.ocelot_directory.clone(),
            },
            component: config.component.clone(),
            workspace,
            collaborators,
        }
    }

    pub fn health_checks_dashboard(
        config: &ComponentConfig,
        workspace: Arc<Workspace>,
        collaborators: Collaborators,
    ) -> Self {
        Self {
            name: "health-checks-dashboard".to_string(),
            kind: ComponentKind::HealthChecksDashboard,
            component: config.clone(),
            workspace,
            collaborators,
        }
    }

    pub fn service(
        config: &ComponentConfig,
        workspace: Arc<Workspace>,
        collaborators: Collaborators,
    ) -> Self {
        Self {
            name: format!("service:{}", config.service_name),
            kind: ComponentKind::Service,
            component: config.clone(),
            workspace,
            collaborators,
        }
    }

    pub fn kind(&self) -> &ComponentKind {
        &self.kind
    }

    fn read_rules(&self) -> Result<String> {
        let path = self
            .workspace
            .resolve(&self.component.consul_config_directory)
            .join(RULES_FILE);
        io::read_optional(&path, "read policy rules")?
            .ok_or_else(|| Error::resource_missing("policy rules", path.display().to_string()))
    }
}

impl Step for RegistryComponentStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, ctx: &mut ExecutionContext) -> Result<StepOutcome> {
        let scope = self.component.service_name.as_str();
        let registry = &self.collaborators.registry;
        let credential = ctx.require_global_token()?.to_string();

        let rules = self.read_rules()?;
        let policy = registry.create_policy(&credential, &rules, scope)?;
        let policy_name = policy.name.clone();
        ctx.record_policy(policy);

        let token = registry.create_token(&credential, scope, &policy_name)?;
        ctx.record_service_token(scope, token.clone())?;
        log_status!("registry", "Issued token for {}", scope);

        let endpoints = self.workspace.endpoints(ctx.run_mode());
        let consul_dir = self
            .workspace
            .resolve(&self.component.consul_config_directory);
        let mut absent: Vec<PathBuf> = Vec::new();

        match config_files::rewrite_app_config(
            &consul_dir.join(APP_CONFIG_FILE),
            &token,
            &endpoints.telemetry_endpoint,
        )? {
            RewriteOutcome::Rewritten { content, .. } => {
                registry.put_key_value(scope, &content, &credential)?
            }
            RewriteOutcome::Absent { path } => absent.push(path),
        }

        if let ComponentKind::ApiGateway { ocelot_directory } = &self.kind {
            let path = self
                .workspace
                .resolve(ocelot_directory)
                .join(OCELOT_GLOBAL_FILE);
            if let RewriteOutcome::Absent { path } =
                config_files::rewrite_ocelot_global(&path, &endpoints.discovery_host, &token)?
            {
                absent.push(path);
            }
        }

        let app_settings = self
            .workspace
            .resolve(&self.component.app_settings_config_path);
        if let RewriteOutcome::Absent { path } =
            config_files::rewrite_app_settings(&app_settings, &endpoints.registry_url, &token)?
        {
            absent.push(path);
        }

        if absent.is_empty() {
            return Ok(StepOutcome::Success);
        }

        let missing: Vec<String> = absent.iter().map(|p| p.display().to_string()).collect();
        Ok(StepOutcome::skipped(format!(
            "config not found, left unchanged: {}",
            missing.join(", ")
        )))
    }
}
