use std::sync::Arc;

use serde::Serialize;

use super::context::RunMode;
use super::step::Step;
use crate::solution::Solution;
use crate::steps::{
    Collaborators, ComposeUpStep, DevCertsStep, DiscoveryServerStep, EnvironmentUpdateStep,
    InitializeNetworkStep, RegistryComponentStep, Workspace,
};

/// Steps before the per-service steps.
pub const PREFIX_STEPS: usize = 5;
/// Steps after the per-service steps.
pub const SUFFIX_STEPS: usize = 2;

/// Ordered, immutable list of steps for one run.
#[derive(Debug)]
pub struct Pipeline {
    steps: Vec<Box<dyn Step>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedStep {
    /// 1-indexed.
    pub position: usize,
    pub name: String,
    pub applicable: bool,
}

impl Pipeline {
    pub fn from_steps(steps: Vec<Box<dyn Step>>) -> Self {
        Self { steps }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|step| step.name()).collect()
    }

    /// What a run in `mode` would execute, without executing anything.
    pub fn plan(&self, mode: RunMode) -> Vec<PlannedStep> {
        self.steps
            .iter()
            .enumerate()
            .map(|(index, step)| PlannedStep {
                position: index + 1,
                name: step.name().to_string(),
                applicable: step.applies_to(mode),
            })
            .collect()
    }

    pub(super) fn steps(&self) -> &[Box<dyn Step>] {
        &self.steps
    }
}

/// Assembles the fixed prefix, one step per declared service and the fixed suffix.
pub struct PipelineBuilder<'a> {
    solution: &'a Solution,
    workspace: Arc<Workspace>,
    collaborators: Collaborators,
}

impl<'a> PipelineBuilder<'a> {
    pub fn new(
        solution: &'a Solution,
        workspace: Arc<Workspace>,
        collaborators: Collaborators,
    ) -> Self {
        Self {
            solution,
            workspace,
            collaborators,
        }
    }

    pub fn build(&self) -> Pipeline {
        let ws = &self.workspace;
        let tools = &self.collaborators.tools;
        let framework = &self.solution.framework;

        let discovery_service = framework
            .discovery_server
            .as_ref()
            .map(|d| d.service_name.clone())
            .unwrap_or_else(|| ws.defaults.compose.discovery_service.clone());

        let mut steps: Vec<Box<dyn Step>> =
            Vec::with_capacity(PREFIX_STEPS + self.solution.services.len() + SUFFIX_STEPS);

        steps.push(Box::new(InitializeNetworkStep::new(
            Arc::clone(ws),
            Arc::clone(tools),
        )));
        steps.push(Box::new(DevCertsStep::new(
            Arc::clone(ws),
            Arc::clone(tools),
        )));
        steps.push(Box::new(DiscoveryServerStep::new(
            discovery_service,
            Arc::clone(ws),
            self.collaborators.clone(),
        )));
        steps.push(Box::new(RegistryComponentStep::api_gateway(
            &framework.api_gateway,
            Arc::clone(ws),
            self.collaborators.clone(),
        )));
        steps.push(Box::new(RegistryComponentStep::health_checks_dashboard(
            &framework.health_checks_dashboard,
            Arc::clone(ws),
            self.collaborators.clone(),
        )));

        for service in &self.solution.services {
            steps.push(Box::new(RegistryComponentStep::service(
                service,
                Arc::clone(ws),
                self.collaborators.clone(),
            )));
        }

        steps.push(Box::new(EnvironmentUpdateStep::new(Arc::clone(ws))));
        steps.push(Box::new(ComposeUpStep::new(
            Arc::clone(ws),
            Arc::clone(tools),
        )));

        Pipeline::from_steps(steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solution::{ComponentConfig, ServicePorts};
    use crate::steps::testing::{collaborators, workspace};
    use tempfile::TempDir;

    fn solution_with(services: &[&str]) -> Solution {
        let mut solution = Solution::starter("AcmeCloud");
        solution.services = services
            .iter()
            .map(|name| ComponentConfig {
                service_name: name.to_string(),
                consul_config_directory: format!("services/{}/.consul", name),
                app_settings_config_path: format!("services/{}/appsettings.json", name),
                ports: ServicePorts::default(),
            })
            .collect();
        solution
    }

    fn build(solution: &Solution) -> Pipeline {
        let dir = TempDir::new().unwrap();
        PipelineBuilder::new(
            solution,
            workspace(dir.path()),
            collaborators(Arc::default(), Arc::default()),
        )
        .build()
    }

    #[test]
    fn no_services_yields_prefix_and_suffix() {
        let pipeline = build(&solution_with(&[]));

        assert_eq!(pipeline.len(), PREFIX_STEPS + SUFFIX_STEPS);
        assert_eq!(
            pipeline.step_names(),
            vec![
                "initialize-network",
                "dev-certs",
                "discovery-server",
                "api-gateway",
                "health-checks-dashboard",
                "environment-update",
                "compose-up"
            ]
        );
    }

    #[test]
    fn service_steps_are_contiguous_in_declaration_order() {
        let pipeline = build(&solution_with(&["zeta-api", "alpha-api", "mid-api"]));
        let names = pipeline.step_names();

        assert_eq!(names.len(), PREFIX_STEPS + 3 + SUFFIX_STEPS);
        assert_eq!(
            &names[PREFIX_STEPS..PREFIX_STEPS + 3],
            &["service:zeta-api", "service:alpha-api", "service:mid-api"]
        );
    }

    #[test]
    fn duplicate_services_are_not_deduplicated() {
        let pipeline = build(&solution_with(&["dup-api", "dup-api"]));
        assert_eq!(pipeline.len(), PREFIX_STEPS + 2 + SUFFIX_STEPS);
    }

    #[test]
    fn plan_marks_dev_certs_local_only() {
        let pipeline = build(&solution_with(&["projects-api"]));

        let containerized = pipeline.plan(RunMode::Containerized);
        let dev_certs = containerized
            .iter()
            .find(|s| s.name == "dev-certs")
            .unwrap();
        assert!(!dev_certs.applicable);
        assert_eq!(dev_certs.position, 2);
        assert!(pipeline.plan(RunMode::Local).iter().all(|s| s.applicable));
    }
}
