//! Solution description (`nexus.yaml`): the framework components and the ordered
//! list of declared services.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::naming::{token_env_key, ServiceNames};
use crate::paths;
use crate::utils::io;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Solution {
    pub name: String,
    pub framework: Framework,
    /// Declaration order is pipeline order.
    #[serde(default)]
    pub services: Vec<ComponentConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Framework {
    pub api_gateway: ApiGatewayConfig,
    pub health_checks_dashboard: ComponentConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discovery_server: Option<DiscoveryServerConfig>,
}

/// Registry-backed component: gets its own policy, token and config rewrites.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentConfig {
    pub service_name: String,
    /// Directory holding `rules.hcl` and `app-config.json`, relative to the solution root.
    pub consul_config_directory: String,
    pub app_settings_config_path: String,
    #[serde(default)]
    pub ports: ServicePorts,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiGatewayConfig {
    #[serde(flatten)]
    pub component: ComponentConfig,
    pub ocelot_directory: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryServerConfig {
    /// Compose service name; overrides the tool default.
    pub service_name: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicePorts {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub https: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db: Option<u16>,
}

impl ServicePorts {
    pub fn iter(&self) -> impl Iterator<Item = u16> {
        [self.http, self.https, self.db].into_iter().flatten()
    }
}

impl ComponentConfig {
    /// Layout produced by the service template for a newly added service.
    pub fn for_new_service(names: &ServiceNames, ports: ServicePorts) -> Self {
        let root = format!("services/{}", names.kebab_api);
        Self {
            service_name: names.kebab_api.clone(),
            consul_config_directory: format!("{}/.consul", root),
            app_settings_config_path: format!(
                "{}/src/{}/appsettings.json",
                root, names.pascal_dot_api
            ),
            ports,
        }
    }
}

impl Solution {
    /// Description written by `nexus init`, matching the solution template layout.
    pub fn starter(name: &str) -> Self {
        Self {
            name: name.to_string(),
            framework: Framework {
                api_gateway: ApiGatewayConfig {
                    component: ComponentConfig {
                        service_name: "api-gateway".to_string(),
                        consul_config_directory: "framework/api-gateway/.consul".to_string(),
                        app_settings_config_path:
                            "framework/api-gateway/src/ApiGateway/appsettings.json"
                                .to_string(),
                        ports: ServicePorts {
                            http: Some(5000),
                            https: Some(5001),
                            db: None,
                        },
                    },
                    ocelot_directory: "framework/api-gateway/src/ApiGateway/Ocelot".to_string(),
                },
                health_checks_dashboard: ComponentConfig {
                    service_name: "health-checks-dashboard".to_string(),
                    consul_config_directory: "framework/health-checks-dashboard/.consul"
                        .to_string(),
                    app_settings_config_path: "framework/health-checks-dashboard/src/HealthChecksDashboard/appsettings.json"
                        .to_string(),
                    ports: ServicePorts {
                        http: Some(5050),
                        https: Some(5051),
                        db: None,
                    },
                },
                discovery_server: None,
            },
            services: Vec::new(),
        }
    }

    /// Framework components followed by services, in pipeline order.
    pub fn components(&self) -> impl Iterator<Item = &ComponentConfig> {
        [
            &self.framework.api_gateway.component,
            &self.framework.health_checks_dashboard,
        ]
        .into_iter()
        .chain(self.services.iter())
    }

    /// Append a service. Names, token keys and ports must be unique across the solution.
    pub fn add_service(&mut self, service: ComponentConfig) -> Result<()> {
        let token_key = token_env_key(&service.service_name);
        if let Some(existing) = self
            .components()
            .find(|c| token_env_key(&c.service_name) == token_key)
        {
            return Err(Error::service_already_declared(
                &service.service_name,
                format!(
                    "Service '{}' clashes with declared service '{}'",
                    service.service_name, existing.service_name
                ),
            ));
        }

        let ports: Vec<u16> = service.ports.iter().collect();
        for (i, port) in ports.iter().enumerate() {
            if ports[..i].contains(port) {
                return Err(port_clash(&service, *port, &service.service_name));
            }
            if let Some(owner) = self
                .components()
                .find(|c| c.ports.iter().any(|p| p == *port))
            {
                return Err(port_clash(&service, *port, &owner.service_name));
            }
        }

        self.services.push(service);
        Ok(())
    }
}

fn port_clash(service: &ComponentConfig, port: u16, owner: &str) -> Error {
    Error::validation_invalid_argument(
        "ports",
        format!("Port {} is already used by '{}'", port, owner),
        Some(service.service_name.clone()),
        None,
    )
}

pub fn parse(content: &str, path: &Path) -> Result<Solution> {
    serde_yml::from_str(content)
        .map_err(|e| Error::config_invalid_yaml(path.display().to_string(), e))
}

/// Load `nexus.yaml` from the solution root.
pub fn load(root: &Path) -> Result<Solution> {
    let path = paths::solution_file(root);
    let content = io::read_optional(&path, "read solution description")?
        .ok_or_else(|| Error::solution_not_found(path.display().to_string()))?;
    parse(&content, &path)
}

pub fn save(root: &Path, solution: &Solution) -> Result<()> {
    let path = paths::solution_file(root);
    let content = serde_yml::to_string(solution).map_err(|e| {
        Error::internal_unexpected(format!("Failed to serialize solution description: {}", e))
    })?;
    io::write_file_atomic(&path, &content, "write solution description")
}
