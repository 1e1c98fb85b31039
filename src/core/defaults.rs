use serde::{Deserialize, Serialize};

use crate::paths;
use crate::pipeline::RunMode;
use crate::utils::io;

/// Root configuration structure for nexus.json
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NexusConfig {
    #[serde(default)]
    pub defaults: Defaults,
}

/// All configurable defaults that can be overridden via nexus.json
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Defaults {
    #[serde(default = "default_registry")]
    pub registry: RegistryConfig,

    #[serde(default = "default_endpoints")]
    pub endpoints: EndpointsConfig,

    #[serde(default = "default_environment")]
    pub environment: EnvironmentConfig,

    #[serde(default = "default_compose")]
    pub compose: ComposeConfig,

    #[serde(default = "default_templates")]
    pub templates: TemplatesConfig,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            registry: default_registry(),
            endpoints: default_endpoints(),
            environment: default_environment(),
            compose: default_compose(),
            templates: default_templates(),
        }
    }
}

/// How the CLI itself reaches the service registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    pub address: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_ready_timeout_secs")]
    pub ready_timeout_secs: u64,
}

/// Addresses written into service configuration, as seen from where the services run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointsConfig {
    pub local: ServiceEndpoints,
    pub containerized: ServiceEndpoints,
}

impl EndpointsConfig {
    pub fn for_mode(&self, mode: RunMode) -> &ServiceEndpoints {
        match mode {
            RunMode::Local => &self.local,
            RunMode::Containerized => &self.containerized,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceEndpoints {
    pub registry_url: String,
    pub discovery_host: String,
    pub telemetry_endpoint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    pub network_name: String,
    pub dev_certs_password: String,
    /// Exported certificate location, relative to the solution root.
    pub dev_certs_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComposeConfig {
    pub program: String,
    pub local_files: Vec<String>,
    pub containerized_files: Vec<String>,
    /// Compose service that runs the discovery server.
    pub discovery_service: String,
}

impl ComposeConfig {
    pub fn files_for_mode(&self, mode: RunMode) -> &[String] {
        match mode {
            RunMode::Local => &self.local_files,
            RunMode::Containerized => &self.containerized_files,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplatesConfig {
    pub solution_url: String,
    pub service_url: String,
    pub libraries_url: String,
}

// =============================================================================
// Default value functions
// =============================================================================

fn default_registry() -> RegistryConfig {
    RegistryConfig {
        address: "http://localhost:8500".to_string(),
        request_timeout_secs: default_request_timeout_secs(),
        ready_timeout_secs: default_ready_timeout_secs(),
    }
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_ready_timeout_secs() -> u64 {
    60
}

fn default_endpoints() -> EndpointsConfig {
    EndpointsConfig {
        local: ServiceEndpoints {
            registry_url: "http://localhost:8500".to_string(),
            discovery_host: "localhost".to_string(),
            telemetry_endpoint: "http://localhost:4317".to_string(),
        },
        containerized: ServiceEndpoints {
            registry_url: "http://consul:8500".to_string(),
            discovery_host: "consul".to_string(),
            telemetry_endpoint: "http://otel-collector:4317".to_string(),
        },
    }
}

fn default_environment() -> EnvironmentConfig {
    EnvironmentConfig {
        network_name: "consul_external".to_string(),
        dev_certs_password: "dev123".to_string(),
        dev_certs_path: "devcerts/aspnetapp.pfx".to_string(),
    }
}

fn default_compose() -> ComposeConfig {
    ComposeConfig {
        program: "docker".to_string(),
        local_files: vec!["docker-compose.yml".to_string()],
        containerized_files: vec![
            "docker-compose.yml".to_string(),
            "docker-compose.services.yml".to_string(),
        ],
        discovery_service: "consul".to_string(),
    }
}

fn default_templates() -> TemplatesConfig {
    TemplatesConfig {
        solution_url: "https://codeload.github.com/nexus-framework/nexus/zip/refs/heads/master"
            .to_string(),
        service_url:
            "https://codeload.github.com/nexus-framework/nexus-template/zip/refs/heads/master"
                .to_string(),
        libraries_url:
            "https://codeload.github.com/nexus-framework/nexus-libraries/zip/refs/heads/master"
                .to_string(),
    }
}

// =============================================================================
// Loading functions
// =============================================================================

/// Load defaults, merging file config with built-in defaults.
/// If nexus.json is missing or invalid, silently returns built-in defaults.
pub fn load_defaults() -> Defaults {
    load_config().defaults
}

/// Load the full nexus.json config, falling back to defaults when it is missing or invalid.
pub fn load_config() -> NexusConfig {
    load_config_from_file().ok().flatten().unwrap_or_default()
}

fn load_config_from_file() -> crate::Result<Option<NexusConfig>> {
    let path = paths::nexus_json()?;
    io::read_optional(&path, "read nexus.json")?
        .map(|content| parse_config(&content))
        .transpose()
}

fn parse_config(content: &str) -> crate::Result<NexusConfig> {
    serde_json::from_str(content).map_err(|e| {
        crate::Error::validation_invalid_json(e, Some("parse nexus.json".to_string()))
    })
}

/// Check if nexus.json file exists
pub fn config_exists() -> bool {
    paths::nexus_json().map(|p| p.exists()).unwrap_or(false)
}

/// Get the path to nexus.json (for display purposes)
pub fn config_path() -> crate::Result<String> {
    Ok(paths::nexus_json()?.display().to_string())
}

/// Get built-in defaults (ignoring any file config)
pub fn builtin_defaults() -> Defaults {
    Defaults::default()
}
