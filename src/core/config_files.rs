//! Typed read-modify-write of the generated JSON configuration files.
//!
//! Each file kind has a schema covering the sections nexus writes to; every other
//! key is carried through untouched via `#[serde(flatten)]`. A file that exists
//! but lacks a required section fails to parse instead of being written back
//! malformed.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::utils::io;

pub const APP_CONFIG_FILE: &str = "app-config.json";
pub const OCELOT_GLOBAL_FILE: &str = "ocelot.global.json";
pub const RULES_FILE: &str = "rules.hcl";

pub trait ConfigDocument: Serialize + DeserializeOwned {
    const KIND: &'static str;
}

/// `app-config.json`, uploaded to the registry KV store after rewriting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(rename = "Consul")]
    pub consul: ConsulSection,
    #[serde(rename = "TelemetrySettings")]
    pub telemetry_settings: TelemetrySection,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsulSection {
    #[serde(rename = "Token", default)]
    pub token: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetrySection {
    #[serde(rename = "Endpoint", default)]
    pub endpoint: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ConfigDocument for AppConfig {
    const KIND: &'static str = "app-config";
}

/// `appsettings.json` of a service or framework component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(rename = "ConsulKV")]
    pub consul_kv: ConsulKvSection,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsulKvSection {
    #[serde(rename = "Url", default)]
    pub url: String,
    #[serde(rename = "Token", default)]
    pub token: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ConfigDocument for AppSettings {
    const KIND: &'static str = "appsettings";
}

/// `ocelot.global.json` of the API gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcelotGlobalConfig {
    #[serde(rename = "GlobalConfiguration")]
    pub global_configuration: OcelotGlobalConfiguration,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcelotGlobalConfiguration {
    #[serde(rename = "ServiceDiscoveryProvider")]
    pub service_discovery_provider: ServiceDiscoveryProvider,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceDiscoveryProvider {
    #[serde(rename = "Host", default)]
    pub host: String,
    #[serde(rename = "Token", default)]
    pub token: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ConfigDocument for OcelotGlobalConfig {
    const KIND: &'static str = "ocelot";
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteOutcome {
    /// File rewritten; `content` is exactly what was written.
    Rewritten { path: PathBuf, content: String },
    /// Target file does not exist. Not an error.
    Absent { path: PathBuf },
}

impl RewriteOutcome {
    pub fn is_absent(&self) -> bool {
        matches!(self, RewriteOutcome::Absent { .. })
    }
}

/// Read `path` as `D`, apply `update`, write it back pretty-printed.
pub fn rewrite<D, F>(path: &Path, update: F) -> Result<RewriteOutcome>
where
    D: ConfigDocument,
    F: FnOnce(&mut D),
{
    let operation = format!("rewrite {}", D::KIND);
    let raw = match io::read_optional(path, &operation)? {
        Some(raw) => raw,
        None => {
            return Ok(RewriteOutcome::Absent {
                path: path.to_path_buf(),
            })
        }
    };

    let mut document: D = serde_json::from_str(&raw)
        .map_err(|e| Error::config_invalid_json(path.display().to_string(), e))?;

    update(&mut document);

    let content = serde_json::to_string_pretty(&document)
        .map_err(|e| Error::internal_json(e.to_string(), Some(operation.clone())))?;
    io::write_file_atomic(path, &content, &operation)?;

    Ok(RewriteOutcome::Rewritten {
        path: path.to_path_buf(),
        content,
    })
}

pub fn rewrite_app_config(
    path: &Path,
    token: &str,
    telemetry_endpoint: &str,
) -> Result<RewriteOutcome> {
    rewrite(path, |doc: &mut AppConfig| {
        doc.consul.token = token.to_string();
        doc.telemetry_settings.endpoint = telemetry_endpoint.to_string();
    })
}

pub fn rewrite_app_settings(
    path: &Path,
    registry_url: &str,
    token: &str,
) -> Result<RewriteOutcome> {
    rewrite(path, |doc: &mut AppSettings| {
        doc.consul_kv.url = registry_url.to_string();
        doc.consul_kv.token = token.to_string();
    })
}

pub fn rewrite_ocelot_global(
    path: &Path,
    discovery_host: &str,
    token: &str,
) -> Result<RewriteOutcome> {
    rewrite(path, |doc: &mut OcelotGlobalConfig| {
        let provider = &mut doc.global_configuration.service_discovery_provider;
        provider.host = discovery_host.to_string();
        provider.token = token.to_string();
    })
}
