//! Service registry (Consul) ACL and key-value client.
//!
//! Steps only see the [`RegistryClient`] trait; [`ConsulClient`] is the HTTP
//! implementation used by the CLI.

use std::thread;
use std::time::{Duration, Instant};

use reqwest::blocking::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::defaults::RegistryConfig;
use crate::error::{Error, Result};
use crate::pipeline::PolicyRecord;

const TOKEN_HEADER: &str = "X-Consul-Token";
const READY_POLL_INTERVAL: Duration = Duration::from_secs(1);

pub trait RegistryClient {
    /// Blocks until the registry has elected a leader, bounded by the client's own timeout.
    fn wait_until_ready(&self) -> Result<()>;

    /// Bootstraps the ACL system and returns the management token.
    fn bootstrap_acl(&self) -> Result<String>;

    fn create_policy(&self, credential: &str, rules: &str, scope: &str) -> Result<PolicyRecord>;

    fn create_token(&self, credential: &str, scope: &str, policy_name: &str) -> Result<String>;

    fn put_key_value(&self, scope: &str, payload: &str, credential: &str) -> Result<()>;
}

/// Name under which the policy for `scope` is created.
pub fn policy_name(scope: &str) -> String {
    format!("{}-policy", scope)
}

/// KV key holding the uploaded app-config for `scope`.
pub fn app_config_key(scope: &str) -> String {
    format!("{}/app-config", scope)
}

pub struct ConsulClient {
    client: Client,
    address: String,
    ready_timeout: Duration,
}

impl ConsulClient {
    pub fn new(config: &RegistryConfig) -> Result<Self> {
        let address = config.address.trim_end_matches('/').to_string();
        if address.is_empty() {
            return Err(Error::config_invalid_value(
                "registry.address",
                None,
                "Registry address is empty",
            ));
        }

        let client = Client::builder()
            .user_agent(format!("nexus/{}", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| {
                Error::internal_io(e.to_string(), Some("create HTTP client".to_string()))
            })?;

        Ok(Self {
            client,
            address,
            ready_timeout: Duration::from_secs(config.ready_timeout_secs),
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.address, endpoint)
    }

    fn send(&self, operation: &str, request: RequestBuilder) -> Result<String> {
        let response = request
            .send()
            .map_err(|e| self.transport_error(operation, e))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| self.transport_error(operation, e))?;

        if !status.is_success() {
            return Err(Error::registry_request_failed(
                operation,
                Some(status.as_u16()),
                body,
            ));
        }

        Ok(body)
    }

    fn transport_error(&self, operation: &str, err: reqwest::Error) -> Error {
        if err.is_connect() {
            Error::registry_unreachable(&self.address, err.to_string())
        } else {
            Error::registry_request_failed(operation, None, err.to_string())
        }
    }

    fn leader_elected(&self) -> Result<bool> {
        let body = self.send(
            "status leader",
            self.client.get(self.url("/v1/status/leader")),
        )?;
        Ok(leader_from_body(&body).is_some())
    }
}

impl RegistryClient for ConsulClient {
    fn wait_until_ready(&self) -> Result<()> {
        let deadline = Instant::now() + self.ready_timeout;
        loop {
            let last_error = match self.leader_elected() {
                Ok(true) => return Ok(()),
                Ok(false) => None,
                Err(err) => Some(err),
            };

            if Instant::now() >= deadline {
                return Err(last_error.unwrap_or_else(|| {
                    Error::registry_unreachable(&self.address, "no leader elected before timeout")
                }));
            }
            thread::sleep(READY_POLL_INTERVAL);
        }
    }

    fn bootstrap_acl(&self) -> Result<String> {
        let body = self
            .send(
                "acl bootstrap",
                self.client.put(self.url("/v1/acl/bootstrap")),
            )
            .map_err(|e| {
                if e.details.get("status").and_then(Value::as_u64) == Some(403) {
                    e.with_hint(
                        "ACLs were already bootstrapped; remove the discovery server's data volume to start fresh",
                    )
                } else {
                    e
                }
            })?;
        parse_secret_id(&body, "acl bootstrap")
    }

    fn create_policy(&self, credential: &str, rules: &str, scope: &str) -> Result<PolicyRecord> {
        let body = self.send(
            "create policy",
            self.client
                .put(self.url("/v1/acl/policy"))
                .header(TOKEN_HEADER, credential)
                .json(&policy_request(rules, scope)),
        )?;
        parse_policy(&body)
    }

    fn create_token(&self, credential: &str, scope: &str, policy_name: &str) -> Result<String> {
        let body = self.send(
            "create token",
            self.client
                .put(self.url("/v1/acl/token"))
                .header(TOKEN_HEADER, credential)
                .json(&token_request(scope, policy_name)),
        )?;
        parse_secret_id(&body, "create token")
    }

    fn put_key_value(&self, scope: &str, payload: &str, credential: &str) -> Result<()> {
        let endpoint = format!("/v1/kv/{}", app_config_key(scope));
        let body = self.send(
            "put key value",
            self.client
                .put(self.url(&endpoint))
                .header(TOKEN_HEADER, credential)
                .body(payload.to_string()),
        )?;

        if body.trim() != "true" {
            return Err(Error::registry_request_failed("put key value", None, body));
        }
        Ok(())
    }
}

fn policy_request(rules: &str, scope: &str) -> Value {
    json!({
        "Name": policy_name(scope),
        "Description": format!("Access policy for {}", scope),
        "Rules": rules,
    })
}

fn token_request(scope: &str, policy_name: &str) -> Value {
    json!({
        "Description": format!("Token for {}", scope),
        "Policies": [{ "Name": policy_name }],
        "Local": false,
    })
}

#[derive(Deserialize)]
struct PolicyResponse {
    #[serde(rename = "ID", default)]
    id: String,
    #[serde(rename = "Name", default)]
    name: String,
}

#[derive(Deserialize)]
struct SecretResponse {
    #[serde(rename = "SecretID", default)]
    secret_id: String,
}

fn parse_policy(body: &str) -> Result<PolicyRecord> {
    let parsed: PolicyResponse = serde_json::from_str(body).map_err(|e| {
        Error::internal_json(e.to_string(), Some("parse policy response".to_string()))
    })?;

    if parsed.id.is_empty() || parsed.name.is_empty() {
        return Err(Error::registry_request_failed(
            "create policy",
            None,
            "Response did not contain a policy ID and name",
        ));
    }

    Ok(PolicyRecord {
        id: parsed.id,
        name: parsed.name,
    })
}

fn parse_secret_id(body: &str, operation: &str) -> Result<String> {
    let parsed: SecretResponse = serde_json::from_str(body).map_err(|e| {
        Error::internal_json(e.to_string(), Some(format!("parse {} response", operation)))
    })?;

    if parsed.secret_id.is_empty() {
        return Err(Error::registry_request_failed(
            operation,
            None,
            "Response did not contain a SecretID",
        ));
    }
    Ok(parsed.secret_id)
}

/// Leader address from a `/v1/status/leader` body (a JSON string, empty while electing).
fn leader_from_body(body: &str) -> Option<String> {
    serde_json::from_str::<String>(body)
        .ok()
        .filter(|leader| !leader.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_request_names_policy_after_scope() {
        let body = policy_request(
            "service \"projects\" { policy = \"write\" }",
            "projects-api",
        );
        assert_eq!(body["Name"], "projects-api-policy");
        assert!(body["Rules"]
            .as_str()
            .unwrap()
            .contains("policy = \"write\""));
    }

    #[test]
    fn token_request_links_policy_by_name() {
        let body = token_request("api-gateway", "api-gateway-policy");
        assert_eq!(body["Policies"][0]["Name"], "api-gateway-policy");
        assert_eq!(body["Local"], false);
    }

    #[test]
    fn parse_policy_reads_id_and_name() {
        let record = parse_policy(
            r#"{"ID": "e359bd81-baca-903e-7e64-1ccd9fdc78f5", "Name": "projects-api-policy", "Rules": ""}"#,
        )
        .unwrap();
        assert_eq!(record.id, "e359bd81-baca-903e-7e64-1ccd9fdc78f5");
        assert_eq!(record.name, "projects-api-policy");
    }

    #[test]
    fn parse_policy_rejects_response_without_id() {
        let err = parse_policy(r#"{"Name": "x"}"#).unwrap_err();
        assert_eq!(err.code.as_str(), "registry.request_failed");
    }

    #[test]
    fn parse_secret_id_handles_invalid_json() {
        let err = parse_secret_id("<html>", "create token").unwrap_err();
        assert_eq!(err.code.as_str(), "internal.json_error");
    }

    #[test]
    fn leader_is_none_while_electing() {
        assert_eq!(leader_from_body("\"\""), None);
        assert_eq!(
            leader_from_body("\"172.18.0.2:8300\""),
            Some("172.18.0.2:8300".to_string())
        );
    }

    #[test]
    fn unreachable_registry_surfaces_as_error() {
        let client = ConsulClient::new(&RegistryConfig {
            address: "http://127.0.0.1:1".to_string(),
            request_timeout_secs: 2,
            ready_timeout_secs: 0,
        })
        .unwrap();

        let err = client
            .create_policy(
                "root",
                "node_prefix \"\" { policy = \"read\" }",
                "projects-api",
            )
            .unwrap_err();
        assert!(matches!(
            err.code.as_str(),
            "registry.unreachable" | "registry.request_failed"
        ));
    }

    #[test]
    fn empty_address_is_rejected() {
        let result = ConsulClient::new(&RegistryConfig {
            address: "  ".trim().to_string(),
            request_timeout_secs: 2,
            ready_timeout_secs: 0,
        });
        assert!(result.is_err());
    }
}
