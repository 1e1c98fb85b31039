use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Where the provisioned services will run. Fixed for the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    Local,
    Containerized,
}

impl RunMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::Local => "local",
            RunMode::Containerized => "containerized",
        }
    }
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of the most recent applicable step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRecord {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceToken {
    pub service: String,
    pub token: String,
}

/// State threaded through every step of a single run.
///
/// Tokens and policy records are append-only. `last_outcome` is owned by the
/// executor and cannot be written from step code.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    run_mode: RunMode,
    global_token: Option<String>,
    service_tokens: Vec<ServiceToken>,
    policy_records: Vec<PolicyRecord>,
    last_outcome: StepStatus,
}

impl ExecutionContext {
    pub fn new(run_mode: RunMode) -> Self {
        Self {
            run_mode,
            global_token: None,
            service_tokens: Vec::new(),
            policy_records: Vec::new(),
            last_outcome: StepStatus::Pending,
        }
    }

    pub fn run_mode(&self) -> RunMode {
        self.run_mode
    }

    pub fn global_token(&self) -> Option<&str> {
        self.global_token.as_deref()
    }

    /// Global token, or an error naming the step that should have produced it.
    pub fn require_global_token(&self) -> Result<&str> {
        self.global_token().ok_or_else(|| {
            Error::resource_missing("global registry token", "execution context")
                .with_hint("The discovery-server step must complete before registry provisioning")
        })
    }

    /// Records the run's global credential. Write-once.
    pub fn set_global_token(&mut self, token: impl Into<String>) -> Result<()> {
        if self.global_token.is_some() {
            return Err(Error::context_token_already_set("global"));
        }
        self.global_token = Some(token.into());
        Ok(())
    }

    pub fn service_tokens(&self) -> &[ServiceToken] {
        &self.service_tokens
    }

    pub fn service_token(&self, service: &str) -> Option<&str> {
        self.service_tokens
            .iter()
            .find(|entry| entry.service == service)
            .map(|entry| entry.token.as_str())
    }

    /// Appends the token issued for `service`. A service can only be issued one token per run.
    pub fn record_service_token(
        &mut self,
        service: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<()> {
        let service = service.into();
        if self.service_token(&service).is_some() {
            return Err(Error::context_token_already_set(service));
        }
        self.service_tokens.push(ServiceToken {
            service,
            token: token.into(),
        });
        Ok(())
    }

    pub fn policy_records(&self) -> &[PolicyRecord] {
        &self.policy_records
    }

    pub fn record_policy(&mut self, record: PolicyRecord) {
        self.policy_records.push(record);
    }

    pub fn last_outcome(&self) -> StepStatus {
        self.last_outcome
    }

    pub(super) fn set_last_outcome(&mut self, status: StepStatus) {
        self.last_outcome = status;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_context_is_pending_and_empty() {
        let ctx = ExecutionContext::new(RunMode::Local);
        assert_eq!(ctx.run_mode(), RunMode::Local);
        assert_eq!(ctx.last_outcome(), StepStatus::Pending);
        assert!(ctx.global_token().is_none());
        assert!(ctx.service_tokens().is_empty());
        assert!(ctx.policy_records().is_empty());
    }

    #[test]
    fn global_token_is_write_once() {
        let mut ctx = ExecutionContext::new(RunMode::Local);
        ctx.set_global_token("root-secret").unwrap();

        let err = ctx.set_global_token("other").unwrap_err();
        assert_eq!(err.code.as_str(), "context.token_already_set");
        assert_eq!(ctx.global_token(), Some("root-secret"));
    }

    #[test]
    fn require_global_token_fails_before_bootstrap() {
        let ctx = ExecutionContext::new(RunMode::Containerized);
        let err = ctx.require_global_token().unwrap_err();
        assert_eq!(err.code.as_str(), "resource.missing");
    }

    #[test]
    fn service_tokens_keep_insertion_order_and_reject_reissue() {
        let mut ctx = ExecutionContext::new(RunMode::Local);
        ctx.record_service_token("projects", "t-1").unwrap();
        ctx.record_service_token("billing", "t-2").unwrap();

        assert!(ctx.record_service_token("projects", "t-3").is_err());

        let names: Vec<&str> = ctx
            .service_tokens()
            .iter()
            .map(|entry| entry.service.as_str())
            .collect();
        assert_eq!(names, vec!["projects", "billing"]);
        assert_eq!(ctx.service_token("projects"), Some("t-1"));
    }

    #[test]
    fn policy_records_append_in_creation_order() {
        let mut ctx = ExecutionContext::new(RunMode::Local);
        ctx.record_policy(PolicyRecord {
            id: "a1".to_string(),
            name: "api-gateway-policy".to_string(),
        });
        ctx.record_policy(PolicyRecord {
            id: "b2".to_string(),
            name: "projects-api-policy".to_string(),
        });

        assert_eq!(ctx.policy_records()[0].id, "a1");
        assert_eq!(ctx.policy_records()[1].name, "projects-api-policy");
    }
}
