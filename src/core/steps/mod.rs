//! Concrete provisioning steps assembled by the pipeline builder.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::defaults::{Defaults, ServiceEndpoints};
use crate::pipeline::RunMode;
use crate::registry::RegistryClient;
use crate::tools::ToolRunner;

mod compose;
mod dev_certs;
mod discovery;
mod environment;
mod network;
mod registry_component;

pub use compose::ComposeUpStep;
pub use dev_certs::DevCertsStep;
pub use discovery::DiscoveryServerStep;
pub use environment::{EnvironmentUpdateStep, GLOBAL_TOKEN_KEY};
pub use network::InitializeNetworkStep;
pub use registry_component::{ComponentKind, RegistryComponentStep};

/// Solution root plus the tool defaults every step reads from.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub root: PathBuf,
    pub defaults: Defaults,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>, defaults: Defaults) -> Self {
        Self {
            root: root.into(),
            defaults,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path relative to the solution root.
    pub fn resolve(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    pub fn endpoints(&self, mode: RunMode) -> &ServiceEndpoints {
        self.defaults.endpoints.for_mode(mode)
    }

    pub fn compose_files(&self, mode: RunMode) -> &[String] {
        self.defaults.compose.files_for_mode(mode)
    }
}

/// External collaborators injected into steps at construction time.
#[derive(Clone)]
pub struct Collaborators {
    pub registry: Arc<dyn RegistryClient>,
    pub tools: Arc<dyn ToolRunner>,
}

impl Collaborators {
    pub fn new(registry: Arc<dyn RegistryClient>, tools: Arc<dyn ToolRunner>) -> Self {
        Self { registry, tools }
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

/// Hand-written doubles shared by the step tests.
#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;
    use std::path::Path;
    use std::sync::Arc;

    use super::{Collaborators, Workspace};
    use crate::defaults::Defaults;
    use crate::error::{Error, Result};
    use crate::pipeline::PolicyRecord;
    use crate::registry::{policy_name, RegistryClient};
    use crate::tools::ToolRunner;
    use crate::utils::command::CommandOutput;

    #[derive(Default)]
    pub struct FakeRegistry {
        pub calls: RefCell<Vec<String>>,
        pub uploads: RefCell<Vec<(String, String)>>,
        pub fail_policy_for: Option<String>,
    }

    impl RegistryClient for FakeRegistry {
        fn wait_until_ready(&self) -> Result<()> {
            self.calls.borrow_mut().push("wait".to_string());
            Ok(())
        }

        fn bootstrap_acl(&self) -> Result<String> {
            self.calls.borrow_mut().push("bootstrap".to_string());
            Ok("root-token".to_string())
        }

        fn create_policy(
            &self,
            credential: &str,
            _rules: &str,
            scope: &str,
        ) -> Result<PolicyRecord> {
            self.calls
                .borrow_mut()
                .push(format!("policy:{}:{}", scope, credential));
            if self.fail_policy_for.as_deref() == Some(scope) {
                return Err(Error::registry_unreachable(
                    "http://localhost:8500",
                    "connection refused",
                ));
            }
            Ok(PolicyRecord {
                id: format!("{}-id", scope),
                name: policy_name(scope),
            })
        }

        fn create_token(
            &self,
            _credential: &str,
            scope: &str,
            policy_name: &str,
        ) -> Result<String> {
            self.calls
                .borrow_mut()
                .push(format!("token:{}:{}", scope, policy_name));
            Ok(format!("{}-token", scope))
        }

        fn put_key_value(&self, scope: &str, payload: &str, _credential: &str) -> Result<()> {
            self.calls.borrow_mut().push(format!("kv:{}", scope));
            self.uploads
                .borrow_mut()
                .push((scope.to_string(), payload.to_string()));
            Ok(())
        }
    }

    /// Records every invocation; programs listed in `failing` exit non-zero.
    #[derive(Default)]
    pub struct FakeTools {
        pub calls: RefCell<Vec<String>>,
        pub failing: Vec<String>,
    }

    impl ToolRunner for FakeTools {
        fn run(&self, program: &str, args: &[String], _dir: &Path) -> Result<CommandOutput> {
            let line = format!("{} {}", program, args.join(" "));
            let success = !self.failing.iter().any(|f| line.starts_with(f.as_str()));
            self.calls.borrow_mut().push(line);
            Ok(CommandOutput {
                success,
                exit_code: if success { 0 } else { 1 },
                ..Default::default()
            })
        }
    }

    pub fn workspace(root: &Path) -> Arc<Workspace> {
        Arc::new(Workspace::new(root, Defaults::default()))
    }

    pub fn collaborators(registry: Arc<FakeRegistry>, tools: Arc<FakeTools>) -> Collaborators {
        Collaborators::new(registry, tools)
    }
}
