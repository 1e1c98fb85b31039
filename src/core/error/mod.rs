use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod codes;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigInvalidJson,
    ConfigInvalidYaml,
    ConfigInvalidValue,

    ValidationInvalidArgument,
    ValidationInvalidJson,

    SolutionNotFound,
    ServiceAlreadyDeclared,

    ResourceMissing,

    RegistryRequestFailed,
    RegistryUnreachable,

    ToolCommandFailed,
    TemplateDownloadFailed,

    ContextTokenAlreadySet,

    InternalIoError,
    InternalJsonError,
    InternalUnexpected,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ConfigInvalidJson => "config.invalid_json",
            ErrorCode::ConfigInvalidYaml => "config.invalid_yaml",
            ErrorCode::ConfigInvalidValue => "config.invalid_value",

            ErrorCode::ValidationInvalidArgument => "validation.invalid_argument",
            ErrorCode::ValidationInvalidJson => "validation.invalid_json",

            ErrorCode::SolutionNotFound => "solution.not_found",
            ErrorCode::ServiceAlreadyDeclared => "solution.service_already_declared",

            ErrorCode::ResourceMissing => "resource.missing",

            ErrorCode::RegistryRequestFailed => "registry.request_failed",
            ErrorCode::RegistryUnreachable => "registry.unreachable",

            ErrorCode::ToolCommandFailed => "tool.command_failed",
            ErrorCode::TemplateDownloadFailed => "template.download_failed",

            ErrorCode::ContextTokenAlreadySet => "context.token_already_set",

            ErrorCode::InternalIoError => "internal.io_error",
            ErrorCode::InternalJsonError => "internal.json_error",
            ErrorCode::InternalUnexpected => "internal.unexpected",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hint {
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInvalidDocumentDetails {
    pub path: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInvalidValueDetails {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub problem: String,
}

#[derive(Debug, Clone)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    pub details: Value,
    pub hints: Vec<Hint>,
    pub retryable: Option<bool>,
}

pub type Result<T> = std::result::Result<T, Error>;

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidArgumentDetails {
    pub field: String,
    pub problem: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tried: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalIoErrorDetails {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalJsonErrorDetails {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceMissingDetails {
    pub resource: String,
    pub path: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryRequestFailedDetails {
    pub operation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub body: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCommandFailedDetails {
    pub command: String,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

fn to_details<T: Serialize>(details: T) -> Value {
    serde_json::to_value(details).unwrap_or_else(|_| Value::Object(serde_json::Map::new()))
}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>, details: Value) -> Self {
        Self {
            code,
            message: message.into(),
            details,
            hints: Vec::new(),
            retryable: None,
        }
    }

    pub fn validation_invalid_argument(
        field: impl Into<String>,
        problem: impl Into<String>,
        id: Option<String>,
        tried: Option<Vec<String>>,
    ) -> Self {
        let details = to_details(InvalidArgumentDetails {
            field: field.into(),
            problem: problem.into(),
            id,
            tried,
        });

        Self::new(
            ErrorCode::ValidationInvalidArgument,
            "Invalid argument",
            details,
        )
    }

    pub fn validation_invalid_json(err: serde_json::Error, context: Option<String>) -> Self {
        let details = serde_json::json!({
            "error": err.to_string(),
            "context": context,
        });

        Self::new(ErrorCode::ValidationInvalidJson, "Invalid JSON", details)
    }

    pub fn solution_not_found(path: impl Into<String>) -> Self {
        let path = path.into();
        Self::new(
            ErrorCode::SolutionNotFound,
            format!("No solution description found at {}", path),
            serde_json::json!({ "path": path }),
        )
        .with_hint("Run 'nexus init <name>' to create a solution, or pass --path")
    }

    pub fn service_already_declared(name: impl Into<String>, problem: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(
            ErrorCode::ServiceAlreadyDeclared,
            problem,
            serde_json::json!({ "service": name }),
        )
    }

    pub fn config_invalid_json(path: impl Into<String>, err: serde_json::Error) -> Self {
        let details = to_details(ConfigInvalidDocumentDetails {
            path: path.into(),
            error: err.to_string(),
        });

        Self::new(
            ErrorCode::ConfigInvalidJson,
            "Invalid JSON in configuration",
            details,
        )
    }

    pub fn config_invalid_yaml(path: impl Into<String>, err: serde_yml::Error) -> Self {
        let details = to_details(ConfigInvalidDocumentDetails {
            path: path.into(),
            error: err.to_string(),
        });

        Self::new(
            ErrorCode::ConfigInvalidYaml,
            "Invalid YAML in solution description",
            details,
        )
    }

    pub fn config_invalid_value(
        key: impl Into<String>,
        value: Option<String>,
        problem: impl Into<String>,
    ) -> Self {
        let details = to_details(ConfigInvalidValueDetails {
            key: key.into(),
            value,
            problem: problem.into(),
        });

        Self::new(
            ErrorCode::ConfigInvalidValue,
            "Invalid configuration value",
            details,
        )
    }

    pub fn resource_missing(resource: impl Into<String>, path: impl Into<String>) -> Self {
        let resource = resource.into();
        let path = path.into();
        Self::new(
            ErrorCode::ResourceMissing,
            format!("Required {} not found at {}", resource, path),
            to_details(ResourceMissingDetails { resource, path }),
        )
    }

    pub fn registry_request_failed(
        operation: impl Into<String>,
        status: Option<u16>,
        body: impl Into<String>,
    ) -> Self {
        let operation = operation.into();
        let message = match status {
            Some(code) => format!("Registry rejected {}: HTTP {}", operation, code),
            None => format!("Registry request failed: {}", operation),
        };

        Self::new(
            ErrorCode::RegistryRequestFailed,
            message,
            to_details(RegistryRequestFailedDetails {
                operation,
                status,
                body: body.into(),
            }),
        )
    }

    pub fn registry_unreachable(address: impl Into<String>, error: impl Into<String>) -> Self {
        let address = address.into();
        let mut err = Self::new(
            ErrorCode::RegistryUnreachable,
            format!("Service registry at {} is unreachable", address),
            serde_json::json!({ "address": address, "error": error.into() }),
        );
        err.retryable = Some(true);
        err.with_hint("Check that the discovery server container is running")
    }

    pub fn tool_command_failed(details: ToolCommandFailedDetails) -> Self {
        let message = format!("Command failed: {}", details.command);
        Self::new(ErrorCode::ToolCommandFailed, message, to_details(details))
    }

    pub fn template_download_failed(url: impl Into<String>, error: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::TemplateDownloadFailed,
            "Template download failed",
            serde_json::json!({ "url": url.into(), "error": error.into() }),
        )
    }

    pub fn context_token_already_set(key: impl Into<String>) -> Self {
        let key = key.into();
        Self::new(
            ErrorCode::ContextTokenAlreadySet,
            format!("Token for '{}' was already recorded in this run", key),
            serde_json::json!({ "key": key }),
        )
    }

    pub fn internal_io(error: impl Into<String>, context: Option<String>) -> Self {
        let details = to_details(InternalIoErrorDetails {
            error: error.into(),
            context,
        });

        Self::new(ErrorCode::InternalIoError, "IO error", details)
    }

    pub fn internal_json(error: impl Into<String>, context: Option<String>) -> Self {
        let details = to_details(InternalJsonErrorDetails {
            error: error.into(),
            context,
        });

        Self::new(ErrorCode::InternalJsonError, "JSON error", details)
    }

    pub fn internal_unexpected(error: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::InternalUnexpected,
            "Unexpected error",
            serde_json::json!({ "error": error.into() }),
        )
    }

    pub fn with_hint(mut self, message: impl Into<String>) -> Self {
        self.hints.push(Hint {
            message: message.into(),
        });
        self
    }

    /// Message plus the most specific detail string, for single-line reporting.
    pub fn summary(&self) -> String {
        let detail = self
            .details
            .get("error")
            .or_else(|| self.details.get("problem"))
            .or_else(|| self.details.get("stderr"))
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty());

        match detail {
            Some(detail) => format!("{}: {}", self.message, detail.trim()),
            None => self.message.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_missing_carries_path_in_details() {
        let err = Error::resource_missing("access rules", "/tmp/sln/consul/rules.hcl");
        assert_eq!(err.code.as_str(), "resource.missing");
        assert_eq!(err.details["path"], "/tmp/sln/consul/rules.hcl");
        assert!(err.message.contains("access rules"));
    }

    #[test]
    fn registry_unreachable_is_retryable_with_hint() {
        let err = Error::registry_unreachable("http://localhost:8500", "connection refused");
        assert_eq!(err.retryable, Some(true));
        assert_eq!(err.hints.len(), 1);
    }

    #[test]
    fn summary_prefers_error_detail() {
        let err = Error::internal_io("permission denied", Some("write .env".to_string()));
        assert_eq!(err.summary(), "IO error: permission denied");

        let bare = Error::context_token_already_set("global");
        assert_eq!(bare.summary(), bare.message);
    }
}
