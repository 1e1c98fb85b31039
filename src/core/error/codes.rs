use super::ErrorCode;

pub fn all_codes() -> &'static [ErrorCode] {
    &[
        ErrorCode::ConfigInvalidJson,
        ErrorCode::ConfigInvalidYaml,
        ErrorCode::ConfigInvalidValue,
        ErrorCode::ValidationInvalidArgument,
        ErrorCode::ValidationInvalidJson,
        ErrorCode::SolutionNotFound,
        ErrorCode::ServiceAlreadyDeclared,
        ErrorCode::ResourceMissing,
        ErrorCode::RegistryRequestFailed,
        ErrorCode::RegistryUnreachable,
        ErrorCode::ToolCommandFailed,
        ErrorCode::TemplateDownloadFailed,
        ErrorCode::ContextTokenAlreadySet,
        ErrorCode::InternalIoError,
        ErrorCode::InternalJsonError,
        ErrorCode::InternalUnexpected,
    ]
}

pub fn parse_code(code: &str) -> Option<ErrorCode> {
    all_codes()
        .iter()
        .copied()
        .find(|candidate| candidate.as_str() == code)
}
