use clap::{Args, Subcommand};
use serde::Serialize;

use nexus::error::codes::{all_codes, parse_code};
use nexus::{Error, ErrorCode};

use super::CmdResult;
use crate::output::exit_code_for_error;

#[derive(Args)]
pub struct ErrorArgs {
    #[command(subcommand)]
    command: ErrorCommand,
}

#[derive(Subcommand)]
enum ErrorCommand {
    /// List error codes and the exit code each maps to
    Codes,
    /// Explain an error code
    Explain {
        /// Error code (example: `registry.unreachable`)
        code: String,
    },
}

#[derive(Debug, Serialize)]
pub struct ErrorCodeInfo {
    code: &'static str,
    exit_code: i32,
}

impl From<ErrorCode> for ErrorCodeInfo {
    fn from(code: ErrorCode) -> Self {
        Self {
            code: code.as_str(),
            exit_code: exit_code_for_error(code),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorOutput {
    command: String,
    codes: Vec<ErrorCodeInfo>,
}

pub fn run_json(args: ErrorArgs) -> CmdResult<ErrorOutput> {
    match args.command {
        ErrorCommand::Codes => Ok((
            ErrorOutput {
                command: "error.codes".to_string(),
                codes: all_codes()
                    .iter()
                    .copied()
                    .map(ErrorCodeInfo::from)
                    .collect(),
            },
            0,
        )),
        ErrorCommand::Explain { code } => {
            let Some(parsed) = parse_code(&code) else {
                return Err(Error::validation_invalid_argument(
                    "code",
                    format!("Unknown error code '{}'", code),
                    Some(code),
                    Some(
                        all_codes()
                            .iter()
                            .map(|c| c.as_str().to_string())
                            .collect(),
                    ),
                ));
            };

            Ok((
                ErrorOutput {
                    command: "error.explain".to_string(),
                    codes: vec![ErrorCodeInfo::from(parsed)],
                },
                0,
            ))
        }
    }
}
