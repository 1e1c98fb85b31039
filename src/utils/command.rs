//! Command execution primitives with consistent error handling.

use std::path::Path;
use std::process::Command;

use serde::Serialize;

use crate::error::{Error, Result, ToolCommandFailedDetails};

/// Captured output from an external process.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CommandOutput {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub stdout: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub stderr: String,
    pub success: bool,
    pub exit_code: i32,
}

/// Run a program in `dir`, capturing output.
///
/// Only a failure to spawn is an error; a non-zero exit is reported through
/// `CommandOutput::success`.
pub fn run_captured(program: &str, args: &[String], dir: &Path) -> Result<CommandOutput> {
    let output = Command::new(program)
        .args(args)
        .current_dir(dir)
        .output()
        .map_err(|e| {
            Error::internal_io(
                format!("Failed to run {}: {}", program, e),
                Some(display_command(program, args)),
            )
        })?;

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        success: output.status.success(),
        exit_code: output.status.code().unwrap_or(-1),
    })
}

/// Require a captured command to have succeeded.
pub fn require_success(
    output: CommandOutput,
    program: &str,
    args: &[String],
) -> Result<CommandOutput> {
    if output.success {
        return Ok(output);
    }

    Err(Error::tool_command_failed(ToolCommandFailedDetails {
        command: display_command(program, args),
        exit_code: output.exit_code,
        stdout: output.stdout,
        stderr: output.stderr,
    }))
}

pub fn display_command(program: &str, args: &[String]) -> String {
    if args.is_empty() {
        program.to_string()
    } else {
        format!("{} {}", program, args.join(" "))
    }
}
