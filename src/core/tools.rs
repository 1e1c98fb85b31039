//! External tool invocation (docker, docker compose, dotnet dev-certs).

use std::path::Path;

use crate::error::Result;
use crate::utils::command::{self, CommandOutput};

/// Runs an external program to completion. Implementations must block.
pub trait ToolRunner {
    /// Spawn `program` in `dir`. Only a spawn failure is an `Err`.
    fn run(&self, program: &str, args: &[String], dir: &Path) -> Result<CommandOutput>;

    /// Like [`ToolRunner::run`], but a non-zero exit is an error too.
    fn run_checked(&self, program: &str, args: &[String], dir: &Path) -> Result<CommandOutput> {
        let output = self.run(program, args, dir)?;
        command::require_success(output, program, args)
    }
}

/// Runs tools as local child processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl ToolRunner for ProcessRunner {
    fn run(&self, program: &str, args: &[String], dir: &Path) -> Result<CommandOutput> {
        log_status!("tool", "{}", command::display_command(program, args));
        command::run_captured(program, args, dir)
    }
}

/// Arguments for `docker compose -f <file>... <rest>`.
pub fn compose_args(files: &[String], env_file: Option<&str>, rest: &[&str]) -> Vec<String> {
    let mut args = vec!["compose".to_string()];
    for file in files {
        args.push("-f".to_string());
        args.push(file.clone());
    }
    if let Some(env_file) = env_file {
        args.push("--env-file".to_string());
        args.push(env_file.to_string());
    }
    args.extend(rest.iter().map(|s| s.to_string()));
    args
}
