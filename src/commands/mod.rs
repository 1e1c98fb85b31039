use clap::ValueEnum;

use nexus::pipeline::RunMode;

pub type CmdResult<T> = nexus::Result<(T, i32)>;

pub(crate) struct GlobalArgs {
    /// Solution root; `None` means the working directory.
    pub path: Option<String>,
}

/// Run mode as accepted on the command line.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ModeArg {
    /// Services run as local processes; infrastructure runs in containers
    Local,
    /// Everything runs in containers
    Containerized,
}

impl From<ModeArg> for RunMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Local => RunMode::Local,
            ModeArg::Containerized => RunMode::Containerized,
        }
    }
}

pub mod config;
pub mod error;
pub mod init;
pub mod plan;
pub mod run;
pub mod service;

/// Dispatch a command to its handler and map result to JSON.
macro_rules! dispatch {
    ($args:expr, $module:ident) => {
        crate::output::map_cmd_result_to_json($module::run_json($args))
    };
    ($args:expr, $global:expr, $module:ident) => {
        crate::output::map_cmd_result_to_json($module::run($args, $global))
    };
}

pub(crate) fn run_json(
    command: crate::Commands,
    global: &GlobalArgs,
) -> (nexus::Result<serde_json::Value>, i32) {
    crate::tty::status("nexus is working...");

    match command {
        crate::Commands::Config(args) => dispatch!(args, config),
        crate::Commands::Error(args) => dispatch!(args, error),
        crate::Commands::Run(args) => dispatch!(args, global, run),
        crate::Commands::Plan(args) => dispatch!(args, global, plan),
        crate::Commands::Init(args) => dispatch!(args, global, init),
        crate::Commands::Service(args) => dispatch!(args, global, service),
    }
}
