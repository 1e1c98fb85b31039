use clap::{Parser, Subcommand};

use commands::GlobalArgs;

mod commands;
mod output;
mod tty;

use commands::{config, error, init, plan, run, service};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "nexus")]
#[command(version = VERSION)]
#[command(about = "Provision and start a local multi-service development environment")]
struct Cli {
    /// Solution root (defaults to the current directory; `~` is expanded)
    #[arg(long, global = true)]
    path: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Provision registry credentials, rewrite configs and start all services
    Run(run::RunArgs),
    /// Show the steps a run would execute, without executing them
    Plan(plan::PlanArgs),
    /// Create a new solution from the solution template
    Init(init::InitArgs),
    /// Manage the services declared in nexus.yaml
    Service(service::ServiceArgs),
    /// Manage global nexus configuration
    Config(config::ConfigArgs),
    /// List and explain error codes
    Error(error::ErrorArgs),
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    let global = GlobalArgs { path: cli.path };

    let (json_result, exit_code) = commands::run_json(cli.command, &global);
    let _ = output::print_json_result(json_result);

    std::process::ExitCode::from(exit_code_to_u8(exit_code))
}

fn exit_code_to_u8(code: i32) -> u8 {
    if code <= 0 {
        0
    } else if code >= 255 {
        255
    } else {
        code as u8
    }
}
