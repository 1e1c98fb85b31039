use std::path::PathBuf;

use clap::{Args, Subcommand};
use serde::Serialize;

use nexus::defaults;
use nexus::log_status;
use nexus::naming::ServiceNames;
use nexus::paths;
use nexus::solution::{self, ComponentConfig, ServicePorts};
use nexus::templates::{TemplateKind, TemplateProvisioner};
use nexus::Error;

use super::{CmdResult, GlobalArgs};

#[derive(Args)]
pub struct ServiceArgs {
    #[command(subcommand)]
    command: ServiceCommand,
}

#[derive(Subcommand)]
enum ServiceCommand {
    /// Scaffold a service from the service template and declare it in nexus.yaml
    Add {
        /// Service name (any case; an "Api" suffix is normalized)
        name: String,
        #[arg(long)]
        http_port: u16,
        #[arg(long)]
        https_port: u16,
        #[arg(long)]
        db_port: Option<u16>,
    },
}

#[derive(Debug, Serialize)]
pub struct ServiceOutput {
    pub command: &'static str,
    pub names: ServiceNames,
    pub directory: PathBuf,
    pub db_host: String,
    pub db_name: String,
    pub service: ComponentConfig,
}

pub fn run(args: ServiceArgs, global: &GlobalArgs) -> CmdResult<ServiceOutput> {
    match args.command {
        ServiceCommand::Add {
            name,
            http_port,
            https_port,
            db_port,
        } => add(
            global,
            &name,
            ServicePorts {
                http: Some(http_port),
                https: Some(https_port),
                db: db_port,
            },
        ),
    }
}

fn add(global: &GlobalArgs, name: &str, ports: ServicePorts) -> CmdResult<ServiceOutput> {
    let root = paths::solution_root(global.path.as_deref())?;
    let mut solution = solution::load(&root)?;

    let names = ServiceNames::new(name);
    let service = ComponentConfig::for_new_service(&names, ports);
    solution.add_service(service.clone())?;

    let directory = names.service_root(&root);
    if directory.exists() {
        return Err(Error::service_already_declared(
            &names.kebab_api,
            format!("Service directory {} already exists", directory.display()),
        ));
    }

    let provisioner = TemplateProvisioner::new(defaults::load_defaults().templates)?;
    provisioner.provision(TemplateKind::Service, &directory)?;
    solution::save(&root, &solution)?;
    log_status!("service", "Added {} to {}", names.kebab_api, solution.name);

    Ok((
        ServiceOutput {
            command: "service.add",
            db_host: names.db_host(),
            db_name: names.db_name(&solution.name),
            names,
            directory,
            service,
        },
        0,
    ))
}
