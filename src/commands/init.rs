use std::fs;
use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use nexus::defaults;
use nexus::paths;
use nexus::solution::{self, Solution};
use nexus::templates::{self, TemplateKind, TemplateProvisioner};
use nexus::Error;

use super::{CmdResult, GlobalArgs};

/// Directory that receives the shared libraries, relative to the solution root.
const LIBRARIES_DIR: &str = "libraries";

#[derive(Args)]
pub struct InitArgs {
    /// Solution name; also the directory created under --path
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct InitOutput {
    pub command: &'static str,
    pub solution: String,
    pub root: PathBuf,
    pub solution_file: PathBuf,
    pub next_steps: Vec<String>,
}

pub fn run(args: InitArgs, global: &GlobalArgs) -> CmdResult<InitOutput> {
    let name = args.name.trim();
    if name.is_empty() || name.contains(['/', '\\']) {
        return Err(Error::validation_invalid_argument(
            "name",
            "Solution name must be a non-empty directory name",
            Some(args.name.clone()),
            None,
        ));
    }

    let root = paths::solution_root(global.path.as_deref())?.join(name);
    let occupied = fs::read_dir(&root)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false);
    if occupied {
        return Err(Error::validation_invalid_argument(
            "name",
            format!(
                "Directory {} already exists and is not empty",
                root.display()
            ),
            Some(name.to_string()),
            None,
        ));
    }

    let provisioner = TemplateProvisioner::new(defaults::load_defaults().templates)?;
    provisioner.provision(TemplateKind::Solution, &root)?;
    let solution_file = templates::rename_solution_file(&root, name)?;
    provisioner.provision(TemplateKind::Libraries, &root.join(LIBRARIES_DIR))?;
    solution::save(&root, &Solution::starter(name))?;

    Ok((
        InitOutput {
            command: "init",
            solution: name.to_string(),
            next_steps: vec![
                format!("nexus service add <name> --path {}", root.display()),
                format!("nexus run local --path {}", root.display()),
            ],
            root,
            solution_file,
        },
        0,
    ))
}
