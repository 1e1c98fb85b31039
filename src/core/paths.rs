use crate::error::{Error, Result};
use std::env;
use std::path::{Path, PathBuf};

/// Solution description file name, relative to the solution root.
pub const SOLUTION_FILE: &str = "nexus.yaml";

/// Environment file consumed by the compose tool, relative to the solution root.
pub const ENV_FILE: &str = ".env";

/// Base nexus config directory (~/.config/nexus/ on all platforms)
pub fn nexus() -> Result<PathBuf> {
    #[cfg(windows)]
    {
        let appdata = env::var("APPDATA").map_err(|_| {
            Error::internal_unexpected(
                "APPDATA environment variable not set on Windows".to_string(),
            )
        })?;
        Ok(PathBuf::from(appdata).join("nexus"))
    }

    #[cfg(not(windows))]
    {
        let home = env::var("HOME").map_err(|_| {
            Error::internal_unexpected(
                "HOME environment variable not set on Unix-like system".to_string(),
            )
        })?;
        Ok(PathBuf::from(home).join(".config").join("nexus"))
    }
}

/// Global nexus.json config file path
pub fn nexus_json() -> Result<PathBuf> {
    Ok(nexus()?.join("nexus.json"))
}

/// Scratch directory for template downloads. Each download gets its own subdirectory.
pub fn template_scratch() -> PathBuf {
    env::temp_dir().join("nexus")
}

/// Resolve a user-supplied solution root (`~` expanded), defaulting to the working directory.
pub fn solution_root(path: Option<&str>) -> Result<PathBuf> {
    match path {
        Some(raw) if !raw.trim().is_empty() => {
            let expanded = shellexpand::tilde(raw.trim());
            Ok(PathBuf::from(expanded.as_ref()))
        }
        _ => env::current_dir().map_err(|e| {
            Error::internal_io(e.to_string(), Some("resolve working directory".to_string()))
        }),
    }
}

pub fn solution_file(root: &Path) -> PathBuf {
    root.join(SOLUTION_FILE)
}

pub fn env_file(root: &Path) -> PathBuf {
    root.join(ENV_FILE)
}
