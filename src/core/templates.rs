//! Template provisioning from GitHub source archives.
//!
//! Each download is extracted into its own uuid-named scratch directory, which is
//! removed whether or not the copy succeeds.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::blocking::Client;
use uuid::Uuid;
use zip::ZipArchive;

use crate::defaults::TemplatesConfig;
use crate::error::{Error, Result};
use crate::paths;
use crate::utils::io;

/// Solution file shipped in the solution template, renamed on `init`.
pub const TEMPLATE_SOLUTION_FILE: &str = "nexus.sln";

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    Solution,
    Service,
    Libraries,
}

impl TemplateKind {
    pub fn label(&self) -> &'static str {
        match self {
            TemplateKind::Solution => "solution template",
            TemplateKind::Service => "service template",
            TemplateKind::Libraries => "libraries",
        }
    }

    fn url<'a>(&self, config: &'a TemplatesConfig) -> &'a str {
        match self {
            TemplateKind::Solution => &config.solution_url,
            TemplateKind::Service => &config.service_url,
            TemplateKind::Libraries => &config.libraries_url,
        }
    }

    /// Directory inside the archive root that holds the template.
    fn subtree(&self) -> Option<&'static str> {
        match self {
            TemplateKind::Service => Some("ServiceTemplate"),
            TemplateKind::Solution | TemplateKind::Libraries => None,
        }
    }
}

pub struct TemplateProvisioner {
    client: Client,
    config: TemplatesConfig,
    scratch: PathBuf,
}

impl TemplateProvisioner {
    pub fn new(config: TemplatesConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("nexus/", env!("CARGO_PKG_VERSION")))
            .timeout(DOWNLOAD_TIMEOUT)
            .build()
            .map_err(|e| {
                Error::internal_unexpected(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            config,
            scratch: paths::template_scratch(),
        })
    }

    /// Download the archive for `kind` and copy its template into `destination`.
    pub fn provision(&self, kind: TemplateKind, destination: &Path) -> Result<()> {
        let url = kind.url(&self.config);
        log_status!("templates", "Downloading {}", kind.label());
        let archive = self.download(url)?;

        log_status!("templates", "Extracting {}", kind.label());
        install_archive(&archive, kind, destination, &self.scratch)
    }

    fn download(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| Error::template_download_failed(url, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::template_download_failed(url, format!("HTTP {}", status)));
        }

        response
            .bytes()
            .map(|bytes| bytes.to_vec())
            .map_err(|e| Error::template_download_failed(url, e.to_string()))
    }
}

/// Extract `archive` into a fresh scratch directory under `scratch_root` and copy
/// the template subtree into `destination`. The scratch directory is always removed.
pub fn install_archive(
    archive: &[u8],
    kind: TemplateKind,
    destination: &Path,
    scratch_root: &Path,
) -> Result<()> {
    let scratch = scratch_root.join(Uuid::new_v4().to_string());
    let result = extract_and_copy(archive, kind, destination, &scratch);

    if scratch.exists() {
        if let Err(e) = fs::remove_dir_all(&scratch) {
            log_status!(
                "templates",
                "Could not remove {}: {}",
                scratch.display(),
                e
            );
        }
    }

    result
}

fn extract_and_copy(
    archive: &[u8],
    kind: TemplateKind,
    destination: &Path,
    scratch: &Path,
) -> Result<()> {
    let extract_dir = scratch.join("template");
    io::ensure_dir(&extract_dir, "create template scratch directory")?;

    let mut zip = ZipArchive::new(Cursor::new(archive)).map_err(|e| {
        Error::internal_io(
            e.to_string(),
            Some(format!("open {} archive", kind.label())),
        )
    })?;
    zip.extract(&extract_dir).map_err(|e| {
        Error::internal_io(e.to_string(), Some(format!("extract {}", kind.label())))
    })?;

    let root = single_root_dir(&extract_dir)?;
    let source = match kind.subtree() {
        Some(subtree) => root.join(subtree),
        None => root,
    };
    if !source.is_dir() {
        return Err(Error::resource_missing(kind.label(), source.display().to_string()));
    }

    io::copy_dir_recursive(&source, destination)
}

/// GitHub archives wrap everything in one `<repo>-<branch>/` directory; unwrap it.
fn single_root_dir(dir: &Path) -> Result<PathBuf> {
    let entries: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|e| Error::internal_io(e.to_string(), Some(format!("read {}", dir.display()))))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .collect();

    match entries.as_slice() {
        [only] if only.is_dir() => Ok(only.clone()),
        _ => Ok(dir.to_path_buf()),
    }
}

/// Rename the template's `nexus.sln` to `<solution_name>.sln`.
pub fn rename_solution_file(root: &Path, solution_name: &str) -> Result<PathBuf> {
    let source = root.join(TEMPLATE_SOLUTION_FILE);
    if !source.is_file() {
        return Err(Error::resource_missing("solution file", source.display().to_string()));
    }

    let target = root.join(format!("{}.sln", solution_name));
    fs::rename(&source, &target).map_err(|e| {
        Error::internal_io(e.to_string(), Some("rename solution file".to_string()))
    })?;
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::FileOptions;
    use zip::ZipWriter;

    fn archive(files: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in files {
            writer.start_file(*name, FileOptions::default()).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn solution_archive_is_unwrapped_into_destination() {
        let scratch = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let bytes = archive(&[
            ("nexus-master/nexus.sln", "sln"),
            ("nexus-master/docker-compose.yml", "services: {}"),
            (
                "nexus-master/framework/api-gateway/.consul/rules.hcl",
                "rules",
            ),
        ]);

        install_archive(&bytes, TemplateKind::Solution, dest.path(), scratch.path()).unwrap();

        assert!(dest.path().join("nexus.sln").is_file());
        assert_eq!(
            fs::read_to_string(dest.path().join("framework/api-gateway/.consul/rules.hcl"))
                .unwrap(),
            "rules"
        );
        assert_eq!(fs::read_dir(scratch.path()).unwrap().count(), 0);
    }

    #[test]
    fn service_archive_copies_only_service_template() {
        let scratch = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let bytes = archive(&[
            ("nexus-template-master/README.md", "readme"),
            (
                "nexus-template-master/ServiceTemplate/src/Program.cs",
                "class Program {}",
            ),
        ]);

        install_archive(&bytes, TemplateKind::Service, dest.path(), scratch.path()).unwrap();

        assert!(dest.path().join("src/Program.cs").is_file());
        assert!(!dest.path().join("README.md").exists());
    }

    #[test]
    fn missing_subtree_fails_and_cleans_scratch() {
        let scratch = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let bytes = archive(&[("nexus-template-master/README.md", "readme")]);

        let err = install_archive(&bytes, TemplateKind::Service, dest.path(), scratch.path())
            .unwrap_err();

        assert_eq!(err.code.as_str(), "resource.missing");
        assert_eq!(fs::read_dir(scratch.path()).unwrap().count(), 0);
    }

    #[test]
    fn corrupt_archive_is_an_error() {
        let scratch = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();

        let result = install_archive(
            b"not a zip",
            TemplateKind::Libraries,
            dest.path(),
            scratch.path(),
        );

        assert!(result.is_err());
    }

    #[test]
    fn rename_solution_file_uses_solution_name() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(TEMPLATE_SOLUTION_FILE), "sln").unwrap();

        let renamed = rename_solution_file(dir.path(), "AcmeCloud").unwrap();

        assert_eq!(renamed, dir.path().join("AcmeCloud.sln"));
        assert!(!dir.path().join(TEMPLATE_SOLUTION_FILE).exists());
    }
}
