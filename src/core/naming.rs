//! Name forms derived from a raw service name ("Projects", "projects-api", "ProjectsApi").

use std::path::{Path, PathBuf};

use heck::{ToKebabCase, ToPascalCase, ToShoutySnakeCase, ToSnakeCase};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceNames {
    pub raw: String,
    /// `projects`
    pub kebab: String,
    /// `projects-api`
    pub kebab_api: String,
    /// `projects_api`
    pub snake_api: String,
    /// `Projects.Api`
    pub pascal_dot_api: String,
    /// `ProjectsApi`
    pub root_namespace: String,
}

impl ServiceNames {
    pub fn new(raw: &str) -> Self {
        let kebab = strip_api_suffix(&raw.to_kebab_case());
        let pascal = kebab.to_pascal_case();

        Self {
            raw: raw.to_string(),
            kebab_api: format!("{}-api", kebab),
            snake_api: format!("{}_api", kebab.to_snake_case()),
            pascal_dot_api: format!("{}.Api", pascal),
            root_namespace: format!("{}Api", pascal),
            kebab,
        }
    }

    pub fn db_host(&self) -> String {
        format!("{}-db", self.kebab)
    }

    pub fn db_name(&self, solution_name: &str) -> String {
        format!("{}_{}", solution_name.to_snake_case(), self.kebab)
    }

    /// `<solution>/services/projects-api`
    pub fn service_root(&self, solution_root: &Path) -> PathBuf {
        solution_root.join("services").join(&self.kebab_api)
    }
}

/// Environment variable holding the registry token issued to `scope`.
pub fn token_env_key(scope: &str) -> String {
    format!("{}_TOKEN", scope.to_shouty_snake_case())
}

fn strip_api_suffix(kebab: &str) -> String {
    if kebab == "api" {
        return kebab.to_string();
    }
    kebab.strip_suffix("-api").unwrap_or(kebab).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_from_pascal_input() {
        let names = ServiceNames::new("ProjectsApi");
        assert_eq!(names.kebab, "projects");
        assert_eq!(names.kebab_api, "projects-api");
        assert_eq!(names.snake_api, "projects_api");
        assert_eq!(names.pascal_dot_api, "Projects.Api");
        assert_eq!(names.root_namespace, "ProjectsApi");
    }

    #[test]
    fn names_from_kebab_input_without_suffix() {
        let names = ServiceNames::new("order-history");
        assert_eq!(names.kebab_api, "order-history-api");
        assert_eq!(names.snake_api, "order_history_api");
        assert_eq!(names.pascal_dot_api, "OrderHistory.Api");
        assert_eq!(names.db_host(), "order-history-db");
    }

    #[test]
    fn db_name_prefixes_solution() {
        let names = ServiceNames::new("Projects");
        assert_eq!(names.db_name("AcmeCloud"), "acme_cloud_projects");
    }

    #[test]
    fn service_paths_live_under_services_dir() {
        let names = ServiceNames::new("projects-api");
        let root = Path::new("/work/acme");
        assert_eq!(
            names.service_root(root),
            PathBuf::from("/work/acme/services/projects-api")
        );
    }

    #[test]
    fn token_env_key_is_shouty() {
        assert_eq!(token_env_key("projects-api"), "PROJECTS_API_TOKEN");
        assert_eq!(
            token_env_key("health-checks-dashboard"),
            "HEALTH_CHECKS_DASHBOARD_TOKEN"
        );
    }
}
