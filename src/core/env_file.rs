//! `.env` file handling for the compose tool.
//!
//! Assignments nexus manages are updated in place or appended; comments, blank
//! lines and unrelated assignments survive a rewrite unchanged.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::Result;
use crate::utils::io;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Line {
    Assignment {
        key: String,
        value: String,
        /// Original text, dropped once the value is changed.
        raw: Option<String>,
    },
    Other(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvFile {
    lines: Vec<Line>,
}

fn assignment_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\s*(?:export\s+)?([A-Za-z_][A-Za-z0-9_]*)\s*=(.*)$")
            .expect("env assignment pattern is valid")
    })
}

impl EnvFile {
    pub fn parse(content: &str) -> Self {
        let lines = content
            .lines()
            .map(|line| match assignment_pattern().captures(line) {
                Some(caps) => Line::Assignment {
                    key: caps[1].to_string(),
                    value: unquote(caps[2].trim()),
                    raw: Some(line.to_string()),
                },
                None => Line::Other(line.to_string()),
            })
            .collect();

        Self { lines }
    }

    /// Load from disk; a missing file is an empty env file.
    pub fn load(path: &Path) -> Result<Self> {
        Ok(io::read_optional(path, "read env file")?
            .map(|content| Self::parse(&content))
            .unwrap_or_default())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.lines.iter().rev().find_map(|line| match line {
            Line::Assignment { key: k, value, .. } if k == key => Some(value.as_str()),
            _ => None,
        })
    }

    /// Set `key`, replacing every existing assignment of it in place.
    pub fn set(&mut self, key: &str, value: &str) {
        let mut found = false;
        for line in &mut self.lines {
            if let Line::Assignment {
                key: k,
                value: v,
                raw,
            } = line
            {
                if k == key {
                    *v = value.to_string();
                    *raw = None;
                    found = true;
                }
            }
        }

        if !found {
            self.lines.push(Line::Assignment {
                key: key.to_string(),
                value: value.to_string(),
                raw: None,
            });
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            match line {
                Line::Assignment {
                    raw: Some(raw), ..
                } => out.push_str(raw),
                Line::Assignment { key, value, .. } => {
                    out.push_str(key);
                    out.push('=');
                    out.push_str(&quote(value));
                }
                Line::Other(raw) => out.push_str(raw),
            }
            out.push('\n');
        }
        out
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        io::write_file_atomic(path, &self.render(), "write env file")
    }
}

fn needs_quoting(value: &str) -> bool {
    value
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, '#' | '"' | '\'' | '$' | '\\'))
}

/// Single quotes are literal for compose; fall back to escaped double quotes.
fn quote(value: &str) -> String {
    if !needs_quoting(value) {
        value.to_string()
    } else if !value.contains('\'') {
        format!("'{}'", value)
    } else {
        format!(
            "\"{}\"",
            value.replace('\\', "\\\\").replace('"', "\\\"")
        )
    }
}

fn unquote(value: &str) -> String {
    if value.len() >= 2 {
        if let Some(inner) = value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')) {
            return inner.to_string();
        }
        if let Some(inner) = value.strip_prefix('"').and_then(|v| v.strip_suffix('"')) {
            return inner.replace("\\\"", "\"").replace("\\\\", "\\");
        }
    }
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn set_replaces_existing_and_appends_new_keys() {
        let mut env = EnvFile::parse("# generated\nNETWORK_NAME=old\nPOSTGRES_PASSWORD=secret\n");

        env.set("NETWORK_NAME", "consul_external");
        env.set("PROJECTS_API_TOKEN", "abc");

        assert_eq!(
            env.render(),
            "# generated\nNETWORK_NAME=consul_external\nPOSTGRES_PASSWORD=secret\nPROJECTS_API_TOKEN=abc\n"
        );
    }

    #[test]
    fn export_prefix_and_spacing_are_recognised() {
        let env = EnvFile::parse("export DEV_CERTS_PASSWORD = dev123\n");
        assert_eq!(env.get("DEV_CERTS_PASSWORD"), Some("dev123"));
        assert_eq!(env.render(), "export DEV_CERTS_PASSWORD = dev123\n");
    }

    #[test]
    fn values_with_special_characters_are_quoted() {
        let mut env = EnvFile::default();
        env.set("DEV_CERTS_PASSWORD", "p@ss word#1");
        env.set("QUOTED", r#"it's "x""#);
        env.set("PLAIN", "dev123");

        let rendered = env.render();
        assert_eq!(
            rendered,
            "DEV_CERTS_PASSWORD='p@ss word#1'\nQUOTED=\"it's \\\"x\\\"\"\nPLAIN=dev123\n"
        );

        let reparsed = EnvFile::parse(&rendered);
        assert_eq!(reparsed.get("DEV_CERTS_PASSWORD"), Some("p@ss word#1"));
        assert_eq!(reparsed.get("QUOTED"), Some(r#"it's "x""#));
        assert_eq!(reparsed.get("PLAIN"), Some("dev123"));
    }

    #[test]
    fn load_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let env = EnvFile::load(&dir.path().join(".env")).unwrap();
        assert_eq!(env, EnvFile::default());
        assert_eq!(env.render(), "");
    }

    #[test]
    fn save_then_load_keeps_comments() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".env");
        let mut env = EnvFile::parse("# keep me\n\nA=1\n");
        env.set("B", "2");
        env.save(&path).unwrap();

        let loaded = EnvFile::load(&path).unwrap();
        assert_eq!(loaded.render(), "# keep me\n\nA=1\nB=2\n");
        assert_eq!(loaded.get("B"), Some("2"));
    }
}
