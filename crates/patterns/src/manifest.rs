//! On-disk pattern variants. A manifest names a built-in pattern kind and
//! overrides some of its parameters, which lets a tree owner ship tuned
//! variants ("slow-spin", "red-twinkle") without writing code.
//!
//! Types:
//!
//! - `PatternManifest` mirrors one `*.toml` file: `name`, optional `author`
//!   and `description`, the `pattern` kind it builds on and a `[params]` table.
//! - `ManifestError` classifies read, parse and validation failures so the
//!   library can report them per file without aborting discovery.
//!
//! Functions:
//!
//! - `PatternManifest::load` reads, parses and validates one file.
//! - `PatternManifest::validate` returns human-readable issues.
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::builtin;
use crate::params::PatternParams;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse manifest {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("manifest {path} is invalid: {issues:?}")]
    Validation { path: PathBuf, issues: Vec<String> },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatternManifest {
    pub name: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub pattern: String,
    #[serde(default)]
    pub params: PatternParams,
}

impl PatternManifest {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let manifest: Self = toml::from_str(&raw).map_err(|source| ManifestError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        let issues = manifest.validate();
        if !issues.is_empty() {
            return Err(ManifestError::Validation {
                path: path.to_path_buf(),
                issues,
            });
        }
        Ok(manifest)
    }

    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.name.trim().is_empty() {
            issues.push("name must not be empty".to_string());
        }
        if self
            .name
            .chars()
            .any(|c| c.is_whitespace() || c.is_control())
        {
            issues.push(format!(
                "name '{}' must not contain whitespace or control characters",
                self.name.escape_debug()
            ));
        }
        if builtin::lookup(&self.pattern).is_none() {
            issues.push(format!(
                "pattern '{}' is not a built-in kind (expected one of: {})",
                self.pattern,
                builtin::kinds().collect::<Vec<_>>().join(", ")
            ));
        }
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_a_variant() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slow-spin.toml");
        fs::write(
            &path,
            r##"
name = "slow-spin"
author = "elf"
pattern = "spin"

[params]
speed = 0.05
color1 = "#400000"
"##,
        )
        .unwrap();
        let manifest = PatternManifest::load(&path).unwrap();
        assert_eq!(manifest.name, "slow-spin");
        assert_eq!(manifest.author.as_deref(), Some("elf"));
        assert_eq!(manifest.params.number("speed", 0.3), 0.05);
    }

    #[test]
    fn reports_unknown_kinds_and_bad_names() {
        let manifest = PatternManifest {
            name: "two words".into(),
            author: None,
            description: None,
            pattern: "fireworks".into(),
            params: PatternParams::new(),
        };
        let issues = manifest.validate();
        assert_eq!(issues.len(), 2);
        assert!(issues[1].contains("fireworks"));
    }

    #[test]
    fn parse_errors_name_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "name = ").unwrap();
        let err = PatternManifest::load(&path).unwrap_err();
        assert!(matches!(err, ManifestError::Parse { .. }));
        assert!(err.to_string().contains("broken.toml"));
    }
}
