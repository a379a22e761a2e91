use std::env;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use directories_next::ProjectDirs;

pub const ENV_CONFIG_DIR: &str = "GRIDMAS_CONFIG_DIR";
pub const ENV_DATA_DIR: &str = "GRIDMAS_DATA_DIR";

const QUALIFIER: &str = "org";
const ORGANISATION: &str = "GRIDmas";
const APPLICATION: &str = "gridmas";

pub const CONFIG_FILE_NAME: &str = "gridmas.toml";

#[derive(Debug, Clone)]
pub struct AppPaths {
    config_dir: PathBuf,
    data_dir: PathBuf,
}

impl AppPaths {
    pub fn discover() -> Result<Self> {
        let project_dirs = ProjectDirs::from(QUALIFIER, ORGANISATION, APPLICATION);

        let config_dir = resolve_dir(
            ENV_CONFIG_DIR,
            project_dirs.as_ref().map(ProjectDirs::config_dir),
        )
        .context("failed to resolve gridmas config directory")?;
        let data_dir = resolve_dir(ENV_DATA_DIR, project_dirs.as_ref().map(ProjectDirs::data_dir))
            .context("failed to resolve gridmas data directory")?;

        Ok(Self {
            config_dir,
            data_dir,
        })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Config file used when `--config` is not given.
    pub fn default_config_file(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE_NAME)
    }

    /// User-installed pattern manifests, scanned after the configured directory.
    pub fn user_pattern_dir(&self) -> PathBuf {
        self.data_dir.join("patterns")
    }
}

#[cfg(test)]
impl AppPaths {
    pub fn from_raw(config_dir: PathBuf, data_dir: PathBuf) -> Self {
        Self {
            config_dir,
            data_dir,
        }
    }
}

fn resolve_dir(env_var: &str, default: Option<&Path>) -> Result<PathBuf> {
    if let Some(value) = env_override(env_var) {
        return Ok(value);
    }
    default
        .map(Path::to_path_buf)
        .ok_or_else(|| anyhow!("failed to determine user directories; set {env_var}"))
}

fn env_override(name: &str) -> Option<PathBuf> {
    match env::var_os(name) {
        Some(value) if !value.is_empty() => Some(PathBuf::from(value)),
        _ => None,
    }
}
