use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use patterns::PatternLibrary;
use tracing::{debug, info};
use treeconfig::TreeConfig;

use crate::cli::RunArgs;
use crate::paths::AppPaths;

/// Effective settings after layering defaults, the config file and flags.
#[derive(Debug, Clone)]
pub struct Settings {
    pub config: TreeConfig,
    pub config_path: Option<PathBuf>,
    pub frame_limit: Option<u64>,
    pub console: bool,
}

pub fn resolve_settings(args: &RunArgs, paths: &AppPaths) -> Result<Settings> {
    let config_path = match &args.config {
        Some(path) => Some(path.clone()),
        None => {
            let candidate = paths.default_config_file();
            candidate.is_file().then_some(candidate)
        }
    };

    let mut config = match &config_path {
        Some(path) => {
            let mut config = TreeConfig::load(path)
                .with_context(|| format!("failed to load config {}", path.display()))?;
            anchor_paths(&mut config, path);
            info!(path = %path.display(), "loaded configuration");
            config
        }
        None => {
            debug!("no configuration file; using defaults");
            TreeConfig::default()
        }
    };

    apply_overrides(&mut config, args);
    config.validate().context("invalid settings")?;

    Ok(Settings {
        config,
        config_path,
        frame_limit: args.frames,
        console: !args.no_console,
    })
}

/// Relative paths inside a config file are taken relative to that file.
fn anchor_paths(config: &mut TreeConfig, config_path: &Path) {
    let Some(base) = config_path.parent() else {
        return;
    };
    anchor(&mut config.tree.file, base);
    anchor(&mut config.patterns.directory, base);
    if let Some(dump) = config.output.dump.as_mut() {
        anchor(dump, base);
    }
}

fn anchor(path: &mut PathBuf, base: &Path) {
    if path.is_relative() {
        *path = base.join(&*path);
    }
}

fn apply_overrides(config: &mut TreeConfig, args: &RunArgs) {
    if let Some(file) = &args.tree_file {
        config.tree.file = file.clone();
    }
    if let Some(dir) = &args.pattern_dir {
        config.patterns.directory = dir.clone();
    }
    if let Some(name) = &args.start {
        config.patterns.default = Some(name.clone());
    }
    if let Some(rate) = args.fps {
        config.pipeline.frame_rate = rate;
    }
    if let Some(capacity) = args.queue_capacity {
        config.pipeline.queue_capacity = capacity;
    }
    if let Some(kind) = args.output {
        config.output.kind = kind;
    }
    if let Some(fps) = args.output_fps {
        config.output.fps = fps;
    }
    if let Some(dump) = &args.dump {
        config.output.dump = Some(dump.clone());
    }
}

/// Built-ins first, then the configured manifest directory, then the user's.
pub fn build_library(config: &TreeConfig, paths: &AppPaths) -> PatternLibrary {
    let mut library = PatternLibrary::builtin();
    library.discover(&config.patterns.directory);

    let user_dir = paths.user_pattern_dir();
    if user_dir != config.patterns.directory && user_dir.is_dir() {
        library.discover(&user_dir);
    }
    library
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;
    use treeconfig::OutputKind;

    fn paths(root: &TempDir) -> AppPaths {
        AppPaths::from_raw(root.path().join("config"), root.path().join("data"))
    }

    #[test]
    fn defaults_apply_without_a_config_file() {
        let root = TempDir::new().unwrap();
        let settings = resolve_settings(&RunArgs::default(), &paths(&root)).unwrap();
        assert!(settings.config_path.is_none());
        assert_eq!(settings.config.tree.file, PathBuf::from("tree.csv"));
        assert!(settings.console);
        assert_eq!(settings.frame_limit, None);
    }

    #[test]
    fn flags_override_the_config_file() {
        let root = TempDir::new().unwrap();
        let paths = paths(&root);
        fs::create_dir_all(paths.config_dir()).unwrap();
        fs::write(
            paths.default_config_file(),
            "version = 1\n[tree]\nfile = \"lights.csv\"\n[patterns]\ndefault = \"spin\"\n[pipeline]\nqueue_capacity = 4\n",
        )
        .unwrap();

        let args = RunArgs {
            start: Some("twinkle".into()),
            output: Some(OutputKind::Jsonl),
            output_fps: Some(0.0),
            frames: Some(10),
            no_console: true,
            ..RunArgs::default()
        };
        let settings = resolve_settings(&args, &paths).unwrap();

        assert_eq!(settings.config_path, Some(paths.default_config_file()));
        assert_eq!(
            settings.config.tree.file,
            paths.config_dir().join("lights.csv")
        );
        assert_eq!(settings.config.patterns.default.as_deref(), Some("twinkle"));
        assert_eq!(settings.config.pipeline.queue_capacity, 4);
        assert_eq!(settings.config.output.kind, OutputKind::Jsonl);
        assert_eq!(settings.config.output_fps(), None);
        assert_eq!(settings.frame_limit, Some(10));
        assert!(!settings.console);
    }

    #[test]
    fn inconsistent_overrides_are_rejected() {
        let root = TempDir::new().unwrap();
        let args = RunArgs {
            dump: Some(PathBuf::from("frames.jsonl")),
            ..RunArgs::default()
        };
        let err = resolve_settings(&args, &paths(&root)).unwrap_err();
        assert!(format!("{err:#}").contains("output.dump"));
    }

    #[test]
    fn explicit_config_must_exist() {
        let root = TempDir::new().unwrap();
        let args = RunArgs {
            config: Some(root.path().join("missing.toml")),
            ..RunArgs::default()
        };
        assert!(resolve_settings(&args, &paths(&root)).is_err());
    }

    #[test]
    fn library_merges_both_manifest_directories() {
        let root = TempDir::new().unwrap();
        let paths = paths(&root);
        let shipped = root.path().join("shipped");
        fs::create_dir_all(&shipped).unwrap();
        fs::create_dir_all(paths.user_pattern_dir()).unwrap();
        fs::write(
            shipped.join("ember.toml"),
            "name = \"ember\"\npattern = \"solid\"\n[params]\ncolor = \"#ff4000\"\n",
        )
        .unwrap();
        fs::write(
            paths.user_pattern_dir().join("frost.toml"),
            "name = \"frost\"\npattern = \"twinkle\"\n",
        )
        .unwrap();

        let mut config = TreeConfig::default();
        config.patterns.directory = shipped;
        let library = build_library(&config, &paths);
        assert!(library.contains("ember"));
        assert!(library.contains("frost"));
        assert!(library.contains("spin"));
    }
}
