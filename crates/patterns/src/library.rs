//! Name-keyed registry of runnable patterns.
//!
//! Types:
//!
//! - `PatternDescriptor` holds a pattern's name, metadata, the built-in kind
//!   it instantiates, its parameters and the factory that builds fresh
//!   [`Animation`]s on every load.
//! - `PatternLibrary` maps unique names to descriptors. It starts from the
//!   built-in catalog and grows by scanning a manifest directory.
//! - `DiscoveryReport` lists what a scan registered and which files were
//!   skipped, so callers can surface problems without failing startup.
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::builtin;
use crate::manifest::PatternManifest;
use crate::params::PatternParams;
use crate::Animation;

pub type PatternFactory = Arc<dyn Fn(&PatternParams) -> Animation + Send + Sync>;

#[derive(Clone)]
pub struct PatternDescriptor {
    name: String,
    author: Option<String>,
    description: Option<String>,
    kind: String,
    params: PatternParams,
    factory: PatternFactory,
}

impl PatternDescriptor {
    pub fn new(name: impl Into<String>, factory: PatternFactory) -> Self {
        let name = name.into();
        Self {
            kind: name.clone(),
            name,
            author: None,
            description: None,
            params: PatternParams::new(),
            factory,
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    pub fn with_params(mut self, params: PatternParams) -> Self {
        self.params = params;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn author(&self) -> Option<&str> {
        self.author.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn params(&self) -> &PatternParams {
        &self.params
    }

    /// Builds a fresh animation; every load starts from scratch.
    pub fn instantiate(&self) -> Animation {
        (self.factory)(&self.params)
    }
}

impl std::fmt::Debug for PatternDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatternDescriptor")
            .field("name", &self.name)
            .field("author", &self.author)
            .field("kind", &self.kind)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
pub struct DiscoveryReport {
    pub registered: Vec<String>,
    pub skipped: Vec<(PathBuf, String)>,
}

#[derive(Debug, Default, Clone)]
pub struct PatternLibrary {
    patterns: BTreeMap<String, PatternDescriptor>,
}

impl PatternLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every built-in kind registered under its own name with default
    /// parameters.
    pub fn builtin() -> Self {
        let mut library = Self::new();
        for entry in builtin::catalog() {
            library.register(builtin_descriptor(entry.kind, entry));
        }
        library
    }

    /// Adds or replaces a descriptor, returning the one it displaced.
    pub fn register(&mut self, descriptor: PatternDescriptor) -> Option<PatternDescriptor> {
        debug!(pattern = descriptor.name(), kind = descriptor.kind(), "registering pattern");
        self.patterns.insert(descriptor.name.clone(), descriptor)
    }

    /// Registers every valid `*.toml` manifest in `dir`, in file name order.
    ///
    /// A missing directory is not an error. Broken manifests, unknown kinds
    /// and names that collide with an existing pattern are skipped and
    /// reported.
    pub fn discover(&mut self, dir: impl AsRef<Path>) -> DiscoveryReport {
        let dir = dir.as_ref();
        let mut report = DiscoveryReport::default();
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(dir = %dir.display(), error = %err, "pattern directory unavailable; using built-ins only");
                return report;
            }
        };

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "toml"))
            .collect();
        paths.sort();

        for path in paths {
            match self.register_manifest(&path) {
                Ok(name) => {
                    debug!(pattern = %name, path = %path.display(), "registered manifest");
                    report.registered.push(name);
                }
                Err(reason) => {
                    warn!(path = %path.display(), %reason, "skipping pattern manifest");
                    report.skipped.push((path, reason));
                }
            }
        }

        info!(
            dir = %dir.display(),
            registered = report.registered.len(),
            skipped = report.skipped.len(),
            "pattern discovery finished"
        );
        report
    }

    fn register_manifest(&mut self, path: &Path) -> Result<String, String> {
        let manifest = PatternManifest::load(path).map_err(|err| err.to_string())?;
        if self.patterns.contains_key(&manifest.name) {
            return Err(format!("pattern '{}' is already registered", manifest.name));
        }
        let entry = builtin::lookup(&manifest.pattern)
            .ok_or_else(|| format!("unknown pattern kind '{}'", manifest.pattern))?;
        let mut descriptor =
            builtin_descriptor(&manifest.name, entry).with_params(manifest.params);
        if let Some(author) = manifest.author {
            descriptor = descriptor.with_author(author);
        }
        if let Some(description) = manifest.description {
            descriptor = descriptor.with_description(description);
        }
        let name = manifest.name;
        self.register(descriptor);
        Ok(name)
    }

    pub fn get(&self, name: &str) -> Option<&PatternDescriptor> {
        self.patterns.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.patterns.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.patterns.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PatternDescriptor> {
        self.patterns.values()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

fn builtin_descriptor(name: &str, entry: &'static builtin::BuiltinPattern) -> PatternDescriptor {
    let build = entry.build;
    PatternDescriptor::new(name, Arc::new(move |params: &PatternParams| build(params)))
        .with_kind(entry.kind)
        .with_author(entry.author)
        .with_description(entry.description)
}
