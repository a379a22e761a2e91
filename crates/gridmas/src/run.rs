use std::fs::File;
use std::io::{self, BufReader, BufWriter};

use anyhow::{Context, Result};
use renderer::{
    command_channel, FrameQueue, JsonLinesOutput, NullOutput, OutputBackend, OutputRuntime,
    PatternRunner, PipelineDriver,
};
use tracing_subscriber::EnvFilter;
use tree::{Canvas, Topology};
use treeconfig::{OutputKind, TreeConfig};

use crate::bootstrap::{self, Settings};
use crate::cli::{Cli, Command};
use crate::console::{Console, PatternInfo};
use crate::paths::AppPaths;

pub fn run(cli: Cli) -> Result<()> {
    initialise_tracing();

    let paths = AppPaths::discover()?;
    tracing::debug!(
        config = %paths.config_dir().display(),
        data = %paths.data_dir().display(),
        "resolved gridmas paths"
    );
    let settings = bootstrap::resolve_settings(&cli.run, &paths)?;
    tracing::debug!(config_file = ?settings.config_path, "settings resolved");

    match cli.command {
        Some(Command::ListPatterns) => list_patterns(&settings, &paths),
        Some(Command::CheckTree) => check_tree(&settings),
        None => run_pipeline(settings, &paths),
    }
}

fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // stdout may carry frames and console responses.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn load_tree(config: &TreeConfig) -> Result<Canvas> {
    let path = &config.tree.file;
    Topology::load(path)
        .with_context(|| format!("failed to load tree coordinates from {}", path.display()))
}

fn list_patterns(settings: &Settings, paths: &AppPaths) -> Result<()> {
    let library = bootstrap::build_library(&settings.config, paths);
    for info in PatternInfo::catalog(&library) {
        let author = info.author.as_deref().unwrap_or("-");
        match info.description {
            Some(description) => {
                println!("{}\t{}\t{}\t{}", info.name, info.kind, author, description)
            }
            None => println!("{}\t{}\t{}", info.name, info.kind, author),
        }
    }
    Ok(())
}

fn check_tree(settings: &Settings) -> Result<()> {
    let canvas = load_tree(&settings.config)?;
    println!("pixels: {}", canvas.len());
    println!("height: {:.3}", canvas.height());
    Ok(())
}

fn build_backend(config: &TreeConfig) -> Result<Box<dyn OutputBackend>> {
    match (config.output.kind, &config.output.dump) {
        (OutputKind::Null, _) => Ok(Box::new(NullOutput)),
        (OutputKind::Jsonl, Some(path)) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create frame dump {}", path.display()))?;
            tracing::info!(path = %path.display(), "writing frames to file");
            Ok(Box::new(JsonLinesOutput::new(BufWriter::new(file))))
        }
        (OutputKind::Jsonl, None) => Ok(Box::new(JsonLinesOutput::new(io::stdout()))),
    }
}

fn run_pipeline(settings: Settings, paths: &AppPaths) -> Result<()> {
    let config = &settings.config;
    let canvas = load_tree(config)?;
    let library = bootstrap::build_library(config, paths);
    tracing::info!(patterns = library.len(), "pattern library ready");

    let queue = FrameQueue::new(config.pipeline.queue_capacity);
    let runner = PatternRunner::new(canvas, library.clone())
        .with_frame_interval(config.frame_interval())
        .with_stop_warning(config.pipeline.stop_warning);
    let (commands, command_rx) = command_channel();
    let mut driver =
        PipelineDriver::new(runner, command_rx, queue.clone()).with_frame_limit(settings.frame_limit);

    let shutdown = driver.shutdown_handle();
    ctrlc::set_handler(move || shutdown.trigger())
        .context("failed to install signal handler")?;

    if let Some(name) = &config.patterns.default {
        if let Err(err) = driver.runner_mut().load(name) {
            tracing::warn!("failed to start pattern '{name}': {err}; staying idle");
        }
    }

    let backend = build_backend(config)?;
    tracing::info!(
        output = backend.name(),
        fps = config.output.fps,
        queue = config.pipeline.queue_capacity,
        "starting output"
    );
    let output = OutputRuntime::spawn(queue, backend, config.output_fps())?;

    if settings.console {
        let console = Console::new(
            commands.clone(),
            driver.runner().status(),
            PatternInfo::catalog(&library),
        );
        // Left detached: it may be blocked on a stdin read at exit.
        console.spawn(BufReader::new(io::stdin()), io::stdout())?;
    }

    let frames = driver.run();
    let summary = output.shutdown().context("output stage failed")?;
    tracing::info!(
        pushed = frames,
        presented = summary.frames,
        "gridmas stopped"
    );
    Ok(())
}
