use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use treeconfig::OutputKind;

#[derive(Parser, Debug)]
#[command(
    name = "gridmas",
    author,
    version,
    about = "GRIDmas tree rendering pipeline"
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Configuration file; defaults to `gridmas.toml` in the config directory when present.
    #[arg(long, value_name = "PATH", env = "GRIDMAS_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Coordinate file with one `x,y,z` line per pixel, in wire order.
    #[arg(long, value_name = "PATH", global = true)]
    pub tree_file: Option<PathBuf>,

    /// Directory scanned for `*.toml` pattern manifests.
    #[arg(long, value_name = "DIR", global = true)]
    pub pattern_dir: Option<PathBuf>,

    /// Pattern to start before the first frame.
    #[arg(long, value_name = "NAME")]
    pub start: Option<String>,

    /// Frame rate handed to self-pacing patterns.
    #[arg(long, value_name = "FPS", value_parser = parse_frame_rate)]
    pub fps: Option<f32>,

    /// Frame rate of the output stage (0 = as fast as frames arrive).
    #[arg(long, value_name = "FPS", value_parser = parse_output_fps)]
    pub output_fps: Option<f32>,

    /// Frames buffered between the control loop and the output.
    #[arg(long, value_name = "FRAMES", value_parser = parse_queue_capacity)]
    pub queue_capacity: Option<usize>,

    /// Output backend: `null` or `jsonl`.
    #[arg(long, value_name = "KIND", value_parser = parse_output_kind)]
    pub output: Option<OutputKind>,

    /// File the `jsonl` output writes to instead of stdout.
    #[arg(long, value_name = "PATH")]
    pub dump: Option<PathBuf>,

    /// Stop after pushing this many frames.
    #[arg(long, value_name = "COUNT")]
    pub frames: Option<u64>,

    /// Do not read JSON commands from stdin.
    #[arg(long)]
    pub no_console: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print every registered pattern (built-ins and manifests) and exit.
    ListPatterns,
    /// Load the coordinate file, report its size, and exit.
    CheckTree,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_frame_rate(value: &str) -> Result<f32, String> {
    let rate: f32 = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid frame rate '{value}'"))?;
    if !rate.is_finite() || rate <= 0.0 {
        return Err(format!("frame rate must be greater than zero (got {rate})"));
    }
    Ok(rate)
}

pub fn parse_output_fps(value: &str) -> Result<f32, String> {
    let rate: f32 = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid output fps '{value}'"))?;
    if !rate.is_finite() || rate < 0.0 {
        return Err(format!("output fps must be >= 0 (got {rate})"));
    }
    Ok(rate)
}

pub fn parse_queue_capacity(value: &str) -> Result<usize, String> {
    let capacity: usize = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid queue capacity '{value}'"))?;
    if capacity == 0 {
        return Err("queue capacity must be at least 1".to_string());
    }
    Ok(capacity)
}

pub fn parse_output_kind(value: &str) -> Result<OutputKind, String> {
    if value.trim().is_empty() {
        return Err("output kind must not be empty".to_string());
    }
    value.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_numbers() {
        assert_eq!(parse_frame_rate("30"), Ok(30.0));
        assert!(parse_frame_rate("0").is_err());
        assert!(parse_frame_rate("fast").is_err());
        assert_eq!(parse_output_fps("0"), Ok(0.0));
        assert!(parse_output_fps("-5").is_err());
        assert_eq!(parse_queue_capacity("1"), Ok(1));
        assert!(parse_queue_capacity("0").is_err());
        assert_eq!(parse_output_kind("jsonl"), Ok(OutputKind::Jsonl));
        assert!(parse_output_kind("").is_err());
    }

    #[test]
    fn global_flags_work_after_subcommands() {
        let cli = Cli::try_parse_from(["gridmas", "list-patterns", "--pattern-dir", "extra"])
            .unwrap();
        assert!(matches!(cli.command, Some(Command::ListPatterns)));
        assert_eq!(cli.run.pattern_dir, Some(PathBuf::from("extra")));
    }
}
