use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

const TREE: &str = "0.0,0.0,0.0\n0.5,0.0,0.5\n0.0,0.5,1.0\n-0.5,0.0,1.5\n";

struct Sandbox {
    root: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        let root = TempDir::new().unwrap();
        fs::create_dir_all(root.path().join("config")).unwrap();
        fs::create_dir_all(root.path().join("data")).unwrap();
        fs::create_dir_all(root.path().join("patterns")).unwrap();
        fs::write(root.path().join("tree.csv"), TREE).unwrap();
        Self { root }
    }

    fn path(&self, name: &str) -> std::path::PathBuf {
        self.root.path().join(name)
    }

    fn gridmas(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_gridmas"))
            .current_dir(self.root.path())
            .env("GRIDMAS_CONFIG_DIR", self.path("config"))
            .env("GRIDMAS_DATA_DIR", self.path("data"))
            .env_remove("GRIDMAS_CONFIG")
            .env("RUST_LOG", "warn")
            .args(args)
            .output()
            .expect("failed to run gridmas")
    }
}

fn frame_lines(stdout: &[u8]) -> Vec<Vec<String>> {
    String::from_utf8_lossy(stdout)
        .lines()
        .map(|line| serde_json::from_str(line).expect("frame line is a JSON array"))
        .collect()
}

#[test]
fn renders_a_fixed_number_of_frames_to_stdout() {
    let sandbox = Sandbox::new();
    let output = sandbox.gridmas(&[
        "--start",
        "rainbow",
        "--frames",
        "3",
        "--no-console",
        "--output",
        "jsonl",
        "--output-fps",
        "0",
    ]);
    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );

    let frames = frame_lines(&output.stdout);
    assert_eq!(frames.len(), 3);
    for frame in &frames {
        assert_eq!(frame.len(), 4);
        assert!(frame.iter().all(|color| color.starts_with('#') && color.len() == 7));
    }
    // Rainbow bands by height, so the bottom and top pixels differ.
    assert_ne!(frames[0][0], frames[0][3]);
}

#[test]
fn dump_file_receives_frames_from_a_looping_pattern() {
    let sandbox = Sandbox::new();
    let dump = sandbox.path("frames.jsonl");
    let output = sandbox.gridmas(&[
        "--start",
        "spin",
        "--fps",
        "200",
        "--frames",
        "4",
        "--no-console",
        "--output",
        "jsonl",
        "--output-fps",
        "0",
        "--dump",
        dump.to_str().unwrap(),
    ]);
    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(output.stdout.is_empty());
    assert_eq!(frame_lines(&fs::read(&dump).unwrap()).len(), 4);
}

#[test]
fn list_patterns_includes_manifests() {
    let sandbox = Sandbox::new();
    fs::write(
        sandbox.path("patterns").join("ember.toml"),
        "name = \"ember\"\nauthor = \"Elf\"\npattern = \"solid\"\n[params]\ncolor = \"#ff4000\"\n",
    )
    .unwrap();

    let output = sandbox.gridmas(&["list-patterns"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let names: Vec<&str> = stdout
        .lines()
        .filter_map(|line| line.split('\t').next())
        .collect();
    assert_eq!(names, ["ember", "rainbow", "solid", "spin", "twinkle"]);
    assert!(stdout.lines().any(|line| line.starts_with("ember\tsolid\tElf")));
}

#[test]
fn check_tree_reports_size() {
    let sandbox = Sandbox::new();
    let output = sandbox.gridmas(&["check-tree"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("pixels: 4"));
    assert!(stdout.contains("height: 1.500"));
}

#[test]
fn missing_tree_file_is_fatal() {
    let sandbox = Sandbox::new();
    let output = sandbox.gridmas(&["--tree-file", "nowhere.csv", "--no-console", "--frames", "1"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("nowhere.csv"));
}

#[test]
fn config_file_in_config_dir_is_picked_up() {
    let sandbox = Sandbox::new();
    let lights = Path::new("lights.csv");
    fs::write(sandbox.path("config").join(lights), "0,0,0\n0,0,2\n").unwrap();
    fs::write(
        sandbox.path("config").join("gridmas.toml"),
        "version = 1\n[tree]\nfile = \"lights.csv\"\n",
    )
    .unwrap();

    let output = sandbox.gridmas(&["check-tree"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("pixels: 2"));
}

#[test]
fn frame_rate_slower_than_an_hour_is_rejected() {
    let sandbox = Sandbox::new();
    let output = sandbox.gridmas(&["--fps", "1e-20", "check-tree"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("frame_rate"));
}
