//! Integration tests for the truchet CLI.
//!
//! These tests run the actual binary and verify end-to-end behavior.

use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};

fn binary_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_truchet"))
}

/// Path to a file in the repo's `test_assets/`.
fn asset(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.pop(); // Go up from truchet-cli to crates
    path.pop(); // Go up from crates to repo root
    path.push("test_assets");
    path.push(name);
    path
}

/// A fresh scratch directory per test.
fn scratch(name: &str) -> PathBuf {
    let dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join(name);
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).expect("Failed to create scratch dir");
    dir
}

fn run(args: &[&str]) -> Output {
    Command::new(binary_path())
        .args(args)
        .output()
        .expect("Failed to execute command")
}

fn assert_renderable(svg: &str) {
    if let Err(e) = usvg::Tree::from_str(svg, &usvg::Options::default()) {
        panic!("Output is not valid SVG: {}\n{}", e, svg);
    }
}

fn json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be a JSON report")
}

#[test]
fn tile_command_writes_use_pattern() {
    let dir = scratch("tile_use");
    let out = dir.join("pattern.svg");
    let symbols = asset("symbols.svg");

    let output = run(&[
        "tile",
        symbols.to_str().unwrap(),
        "-o",
        out.to_str().unwrap(),
        "-c",
        "3",
        "-r",
        "2",
        "--seed",
        "42",
    ]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Saved:"));

    let svg = fs::read_to_string(&out).unwrap();
    assert_eq!(svg.matches("<use").count(), 6);
    assert!(svg.contains(r#"viewBox="0 0 120 80""#));
    assert_renderable(&svg);
}

#[test]
fn tile_command_is_reproducible_with_seed() {
    let symbols = asset("symbols.svg");
    let args = ["tile", symbols.to_str().unwrap(), "-o", "-", "--seed", "7", "-c", "5", "-r", "5"];

    let first = run(&args);
    let second = run(&args);
    assert!(first.status.success());
    assert!(!first.stdout.is_empty());
    assert_eq!(first.stdout, second.stdout);
}

#[test]
fn tile_command_runs_pipeline_from_config() {
    let dir = scratch("tile_config");
    let out = dir.join("pattern.svg");
    let symbols = asset("symbols.svg");
    let config = asset("truchet.yaml");

    let output = run(&[
        "tile",
        symbols.to_str().unwrap(),
        "--config",
        config.to_str().unwrap(),
        "--stroke-to-path",
        "1.5",
        "--line-cap",
        "butt",
        "-o",
        out.to_str().unwrap(),
        "--json",
    ]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let report = json(&output);
    assert_eq!(report["tiles"], 24);
    assert_eq!(report["seed"], 42);
    assert!(report["join"]["joins"].as_u64().unwrap() > 0);
    assert!(report["stroke_widths_set"].as_u64().unwrap() > 0);
    assert!(report["stroke"]["paths_stroked"].as_u64().unwrap() > 0);

    let svg = fs::read_to_string(&out).unwrap();
    assert!(!svg.contains("<use"));
    assert!(svg.contains("stroke:none"));
    assert_renderable(&svg);
}

#[test]
fn tile_command_default_output_location() {
    let dir = scratch("tile_default");
    let symbols = asset("symbols.svg");

    let output = Command::new(binary_path())
        .current_dir(&dir)
        .args(["tile", symbols.to_str().unwrap(), "--seed", "1", "-c", "2", "-r", "2"])
        .output()
        .expect("Failed to execute command");
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(dir.join("output/symbols_truchet.svg").exists());
}

#[test]
fn tile_command_fails_without_symbols() {
    let drawing = asset("drawing.svg");
    let output = run(&["tile", drawing.to_str().unwrap(), "-o", "-", "--seed", "1"]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("no <symbol> elements"));
}

#[test]
fn tile_command_rejects_join_without_inlining() {
    let symbols = asset("symbols.svg");
    let output = run(&["tile", symbols.to_str().unwrap(), "-o", "-", "--join-paths"]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("convert_to_paths"));
}

#[test]
fn join_command_chains_touching_paths() {
    let dir = scratch("join");
    let out = dir.join("joined.svg");
    let drawing = asset("drawing.svg");

    let output = run(&["join", drawing.to_str().unwrap(), "-o", out.to_str().unwrap(), "--json"]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let report = json(&output);
    assert_eq!(report["join"]["joins"], 4);
    assert_eq!(report["join"]["paths_closed"], 1);
    assert_eq!(report["join"]["elements_before"], 6);
    assert_eq!(report["join"]["elements_after"], 2);
    assert!(report.get("stroke").is_none());

    let svg = fs::read_to_string(&out).unwrap();
    assert!(svg.contains(r#"id="a""#));
    assert!(svg.contains(r#"id="lonely""#));
    assert!(!svg.contains(r#"id="c""#));
    assert_renderable(&svg);
}

#[test]
fn join_command_strokes_to_outlines() {
    let drawing = asset("drawing.svg");
    let output = run(&[
        "join",
        drawing.to_str().unwrap(),
        "-o",
        "-",
        "--stroke-to-path",
        "2",
        "--line-join",
        "bevel",
    ]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let svg = String::from_utf8_lossy(&output.stdout);
    assert!(svg.contains("fill:black;stroke:none"));
    assert_renderable(&svg);
}
