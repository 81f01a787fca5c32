//! CLI smoke tests for the reflow-pager binary
//!
//! These tests run the compiled binary over `tests/fixtures/sample_book.json`
//! and inspect the JSON event stream it prints on stdout. Each test points
//! logging and the geometry cache at its own temporary directory through a
//! config file.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::Value;

const SAMPLE_BOOK: &str = "tests/fixtures/sample_book.json";

/// Scratch directory with a config file routing logs and cache into it.
fn scratch(name: &str) -> (PathBuf, PathBuf) {
    let dir = std::env::temp_dir().join(format!("reflow_pager_cli_{name}"));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).expect("Failed to create scratch dir");

    let config = dir.join("config.toml");
    let toml = format!(
        "log_file_path = {:?}\ngeometry_cache_dir = {:?}\n",
        dir.join("pager.log"),
        dir.join("geometry"),
    );
    std::fs::write(&config, toml).expect("Failed to write config");
    (dir, config)
}

fn run(config: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_reflow-pager"))
        .arg(SAMPLE_BOOK)
        .arg("--config")
        .arg(config)
        .args(args)
        .output()
        .expect("Failed to execute binary")
}

fn events(output: &Output) -> Vec<Value> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|line| serde_json::from_str(line).expect("Each stdout line should be JSON"))
        .collect()
}

fn of_type<'a>(events: &'a [Value], kind: &str) -> Vec<&'a Value> {
    events.iter().filter(|e| e["type"] == kind).collect()
}

#[test]
fn smoke_help_flag() {
    let output = Command::new(env!("CARGO_BIN_EXE_reflow-pager"))
        .arg("--help")
        .output()
        .expect("Failed to execute binary");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("Usage:"), "Expected usage, got: {stdout}");
    assert!(stdout.contains("--no-cache"));
}

#[test]
fn smoke_open_section_emits_display_events() {
    let (dir, config) = scratch("open");
    let output = run(&config, &["--section", "1", "--no-cache"]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let events = events(&output);
    let kinds: Vec<&str> = events.iter().filter_map(|e| e["type"].as_str()).collect();
    assert_eq!(kinds, vec!["goTo", "load", "relocate", "didDisplay"]);
    assert_eq!(events[1]["location"], "ch01.xhtml");
    assert_eq!(events[2]["reason"], "navigation");
    assert_eq!(events[2]["pageCount"], 2);
    assert!(dir.join("pager.log").exists(), "Logs should go to the configured file");
}

#[test]
fn smoke_first_display_prefetches_neighbors() {
    let (dir, config) = scratch("prefetch");
    let output = run(&config, &["--section", "1", "--no-cache"]);
    assert!(output.status.success());

    // The cover is non-linear, so only ch02 is a neighbor of ch01.
    let log = std::fs::read_to_string(dir.join("pager.log")).expect("Log file should exist");
    assert!(
        log.contains("Prefetched neighboring sections loaded=1"),
        "Expected a prefetch entry after the first display, got: {log}"
    );
}

#[test]
fn smoke_turns_cross_into_next_section() {
    let (_dir, config) = scratch("turns");
    let output = run(&config, &["-s", "1", "-t", "3", "--no-cache"]);
    assert!(output.status.success());

    let events = events(&output);
    let locations: Vec<&Value> = of_type(&events, "load")
        .into_iter()
        .map(|e| &e["location"])
        .collect();
    assert_eq!(locations, vec!["ch01.xhtml", "ch02.xhtml"]);

    let last = *of_type(&events, "relocate").last().expect("relocate");
    assert_eq!(last["index"], 2);
    assert_eq!(last["pageNumber"], 1);
    assert_eq!(last["reason"], "page");
}

#[test]
fn smoke_geometry_cache_written_once_per_key() {
    let (dir, config) = scratch("cache");
    assert!(run(&config, &["-s", "1"]).status.success());

    let cached = std::fs::read_dir(dir.join("geometry"))
        .expect("Cache directory should exist")
        .count();
    assert_eq!(cached, 1);

    assert!(run(&config, &["-s", "1"]).status.success());
    let again = std::fs::read_dir(dir.join("geometry")).unwrap().count();
    assert_eq!(again, 1, "Reopening under the same key adds no file");

    assert!(run(&config, &["-s", "1", "--width", "640"]).status.success());
    let resized = std::fs::read_dir(dir.join("geometry")).unwrap().count();
    assert_eq!(resized, 2, "A new viewport is a new key");
}

#[test]
fn smoke_out_of_range_section_fails() {
    let (_dir, config) = scratch("range");
    let output = run(&config, &["-s", "9", "--no-cache"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("OutOfRange"));
}
