//! Concurrency tests for the forge binary.
//!
//! These tests verify that multiple processes can safely:
//! - Append workouts to the same log (file locking)
//! - Update the same user's fatigue without lost updates
//! - Read while others write

use assert_cmd::Command;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::thread;
use tempfile::TempDir;

fn forge(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("forge"));
    cmd.env("XDG_CONFIG_HOME", dir.join("config"))
        .arg("--data-dir")
        .arg(dir.join("data"));
    cmd
}

fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

fn fatigue_of(dir: &Path, user: &str) -> f64 {
    let output = forge(dir)
        .args(["--user", user, "--json", "fatigue"])
        .output()
        .expect("Failed to run forge");
    assert!(output.status.success());
    let state: Value = serde_json::from_slice(&output.stdout).unwrap();
    state["current_fatigue"].as_f64().unwrap()
}

/// Run `workers` processes in parallel, each logging `per_worker` workouts for `user_of(i)`
fn log_in_parallel(dir: &Path, workers: usize, per_worker: usize, user_of: fn(usize) -> String) {
    let handles: Vec<_> = (0..workers)
        .map(|i| {
            let dir: PathBuf = dir.to_path_buf();
            thread::spawn(move || {
                for _ in 0..per_worker {
                    forge(&dir)
                        .args(["--user", &user_of(i)])
                        // One set at 4 RIR adds exactly 1.0 fatigue
                        .args(["log", "plank", "--sets", "1", "--reps", "1", "--rir", "4"])
                        .assert()
                        .success();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("worker panicked");
    }
}

#[test]
fn test_concurrent_logging_same_user() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();

    log_in_parallel(dir, 4, 5, |_| "shared".to_string());

    // Every workout reached the log
    let log = std::fs::read_to_string(dir.join("data/workouts.jsonl")).expect("Failed to read log");
    assert_eq!(log.lines().count(), 20);

    // And every fatigue update landed: 30 + 20 x 1.0
    assert_eq!(fatigue_of(dir, "shared"), 50.0);
}

#[test]
fn test_concurrent_logging_different_users() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();

    log_in_parallel(dir, 3, 3, |i| format!("user{}", i));

    for i in 0..3 {
        assert_eq!(fatigue_of(dir, &format!("user{}", i)), 33.0);
    }
}

#[test]
fn test_reads_during_writes() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path().to_path_buf();

    let writer_dir = dir.clone();
    let writer = thread::spawn(move || {
        log_in_parallel(&writer_dir, 2, 3, |_| "busy".to_string());
    });

    // Readers always see a complete state file
    for _ in 0..5 {
        let value = fatigue_of(&dir, "busy");
        assert!((30.0..=36.0).contains(&value), "unexpected fatigue {}", value);
    }

    writer.join().unwrap();
    assert_eq!(fatigue_of(&dir, "busy"), 36.0);
}

#[test]
fn test_concurrent_plan_creation_leaves_one_active() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path().to_path_buf();

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let dir = dir.clone();
            thread::spawn(move || {
                forge(&dir)
                    .args(["--user", "planner"])
                    .args(["plan", "create", "--name", &format!("Plan {}", i)])
                    .args(["--goal", "strength", "--months", "2"])
                    .assert()
                    .success();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let state: Value =
        serde_json::from_str(&std::fs::read_to_string(dir.join("data/state.json")).unwrap())
            .unwrap();
    let macrocycles = state["macrocycles"].as_array().unwrap();
    assert_eq!(macrocycles.len(), 4);
    assert_eq!(
        macrocycles.iter().filter(|m| m["is_active"] == true).count(),
        1
    );
}
