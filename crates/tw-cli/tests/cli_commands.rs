//! Integration tests for the `tw` CLI commands.
#![allow(deprecated)] // Command::cargo_bin – macro replacement not yet stable

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn tw() -> Command {
    Command::cargo_bin("tw").unwrap()
}

fn stdout_of(args: &[&str]) -> String {
    let output = tw().args(args).output().unwrap();
    assert!(output.status.success(), "tw {args:?} failed");
    String::from_utf8(output.stdout).unwrap()
}

/// Everything from the final agent table onwards.
fn final_state(stdout: &str) -> String {
    let start = stdout.rfind("Agents").unwrap();
    stdout[start..].to_string()
}

fn draw_line(stdout: &str, generation: u64) -> String {
    let needle = format!("draw {generation:>4}");
    stdout
        .lines()
        .find(|l| l.contains(&needle))
        .unwrap()
        .trim()
        .to_string()
}

// ---------------------------------------------------------------------------
// play
// ---------------------------------------------------------------------------

#[test]
fn play_runs_nights_and_prints_state() {
    tw().args(["play", "--turns", "3", "--seed", "abc123"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Night 1 falls")
                .and(predicate::str::contains("Night 3 falls"))
                .and(predicate::str::contains("Agents"))
                .and(predicate::str::contains("keeper"))
                .and(predicate::str::contains("lamp")),
        );
}

#[test]
fn play_is_deterministic() {
    let a = stdout_of(&["play", "--turns", "4", "--seed", "harbour"]);
    let b = stdout_of(&["play", "--turns", "4", "--seed", "harbour"]);
    assert_eq!(a, b);
}

#[test]
fn seed_changes_the_story() {
    let a = stdout_of(&["play", "--turns", "6", "--seed", "harbour"]);
    let b = stdout_of(&["play", "--turns", "6", "--seed", "reef"]);
    assert_ne!(final_state(&a), final_state(&b));
}

#[test]
fn step_limit_is_reported() {
    tw().args(["play", "--turns", "1", "--max-steps", "2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("exceeded 2 steps"));
}

// ---------------------------------------------------------------------------
// options
// ---------------------------------------------------------------------------

#[test]
fn options_file_sets_seed() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("options.json");
    fs::write(&path, r#"{ "seed": "abc123", "name": "harbour" }"#).unwrap();

    tw().args(["play", "--turns", "1", "--options", path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("harbour").and(predicate::str::contains("seed=abc123")));
}

#[test]
fn options_file_rejects_unknown_keys() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("options.json");
    fs::write(&path, r#"{ "sed": "typo" }"#).unwrap();

    tw().args(["play", "--options", path.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown option: sed"));
}

#[test]
fn options_file_rejects_wrong_types() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("options.json");
    fs::write(&path, r#"{ "max_steps": "many" }"#).unwrap();

    tw().args(["play", "--options", path.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("max_steps"));
}

// ---------------------------------------------------------------------------
// history
// ---------------------------------------------------------------------------

#[test]
fn history_lists_records() {
    tw().args(["history", "--seed", "abc123"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("e1024")
                .and(predicate::str::contains("dusk"))
                .and(predicate::str::contains("weather"))
                .and(predicate::str::contains("watch")),
        );
}

// ---------------------------------------------------------------------------
// rewind
// ---------------------------------------------------------------------------

#[test]
fn rewind_to_first_event_restores_templates() {
    tw().args(["rewind", "--to", "e1024", "--seed", "abc123"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Reverted")
                .and(predicate::str::contains("random rewound to draw 0"))
                .and(predicate::str::contains("calm")),
        );
}

#[test]
fn rewind_to_unknown_event_fails() {
    tw().args(["rewind", "--to", "e9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid revert target"));
}

#[test]
fn rewind_rejects_malformed_id() {
    tw().args(["rewind", "--to", "dusk"]).assert().failure();
}

// ---------------------------------------------------------------------------
// resume
// ---------------------------------------------------------------------------

#[test]
fn resume_matches_uninterrupted_play() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("night3.json");
    let path = path.to_str().unwrap();

    stdout_of(&["play", "--turns", "3", "--seed", "abc123", "--save", path]);
    assert!(fs::metadata(path).unwrap().len() > 0);

    let resumed = stdout_of(&["resume", "--from", path, "--turns", "2"]);
    let straight = stdout_of(&["play", "--turns", "5", "--seed", "abc123"]);
    assert!(resumed.contains("Night 4 falls"));
    assert_eq!(final_state(&resumed), final_state(&straight));
}

#[test]
fn resume_missing_file_fails() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("missing.json");
    tw().args(["resume", "--from", path.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot read"));
}

// ---------------------------------------------------------------------------
// roll
// ---------------------------------------------------------------------------

#[test]
fn roll_replays_from_generation() {
    let full = stdout_of(&["roll", "--seed", "abc123", "--count", "4", "--min", "1", "--max", "10"]);
    let replay = stdout_of(&[
        "roll", "--seed", "abc123", "--from", "3", "--count", "1", "--min", "1", "--max", "10",
    ]);
    assert_eq!(draw_line(&full, 4), draw_line(&replay, 4));
}

#[test]
fn roll_rejects_inverted_range() {
    tw().args(["roll", "--min", "5", "--max", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid range"));
}

// ---------------------------------------------------------------------------
// logging
// ---------------------------------------------------------------------------

#[test]
fn debug_logging_goes_to_stderr() {
    tw().args(["--log-level", "debug", "play", "--turns", "1"])
        .assert()
        .success()
        .stderr(predicate::str::contains("executing event"))
        .stdout(predicate::str::contains("executing event").not());
}
