//! Process-tree cleanup checks for the bounded runner
//!
//! Run with: cargo test -p irgrade-harness --test runner_tests

#![cfg(target_os = "linux")]

mod common;

use common::process_alive;
use irgrade_harness::{CommandSpec, Outcome, ProcessRunner};
use pretty_assertions::assert_eq;
use std::path::Path;
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn read_pid(dir: &Path) -> u32 {
    std::fs::read_to_string(dir.join("child.pid"))
        .expect("pid file written")
        .trim()
        .parse()
        .expect("pid is numeric")
}

/// Poll until `pid` is gone, giving the kernel a moment to deliver SIGKILL
fn wait_until_dead(pid: u32) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if !process_alive(pid) {
            return true;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    false
}

#[tokio::test]
async fn test_timeout_kills_background_children() {
    let dir = TempDir::new().unwrap();
    let spec = CommandSpec::new("bash")
        .arg("-c")
        .arg("sleep 60 & echo $! > child.pid; wait");

    let outcome = ProcessRunner::new(1024)
        .run(&spec, dir.path(), Duration::from_secs(1))
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::TimedOut);

    let pid = read_pid(dir.path());
    assert!(wait_until_dead(pid), "background child {pid} survived the timeout");
}

#[tokio::test]
async fn test_completed_step_leaves_no_background_children() {
    let dir = TempDir::new().unwrap();
    let spec = CommandSpec::new("bash")
        .arg("-c")
        .arg("sleep 60 & echo $! > child.pid; exit 0");

    let outcome = ProcessRunner::new(1024)
        .run(&spec, dir.path(), Duration::from_secs(10))
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::Completed(0));

    let pid = read_pid(dir.path());
    assert!(wait_until_dead(pid), "background child {pid} outlived its step");
}

#[tokio::test]
async fn test_exit_code_is_reported_verbatim() {
    let dir = TempDir::new().unwrap();
    let outcome = ProcessRunner::new(1024)
        .run(
            &CommandSpec::new("bash").arg("-c").arg("exit 42"),
            dir.path(),
            Duration::from_secs(10),
        )
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::Completed(42));
}

#[tokio::test]
async fn test_timeout_kills_children_that_left_the_group() {
    let dir = TempDir::new().unwrap();
    let spec = CommandSpec::new("bash")
        .arg("-c")
        .arg("setsid sleep 60 & echo $! > child.pid; wait");

    let outcome = ProcessRunner::new(1024)
        .run(&spec, dir.path(), Duration::from_secs(1))
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::TimedOut);

    let pid = read_pid(dir.path());
    assert!(wait_until_dead(pid), "detached child {pid} survived the timeout");
}

#[tokio::test]
async fn test_completed_step_leaves_no_detached_children() {
    let dir = TempDir::new().unwrap();
    let spec = CommandSpec::new("bash")
        .arg("-c")
        .arg("setsid sleep 60 & echo $! > child.pid; exit 0");

    let outcome = ProcessRunner::new(1024)
        .run(&spec, dir.path(), Duration::from_secs(10))
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::Completed(0));

    let pid = read_pid(dir.path());
    assert!(wait_until_dead(pid), "detached child {pid} outlived its step");
}

#[tokio::test]
async fn test_elapsed_excludes_output_drain() {
    let dir = TempDir::new().unwrap();
    // A detached child with a scrubbed environment escapes the sweep and keeps
    // stdout open after the script exits, so draining waits out the grace period
    let spec = CommandSpec::new("bash")
        .arg("-c")
        .arg("setsid env -i \"$(command -v sleep)\" 4 & sleep 0.3; exit 0");

    let started = Instant::now();
    let (outcome, elapsed) = ProcessRunner::new(1024)
        .run_timed(&spec, dir.path(), Duration::from_secs(10))
        .await
        .unwrap();
    let wall = started.elapsed();

    assert_eq!(outcome, Outcome::Completed(0));
    assert!(wall >= Duration::from_secs(2), "drain should have waited, took {wall:?}");
    assert!(elapsed < Duration::from_secs(1), "elapsed {elapsed:?} includes the drain");
}
