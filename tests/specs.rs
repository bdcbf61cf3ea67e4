// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace-level CLI behavior checks.
//!
//! These drive the real `shade` binary against an empty runtime
//! directory, so they only cover behavior that does not require a
//! running daemon or an X session.

use assert_cmd::Command;
use serial_test::serial;

fn shade(dir: &tempfile::TempDir) -> Command {
    let mut cmd = Command::cargo_bin("shade").expect("shade binary");
    cmd.env("SHADE_RUN_DIR", dir.path());
    cmd.env_remove("SHADE_SOCKET");
    cmd
}

#[test]
#[serial]
fn no_arguments_is_a_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    shade(&dir).assert().failure().code(2);
}

#[test]
#[serial]
fn status_without_a_daemon_exits_2() {
    let dir = tempfile::tempdir().unwrap();
    let assert = shade(&dir).arg("status").assert().failure().code(2);
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).into_owned();
    assert!(stderr.contains("is the shade daemon running?"), "stderr: {stderr}");
}

#[test]
#[serial]
fn stop_without_a_pid_file_exits_2() {
    let dir = tempfile::tempdir().unwrap();
    let assert = shade(&dir).arg("stop").assert().failure().code(2);
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).into_owned();
    assert!(stderr.contains("daemon not running?"), "stderr: {stderr}");
}

#[test]
#[serial]
fn lock_without_a_daemon_exits_2() {
    let dir = tempfile::tempdir().unwrap();
    shade(&dir).args(["lock", "--wait"]).assert().failure().code(2);
}

#[test]
#[serial]
fn help_names_the_main_commands() {
    let dir = tempfile::tempdir().unwrap();
    let assert = shade(&dir).arg("--help").assert().success();
    let output = String::from_utf8_lossy(&assert.get_output().stdout).into_owned();
    for command in ["start", "stop", "status", "reload", "lock", "unlock", "attach", "detach"] {
        assert!(output.contains(command), "help should mention {command}");
    }
}
