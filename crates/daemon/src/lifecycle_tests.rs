// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn test_config(dir: &std::path::Path) -> Config {
    Config {
        run_dir: dir.to_path_buf(),
        socket_path: dir.join("daemon.sock"),
        lock_path: dir.join("daemon.pid"),
        log_path: dir.join("daemon.log"),
        lib_dir: dir.join("lib"),
    }
}

#[test]
fn guard_writes_the_pid_and_excludes_a_second_daemon() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());

    let guard = DaemonGuard::acquire(&config).unwrap();
    let written = std::fs::read_to_string(&config.lock_path).unwrap();
    assert_eq!(written.trim(), std::process::id().to_string());

    let second = DaemonGuard::acquire(&config);
    assert!(matches!(second, Err(LifecycleError::LockFailed(_))));
    drop(guard);
}

#[test]
fn shutdown_removes_runtime_files() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    std::fs::write(&config.socket_path, b"").unwrap();

    let guard = DaemonGuard::acquire(&config).unwrap();
    guard.shutdown();

    assert!(!config.lock_path.exists());
    assert!(!config.socket_path.exists());
}
