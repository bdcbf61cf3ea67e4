// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

#[test]
#[serial]
fn current_session_prefers_the_x11_display() {
    std::env::set_var("DISPLAY", ":7");
    let session = current_session().unwrap();
    assert_eq!(session, ModuleSpec::new("session.x11", [":7"]));
    std::env::remove_var("DISPLAY");
}

#[test]
#[serial]
fn socket_path_honors_the_environment() {
    std::env::set_var("SHADE_SOCKET", "/tmp/some.sock");
    assert_eq!(crate::client::socket_path(), std::path::PathBuf::from("/tmp/some.sock"));
    std::env::remove_var("SHADE_SOCKET");

    std::env::set_var("SHADE_RUN_DIR", "/tmp/shade-run");
    assert_eq!(
        crate::client::socket_path(),
        std::path::PathBuf::from("/tmp/shade-run/daemon.sock")
    );
    assert_eq!(crate::client::pid_path(), std::path::PathBuf::from("/tmp/shade-run/daemon.pid"));
    std::env::remove_var("SHADE_RUN_DIR");
}

#[tokio::test]
#[serial]
async fn commands_report_a_missing_daemon_as_exit_code_2() {
    let dir = tempfile::tempdir().unwrap();
    std::env::set_var("SHADE_RUN_DIR", dir.path());

    let err = simple(Request::Status).await.unwrap_err();
    let exit = err.downcast_ref::<crate::exit_error::ExitError>().unwrap();
    assert_eq!(exit.code, 2);
    assert!(exit.message.contains("is the shade daemon running?"));

    std::env::remove_var("SHADE_RUN_DIR");
}
