// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use shade_core::ModuleSpec;
use shade_engine::channel;

fn sh(script: &str) -> Command {
    let mut command = Command::new("sh");
    command.arg("-c").arg(script);
    command
}

#[tokio::test]
async fn forwards_lines_and_reports_exit() {
    let (tx, mut rx) = channel();
    let spec = ModuleSpec::bare("helper");

    let supervisor = ChildSupervisor::spawn(
        sh("printf 'init\\nhello\\n'"),
        spec.clone(),
        tx,
        Handshake::Expect("init"),
        true,
    )
    .await
    .unwrap();
    let pid = supervisor.pid;

    match rx.recv().await.unwrap() {
        Event::Module { spec: s, payload: ModuleEvent::HelperLine { line } } => {
            assert_eq!(s, spec);
            assert_eq!(line, "hello");
        }
        other => panic!("expected helper line, got {other:?}"),
    }
    match rx.recv().await.unwrap() {
        Event::Module { payload: ModuleEvent::ChildExited { pid: reported }, .. } => {
            assert_eq!(reported, pid);
        }
        other => panic!("expected exit event, got {other:?}"),
    }
}

#[tokio::test]
async fn handshake_mismatch_fails_the_start() {
    let (tx, _rx) = channel();
    let err = ChildSupervisor::spawn(
        sh("echo nope"),
        ModuleSpec::bare("helper"),
        tx,
        Handshake::Expect("init"),
        false,
    )
    .await
    .unwrap_err();
    assert!(err.to_string().contains("handshake failed"));
}

#[tokio::test]
async fn terminate_kills_a_long_running_child() {
    let (tx, mut rx) = channel();
    let spec = ModuleSpec::bare("helper");

    let supervisor = ChildSupervisor::spawn(
        sh("printf 'init\\n'; sleep 600"),
        spec,
        tx,
        Handshake::Expect("init"),
        false,
    )
    .await
    .unwrap();
    let pid = supervisor.pid;

    supervisor.terminate().await;
    match rx.recv().await.unwrap() {
        Event::Module { payload: ModuleEvent::ChildExited { pid: reported }, .. } => {
            assert_eq!(reported, pid);
        }
        other => panic!("expected exit event, got {other:?}"),
    }
}
