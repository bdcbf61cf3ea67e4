// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::control;
use async_trait::async_trait;
use shade_config::Config as UserConfig;
use shade_core::{FakeClock, ModuleSpec};
use shade_engine::{
    channel, names, Configurator, Engine, EnginePaths, EventReader, LockModule, Module,
    Registry,
};
use shade_wire::Request;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::oneshot;

struct Noop;

#[async_trait]
impl Module for Noop {}

struct TestDaemon {
    engine: Engine<FakeClock>,
    rx: EventReader,
    _dir: tempfile::TempDir,
    socket_path: std::path::PathBuf,
}

fn test_daemon() -> TestDaemon {
    let dir = tempfile::tempdir().unwrap();
    let socket_path = dir.path().join("daemon.sock");

    let mut registry = Registry::new();
    registry.register(names::SERVER, |_| Ok(Box::new(crate::modules::ServerModule::default())));
    for name in [names::XSS, names::TTY_IDLE, "noop_lock"] {
        registry.register(name, |_| Ok(Box::new(Noop)));
    }
    registry.register(names::LOCK, |_| Ok(Box::new(LockModule)));

    let config = UserConfig::parse("on_lock \"noop_lock\" {}", "test.hcl").unwrap();
    let configurator = Configurator::new(Some((config, "test.hcl".into())));

    let (events, rx) = channel();
    let paths = EnginePaths {
        run_dir: dir.path().to_path_buf(),
        lib_dir: dir.path().join("lib"),
        socket_path: socket_path.clone(),
    };
    let engine = Engine::new(registry, configurator, events, paths, FakeClock::new());

    TestDaemon { engine, rx, _dir: dir, socket_path }
}

async fn call(daemon: &mut TestDaemon, request: Request) -> Vec<u8> {
    let (tx, rx) = oneshot::channel();
    control::handle(&mut daemon.engine, request, tx).await;
    rx.await.unwrap()
}

#[tokio::test]
async fn ping_status_and_stop_reply() {
    let mut daemon = test_daemon();
    daemon.engine.update().await.unwrap();

    assert_eq!(call(&mut daemon, Request::Ping).await, b"pong\n");

    let status = call(&mut daemon, Request::Status).await;
    let status = String::from_utf8(status).unwrap();
    assert!(status.contains("Currently locked: false"));
    assert!(status.contains("Running modules:"));

    assert_eq!(call(&mut daemon, Request::Stop).await, b"stopping\n");
    // The stop request is re-queued for the engine loop.
    let queued = daemon.rx.recv().await.unwrap();
    assert!(matches!(queued, shade_engine::Event::Stop));
}

#[tokio::test]
async fn lock_and_unlock_are_edge_triggered() {
    let mut daemon = test_daemon();
    daemon.engine.update().await.unwrap();

    assert_eq!(call(&mut daemon, Request::Lock { wait: false }).await, b"Locked.\n");
    assert!(daemon.engine.core.state.locked);
    assert!(daemon.engine.running().contains(&ModuleSpec::bare("noop_lock")));

    assert_eq!(call(&mut daemon, Request::Lock { wait: false }).await, b"Already locked.\n");

    assert_eq!(call(&mut daemon, Request::Unlock).await, b"Unlocked.\n");
    assert!(!daemon.engine.core.state.locked);
    assert_eq!(call(&mut daemon, Request::Unlock).await, b"Already unlocked.\n");
}

#[tokio::test]
async fn lock_wait_parks_the_reply_until_unlock() {
    let mut daemon = test_daemon();
    daemon.engine.update().await.unwrap();

    let (tx, mut wait_rx) = oneshot::channel();
    control::handle(&mut daemon.engine, Request::Lock { wait: true }, tx).await;
    assert!(wait_rx.try_recv().is_err(), "reply must be deferred");

    assert_eq!(call(&mut daemon, Request::Unlock).await, b"Unlocked.\n");
    assert_eq!(wait_rx.await.unwrap(), b"unlocked\n");
}

#[tokio::test]
async fn attach_replies_ok_or_a_user_error() {
    let mut daemon = test_daemon();
    daemon.engine.update().await.unwrap();

    let session = ModuleSpec::new("session.x11", [":0"]);
    let reply = call(&mut daemon, Request::Attach { session: session.clone() }).await;
    // No session factory is registered in this harness.
    assert!(String::from_utf8(reply).unwrap().contains("session.x11"));

    let reply = call(&mut daemon, Request::Detach { session }).await;
    assert_eq!(reply, b"Already not attached to this session");
}

#[tokio::test]
async fn module_commands_route_to_the_instance() {
    let mut daemon = test_daemon();
    daemon.engine.update().await.unwrap();

    let reply = call(
        &mut daemon,
        Request::Module { spec: ModuleSpec::bare("noop_lock"), command: vec!["poke".into()] },
    )
    .await;
    assert!(String::from_utf8(reply).unwrap().contains("does not handle socket commands"));
}

#[tokio::test]
async fn control_socket_round_trips_a_ping() {
    let mut daemon = test_daemon();
    daemon.engine.update().await.unwrap();

    let socket_path = daemon.socket_path.clone();
    let client = tokio::spawn(async move {
        let mut stream = tokio::net::UnixStream::connect(&socket_path).await.unwrap();
        stream.write_all(b"[\"ping\"]\n").await.unwrap();
        let mut reply = Vec::new();
        stream.read_to_end(&mut reply).await.unwrap();
        reply
    });

    // Pump the one control event the connection produces.
    let event = daemon.rx.recv().await.unwrap();
    match event {
        shade_engine::Event::Control { request, reply } => {
            assert_eq!(request, Request::Ping);
            control::handle(&mut daemon.engine, request, reply).await;
        }
        other => panic!("expected control event, got {other:?}"),
    }

    assert_eq!(client.await.unwrap(), b"pong\n");
    daemon.engine.shutdown().await.unwrap();
}
