// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::test_support::*;
use super::*;
use shade_core::{Clock, IdleSince};
use std::time::Duration;

const LOCK_CONFIG: &str = r#"
on_idle "lock" { after = 600 }
on_lock "locker" {}
"#;

fn x0() -> shade_core::ModuleSpec {
    spec("session.x11 :0")
}

#[tokio::test]
async fn empty_engine_settles_on_core_modules() {
    let mut h = harness("");
    h.engine.update().await.unwrap();
    assert_eq!(h.running_names(), vec!["server", "xss", "tty_idle"]);

    // Every running spec has a live instance, and the fakes enqueued
    // nothing behind the engine's back.
    for spec in h.engine.running().to_vec() {
        assert!(h.engine.has_instance(&spec));
    }
    assert!(h.events.try_recv().is_err());
}

#[tokio::test]
async fn back_to_back_updates_are_idempotent() {
    let mut h = harness(LOCK_CONFIG);
    h.engine.attach(x0()).await.unwrap();
    h.engine.update().await.unwrap();

    let before = h.engine.running().to_vec();
    h.log.take();
    h.engine.update().await.unwrap();
    assert_eq!(h.engine.running(), &before[..]);
    assert_eq!(h.log.take(), vec![]);
}

#[tokio::test]
async fn idle_threshold_locks_the_screen() {
    let mut h = harness(LOCK_CONFIG);
    let now = h.clock.epoch_ms();
    h.set_idle(&x0(), IdleSince::At(now));
    h.engine.attach(x0()).await.unwrap();

    // 599s of idleness: infrastructure up, no lock yet.
    h.clock.advance(Duration::from_secs(599));
    h.engine.update().await.unwrap();
    let names = h.running_names();
    for name in ["server", "xss", "tty_idle", "xset", "timer", "session.x11"] {
        assert!(names.contains(&name.to_string()), "missing {name} in {names:?}");
    }
    assert!(!names.contains(&"lock".to_string()));
    assert!(h.engine.running().contains(&spec("xset 600")));
    assert!(h.engine.running().contains(&spec("timer 600")));

    // The 600th second crosses the threshold (inclusive comparison).
    h.clock.advance(Duration::from_secs(1));
    h.engine.update().await.unwrap();
    let names = h.running_names();
    assert!(names.contains(&"lock".to_string()));
    assert!(names.contains(&"locker".to_string()));
    assert!(h.engine.core.state.locked);
}

#[tokio::test]
async fn unlock_is_edge_triggered_and_invalidates_sessions() {
    let mut h = harness(LOCK_CONFIG);
    let now = h.clock.epoch_ms();
    h.set_idle(&x0(), IdleSince::At(now));
    h.engine.attach(x0()).await.unwrap();
    h.clock.advance(Duration::from_secs(600));
    h.engine.update().await.unwrap();
    assert!(h.engine.core.state.locked);

    // The user typed their password: fresh activity, then unlock.
    h.truth.lock().insert(x0(), IdleSince::At(h.clock.epoch_ms()));
    h.log.take();
    assert!(h.engine.unlock_now().await.unwrap());

    assert!(!h.engine.core.state.locked);
    let names = h.running_names();
    assert!(!names.contains(&"lock".to_string()));
    assert!(!names.contains(&"locker".to_string()));
    assert!(
        h.log.take().contains(&Action::Invalidate(x0())),
        "unlock must drop session idle caches"
    );
}

#[tokio::test]
async fn threshold_change_reconfigures_in_place() {
    let mut h = harness(LOCK_CONFIG);
    let now = h.clock.epoch_ms();
    h.set_idle(&x0(), IdleSince::At(now));
    h.engine.attach(x0()).await.unwrap();
    h.engine.update().await.unwrap();
    h.log.take();

    let (config, path) = parse_config("on_idle \"lock\" { after = 900 }\non_lock \"locker\" {}");
    h.engine.replace_config(config, path);
    h.engine.update().await.unwrap();

    assert!(h.engine.running().contains(&spec("xset 900")));
    assert!(h.engine.running().contains(&spec("timer 900")));

    let actions = h.log.take();
    assert!(actions.contains(&Action::Reconfigure(spec("xset 600"), vec!["900".into()])));
    assert!(actions.contains(&Action::Reconfigure(spec("timer 600"), vec!["900".into()])));
    assert!(
        !actions.iter().any(|a| matches!(a, Action::Stop(s) | Action::Start(s)
            if s.name() == "xset" || s.name() == "timer")),
        "no stop/start cycle expected: {actions:?}"
    );
}

#[tokio::test]
async fn wake_lock_suppresses_idle_machinery() {
    let mut h = harness(LOCK_CONFIG);
    h.set_idle(&x0(), IdleSince::Inhibited);
    h.engine.attach(x0()).await.unwrap();
    h.clock.advance(Duration::from_secs(100_000));
    h.engine.update().await.unwrap();

    let names = h.running_names();
    assert!(!names.contains(&"timer".to_string()), "scheduler must be absent: {names:?}");
    assert!(!names.contains(&"lock".to_string()));
    // The screen-saver configurator still reflects the schedule.
    assert!(names.contains(&"xset".to_string()));
}

#[tokio::test]
async fn sleep_prepare_fires_every_idle_hook() {
    let mut h = harness(LOCK_CONFIG);
    let now = h.clock.epoch_ms();
    h.set_idle(&x0(), IdleSince::At(now));
    h.engine.attach(x0()).await.unwrap();

    h.engine.core.state.sleeping = true;
    h.engine.update().await.unwrap();

    let names = h.running_names();
    assert!(names.contains(&"lock".to_string()));
    assert!(names.contains(&"locker".to_string()));
    assert!(h.engine.core.state.locked);
    // Idleness is not measurable while sleeping, so no scheduler.
    assert!(!names.contains(&"timer".to_string()));

    // Resume: still locked (the lock survives the sleep edge).
    h.engine.core.state.sleeping = false;
    h.set_idle(&x0(), IdleSince::At(h.clock.epoch_ms()));
    h.engine.update().await.unwrap();
    assert!(h.engine.core.state.locked);
}

#[tokio::test]
async fn no_sessions_means_no_scheduler() {
    let mut h = harness(LOCK_CONFIG);
    h.engine.update().await.unwrap();
    assert!(!h.running_names().contains(&"timer".to_string()));
    assert_eq!(h.engine.global_idle(), IdleSince::Inhibited);
}

#[tokio::test]
async fn stop_failure_is_soft_and_does_not_pin_siblings() {
    let mut h = harness("on_start \"failstop\" {}\non_start \"upower\" {}");
    h.engine.update().await.unwrap();
    assert!(h.running_names().contains(&"failstop".to_string()));
    h.log.take();

    let (config, path) = parse_config("");
    h.engine.replace_config(config, path);
    let err = h.engine.update().await.unwrap_err();

    match err {
        UpdateError::StopFailures { specs } => assert_eq!(specs, vec![spec("failstop")]),
        other => panic!("expected stop failure, got {other:?}"),
    }
    let names = h.running_names();
    assert!(!names.contains(&"failstop".to_string()));
    assert!(!names.contains(&"upower".to_string()), "sibling stop must still run");
    assert!(!h.engine.has_instance(&spec("failstop")));

    let actions = h.log.take();
    assert!(actions.contains(&Action::Stop(spec("failstop"))));
    assert!(actions.contains(&Action::Stop(spec("upower"))));
}

#[tokio::test]
async fn start_failure_aborts_the_reconciliation() {
    let mut h = harness("on_start \"failstart\" {}");
    let err = h.engine.update().await.unwrap_err();
    assert!(matches!(err, UpdateError::Start { spec: s, .. } if s == spec("failstart")));
    assert!(!h.running_names().contains(&"failstart".to_string()));
    assert!(!h.engine.has_instance(&spec("failstart")));
}

#[tokio::test]
async fn failed_attach_rolls_back_the_session() {
    let mut h = harness("on_start \"failstart\" {}");
    let err = h.engine.attach(x0()).await.unwrap_err();
    assert!(err.to_string().contains("failstart"));
    assert!(h.engine.core.sessions.is_empty());
}

#[tokio::test]
async fn duplicate_attach_and_unknown_sessions_are_user_errors() {
    let mut h = harness("");
    h.engine.attach(x0()).await.unwrap();
    let err = h.engine.attach(x0()).await.unwrap_err();
    assert_eq!(err.to_string(), "Already attached to this session");

    let err = h.engine.attach(spec("session.mars dome-1")).await.unwrap_err();
    assert!(err.to_string().contains("session.mars"));

    let err = h.engine.detach(&spec("session.x11 :9")).await.unwrap_err();
    assert_eq!(err.to_string(), "Already not attached to this session");
}

#[tokio::test]
async fn dependencies_start_first_and_stop_last() {
    let mut h = harness("on_start \"parent\" {}");
    h.engine.update().await.unwrap();

    let running = h.engine.running();
    let child_pos = running.iter().position(|s| s.name() == "child").unwrap();
    let parent_pos = running.iter().position(|s| s.name() == "parent").unwrap();
    assert!(child_pos < parent_pos, "dependency must precede dependent: {running:?}");
    h.log.take();

    let (config, path) = parse_config("");
    h.engine.replace_config(config, path);
    h.engine.update().await.unwrap();

    let actions = h.log.take();
    let stop_parent = actions.iter().position(|a| *a == Action::Stop(spec("parent"))).unwrap();
    let stop_child = actions.iter().position(|a| *a == Action::Stop(spec("child"))).unwrap();
    assert!(stop_parent < stop_child, "teardown must be reverse start order: {actions:?}");
}

#[tokio::test]
async fn per_session_launcher_fans_out_over_sessions() {
    let mut h = harness("on_start \"dpms\" { args = [\"off\"] }");
    h.engine.attach(x0()).await.unwrap();
    h.engine.attach(spec("session.x11 :1")).await.unwrap();

    let helper0 = spec("dpms.session session.x11 :0 off");
    let helper1 = spec("dpms.session session.x11 :1 off");
    assert!(h.engine.running().contains(&helper0));
    assert!(h.engine.running().contains(&helper1));

    h.engine.detach(&spec("session.x11 :1")).await.unwrap();
    assert!(h.engine.running().contains(&helper0));
    assert!(!h.engine.running().contains(&helper1));
}

#[tokio::test]
async fn attach_detach_restores_the_running_list() {
    let mut h = harness("on_start \"dpms\" {}");
    h.engine.attach(x0()).await.unwrap();
    let before = h.engine.running().to_vec();

    h.engine.attach(spec("session.x11 :1")).await.unwrap();
    h.engine.detach(&spec("session.x11 :1")).await.unwrap();

    assert_eq!(h.engine.running(), &before[..]);
}

#[tokio::test]
async fn unknown_configured_module_is_a_user_error() {
    let mut h = harness("on_start \"no_such_module\" {}");
    let err = h.engine.update().await.unwrap_err();
    assert!(matches!(err, UpdateError::User(_)));
    assert!(err.to_string().contains("no_such_module"));
}

#[tokio::test]
async fn idle_changes_notify_running_modules() {
    let mut h = harness(LOCK_CONFIG);
    let now = h.clock.epoch_ms();
    h.set_idle(&x0(), IdleSince::At(now));

    // Attaching makes idleness measurable for the first time.
    h.engine.attach(x0()).await.unwrap();
    assert!(h.log.take().contains(&Action::IdleChanged(spec("server"))));

    // An unchanged timestamp stays quiet, even as wall time passes.
    h.clock.advance(Duration::from_secs(30));
    h.engine.update().await.unwrap();
    assert!(!h.log.take().iter().any(|a| matches!(a, Action::IdleChanged(_))));

    // Fresh activity moves the idle origin: notified again.
    h.set_idle(&x0(), IdleSince::At(now + 5_000));
    h.engine.update().await.unwrap();
    assert!(h.log.take().contains(&Action::IdleChanged(spec("server"))));
}

#[tokio::test]
async fn unlock_releases_waiters() {
    let mut h = harness(LOCK_CONFIG);
    h.engine.lock_now().await.unwrap();

    let (tx, rx) = tokio::sync::oneshot::channel();
    h.engine.core.unlock_waiters.push(tx);

    h.truth.lock().insert(x0(), IdleSince::At(h.clock.epoch_ms()));
    assert!(h.engine.unlock_now().await.unwrap());
    assert_eq!(rx.await.unwrap(), b"unlocked\n".to_vec());

    // Unlocking again is a no-op edge.
    assert!(!h.engine.unlock_now().await.unwrap());
}

#[tokio::test]
async fn shutdown_stops_everything_in_reverse_order() {
    let mut h = harness(LOCK_CONFIG);
    let now = h.clock.epoch_ms();
    h.set_idle(&x0(), IdleSince::At(now));
    h.engine.attach(x0()).await.unwrap();
    h.clock.advance(Duration::from_secs(600));
    h.engine.update().await.unwrap();
    assert!(h.engine.core.state.locked);

    h.engine.shutdown().await.unwrap();
    assert!(h.engine.running().is_empty());
}

#[tokio::test]
async fn stale_module_events_are_dropped() {
    let mut h = harness("");
    h.engine.update().await.unwrap();
    // No instance for this spec: the event is logged and discarded.
    h.engine
        .handle_event(Event::Module {
            spec: spec("locker"),
            payload: ModuleEvent::ChildExited { pid: 4242 },
        })
        .await
        .unwrap();
    assert_eq!(h.running_names(), vec!["server", "xss", "tty_idle"]);
}

#[tokio::test]
async fn status_report_names_sessions_and_modules() {
    let mut h = harness(LOCK_CONFIG);
    let now = h.clock.epoch_ms();
    h.set_idle(&x0(), IdleSince::At(now));
    h.engine.attach(x0()).await.unwrap();
    h.engine.update().await.unwrap();

    let report = h.engine.status_report();
    assert!(report.contains("Currently locked: false"));
    assert!(report.contains("session.x11 :0"));
    assert!(report.contains("Running modules:"));
    assert!(report.contains("- 600 lock"));
}
