// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

fn words(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[parameterized(
    ping = { &["ping"], Request::Ping },
    status = { &["status"], Request::Status },
    stop = { &["stop"], Request::Stop },
    reload = { &["reload"], Request::Reload },
    lock = { &["lock"], Request::Lock { wait: false } },
    lock_wait = { &["lock", "wait"], Request::Lock { wait: true } },
    unlock = { &["unlock"], Request::Unlock },
)]
fn bare_verbs_decode(input: &[&str], expected: Request) {
    assert_eq!(Request::from_words(&words(input)).unwrap(), expected);
}

#[test]
fn attach_carries_a_session_spec() {
    let request = Request::from_words(&words(&["attach", "session.x11", ":0"])).unwrap();
    assert_eq!(
        request,
        Request::Attach { session: ModuleSpec::new("session.x11", [":0"]) }
    );
}

#[test]
fn module_splits_spec_from_command_at_the_separator() {
    let request =
        Request::from_words(&words(&["module", "locker", "--fancy", "--", "wait_exit"])).unwrap();
    assert_eq!(
        request,
        Request::Module {
            spec: ModuleSpec::new("locker", ["--fancy"]),
            command: vec!["wait_exit".to_string()],
        }
    );
}

#[test]
fn module_without_separator_has_an_empty_command() {
    let request = Request::from_words(&words(&["module", "upower"])).unwrap();
    assert_eq!(
        request,
        Request::Module { spec: ModuleSpec::bare("upower"), command: vec![] }
    );
}

#[test]
fn unknown_verbs_are_reported_as_such() {
    let err = Request::from_words(&words(&["frobnicate"])).unwrap_err();
    assert!(matches!(err, ProtocolError::UnknownCommand(v) if v == "frobnicate"));
}

#[parameterized(
    empty = { &[] },
    attach_without_session = { &["attach"] },
    lock_with_garbage = { &["lock", "now"] },
)]
fn malformed_commands_are_rejected(input: &[&str]) {
    assert!(Request::from_words(&words(input)).is_err());
}
