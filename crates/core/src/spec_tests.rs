// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::collections::HashMap;
use yare::parameterized;

#[test]
fn display_joins_name_and_args() {
    let spec = ModuleSpec::new("session.x11", [":0"]);
    assert_eq!(spec.to_string(), "session.x11 :0");
    assert_eq!(ModuleSpec::bare("lock").to_string(), "lock");
}

#[parameterized(
    bare = { "lock", "lock", &[] },
    one_arg = { "session.x11 :0", "session.x11", &[":0"] },
    extra_whitespace = { "  timer  60  600 ", "timer", &["60", "600"] },
)]
fn parse_round_trips(input: &str, name: &str, args: &[&str]) {
    let spec = ModuleSpec::parse(input).unwrap();
    assert_eq!(spec.name(), name);
    assert_eq!(spec.args(), args);
}

#[test]
fn parse_rejects_empty_input() {
    assert!(ModuleSpec::parse("   ").is_err());
    assert!(ModuleSpec::from_words(&[]).is_err());
}

#[test]
fn equality_is_structural() {
    let a = ModuleSpec::new("dpms", ["off"]);
    let b = ModuleSpec::new("dpms", ["off"]);
    let c = ModuleSpec::new("dpms", ["standby"]);
    assert_eq!(a, b);
    assert_ne!(a, c);

    let mut map = HashMap::new();
    map.insert(a, 1);
    assert_eq!(map.get(&b), Some(&1));
    assert_eq!(map.get(&c), None);
}

#[test]
fn serde_uses_display_form() {
    let spec = ModuleSpec::new("session.tty", ["/dev/tty2"]);
    let json = serde_json::to_string(&spec).unwrap();
    assert_eq!(json, "\"session.tty /dev/tty2\"");
    let back: ModuleSpec = serde_json::from_str(&json).unwrap();
    assert_eq!(back, spec);
}
