// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[test]
fn ordering_places_sentinels_at_the_extremes() {
    assert!(IdleSince::Forever < IdleSince::At(0));
    assert!(IdleSince::At(u64::MAX) < IdleSince::Inhibited);
    assert!(IdleSince::At(1_000) < IdleSince::At(2_000));
}

#[test]
fn max_aggregation_prefers_the_least_idle_session() {
    // One busy session (inhibited) keeps the whole system non-idle.
    let sessions = [IdleSince::At(1_000), IdleSince::Inhibited, IdleSince::Forever];
    let global = sessions.into_iter().max().unwrap();
    assert_eq!(global, IdleSince::Inhibited);

    let sessions = [IdleSince::At(1_000), IdleSince::At(5_000), IdleSince::Forever];
    assert_eq!(sessions.into_iter().max().unwrap(), IdleSince::At(5_000));
}

#[parameterized(
    exactly_at_threshold = { 600_000, 600, true },
    one_ms_short = { 599_999, 600, false },
    well_past = { 900_000, 600, true },
)]
fn threshold_test_is_inclusive(now_ms: u64, threshold_secs: u64, expected: bool) {
    let since = IdleSince::At(0);
    assert_eq!(since.idle_for(now_ms, threshold_secs), expected);
}

#[test]
fn sentinels_short_circuit_the_threshold_test() {
    assert!(!IdleSince::Inhibited.idle_for(u64::MAX, 1));
    assert!(IdleSince::Forever.idle_for(0, u64::MAX / 1000));
    assert_eq!(IdleSince::Inhibited.idle_for_ms(0), None);
    assert_eq!(IdleSince::Forever.idle_for_ms(0), Some(u64::MAX));
}

#[test]
fn idle_duration_saturates_for_future_timestamps() {
    // A timestamp ahead of `now` (clock skew) reads as zero idle time.
    assert_eq!(IdleSince::At(2_000).idle_for_ms(1_000), Some(0));
}

#[parameterized(
    finite = { IdleSince::At(42_000), "42000" },
    forever = { IdleSince::Forever, "\"forever\"" },
    inhibited = { IdleSince::Inhibited, "\"inhibited\"" },
)]
fn serde_round_trip(value: IdleSince, json: &str) {
    assert_eq!(serde_json::to_string(&value).unwrap(), json);
    let back: IdleSince = serde_json::from_str(json).unwrap();
    assert_eq!(back, value);
}

#[test]
fn serde_rejects_unknown_sentinels() {
    assert!(serde_json::from_str::<IdleSince>("\"sometimes\"").is_err());
}
