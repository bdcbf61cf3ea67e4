// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn system_clock_reads_a_nondecreasing_epoch() {
    let clock = SystemClock;
    let t1 = clock.epoch_ms();
    assert!(t1 > 0);
    assert!(clock.epoch_ms() >= t1);
}

#[test]
fn fake_clock_advances_in_milliseconds() {
    let clock = FakeClock::new();
    let start = clock.epoch_ms();
    clock.advance(Duration::from_secs(60));
    assert_eq!(clock.epoch_ms(), start + 60_000);
}

#[test]
fn fake_clock_clones_share_one_timestamp() {
    let clock1 = FakeClock::new();
    let clock2 = clock1.clone();
    clock2.set_epoch_ms(5_000);
    assert_eq!(clock1.epoch_ms(), 5_000);
    clock1.advance(Duration::from_millis(250));
    assert_eq!(clock2.epoch_ms(), 5_250);
}
