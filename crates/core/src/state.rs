// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dynamic system state consulted by module selectors.

use std::fmt;

/// The state of the system that module selection depends on.
///
/// Only the engine loop mutates this. The lock state is edge-triggered:
/// it changes when the lock module starts or stops, or when an explicit
/// lock/unlock command arrives, rather than being enforced continuously.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SystemState {
    /// Whether the lock screen should be active right now.
    pub locked: bool,
    /// Whether the system is between sleep-prepare and resume.
    pub sleeping: bool,
}

impl fmt::Display for SystemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "locked: {}, sleeping: {}", self.locked, self.sleeping)
    }
}
