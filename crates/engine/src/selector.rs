// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The selector chain: ordered pure functions building the wanted list.
//!
//! Selectors are keyed by strings with a two-digit priority prefix and
//! invoked in ascending key order. Each reads a consistent snapshot of
//! system state and appends the specs it wants running. Per-session
//! launchers install dynamically keyed selectors at `40-*`; graceful
//! shutdown installs `95-shutdown`, which clears everything the earlier
//! selectors asked for.

use std::collections::BTreeMap;

use indexmap::IndexSet;
use shade_config::Registrations;
use shade_core::{IdleSince, ModuleSpec, SystemState};

use crate::names;

/// Selector chain keys for the fixed selectors.
pub const KEY_CORE: &str = "10-core";
pub const KEY_CONFIG: &str = "20-config";
pub const KEY_SESSIONS: &str = "30-sessions";
pub const KEY_LOCK: &str = "50-lock";
pub const KEY_SHUTDOWN: &str = "95-shutdown";

/// Snapshot handed to selectors for one reconciliation pass.
pub struct SelectCx<'a> {
    pub state: &'a SystemState,
    /// Attached session specs, in attach order.
    pub sessions: &'a IndexSet<ModuleSpec>,
    /// Currently running specs, in start order.
    pub running: &'a [ModuleSpec],
    /// This cycle's configuration registrations.
    pub registrations: &'a Registrations,
    /// Sorted, deduplicated idle thresholds (seconds) for this cycle.
    pub schedule: &'a [u64],
    /// Aggregate idle timestamp over all sessions.
    pub idle: IdleSince,
    /// Timestamp of this pass, epoch milliseconds.
    pub now_ms: u64,
    /// The configuration's bus block, when present.
    pub bus: Option<&'a shade_config::BusDef>,
}

/// A pure function from system state to desired specs.
pub trait Selector: Send {
    fn select(&self, cx: &SelectCx<'_>, wanted: &mut Vec<ModuleSpec>);
}

/// Key-ordered selector chain.
pub type SelectorMap = BTreeMap<String, Box<dyn Selector>>;

/// `10-core`: modules that run whenever the daemon does.
pub struct CoreSelector;

impl Selector for CoreSelector {
    fn select(&self, _cx: &SelectCx<'_>, wanted: &mut Vec<ModuleSpec>) {
        wanted.extend([
            // Receives commands from other processes.
            ModuleSpec::bare(names::SERVER),
            // Receives idle/unidle events from X, per X11 session.
            ModuleSpec::bare(names::XSS),
            // Monitors TTY device timestamps, per TTY session.
            ModuleSpec::bare(names::TTY_IDLE),
        ]);
    }
}

/// `20-config`: apply the user's configuration to the current state.
pub struct ConfigSelector;

impl Selector for ConfigSelector {
    fn select(&self, cx: &SelectCx<'_>, wanted: &mut Vec<ModuleSpec>) {
        // Configure the X screen saver so idle events arrive in time for
        // the earliest hook; past that the scheduler takes over.
        if let Some(first) = cx.schedule.first() {
            wanted.push(ModuleSpec::new(names::XSET, [first.to_string()]));
        }

        if cx.state.locked {
            wanted.extend(cx.registrations.on_lock.iter().cloned());
        }

        // The scheduler only makes sense while idleness is measurable:
        // a wake-lock or an empty schedule suppresses it entirely.
        if cx.idle.is_finite() && !cx.schedule.is_empty() {
            wanted.push(ModuleSpec::new(
                names::TIMER,
                cx.schedule.iter().map(u64::to_string),
            ));
        }

        wanted.extend(cx.registrations.on_start.iter().cloned());

        for (threshold, spec) in &cx.registrations.on_idle {
            if cx.idle.idle_for(cx.now_ms, *threshold) {
                wanted.push(spec.clone());
            }
        }

        // Peer bus, when configured.
        if let Some(bus) = cx.bus {
            if let Some(listen) = &bus.listen {
                wanted.push(ModuleSpec::new(names::BUS_SERVER, [listen.clone()]));
            }
            for addr in &bus.connect {
                wanted.push(ModuleSpec::new(names::REMOTE_SENDER, [addr.clone()]));
            }
            if !bus.connect.is_empty() {
                wanted.push(ModuleSpec::bare(names::REMOTE_RECEIVER));
            }
        }
    }
}

/// `30-sessions`: keep every attached session module running.
pub struct SessionSelector;

impl Selector for SessionSelector {
    fn select(&self, cx: &SelectCx<'_>, wanted: &mut Vec<ModuleSpec>) {
        wanted.extend(cx.sessions.iter().cloned());
    }
}

/// `50-lock`: the lock module stays up while the state is locked, so an
/// explicit lock command and an idle-triggered lock behave identically.
pub struct LockSelector;

impl Selector for LockSelector {
    fn select(&self, cx: &SelectCx<'_>, wanted: &mut Vec<ModuleSpec>) {
        if cx.state.locked {
            wanted.push(ModuleSpec::bare(names::LOCK));
        }
    }
}

/// `95-shutdown`: installed when the daemon is stopping; tears everything
/// down by vetoing the whole wanted list.
pub struct ShutdownSelector;

impl Selector for ShutdownSelector {
    fn select(&self, _cx: &SelectCx<'_>, wanted: &mut Vec<ModuleSpec>) {
        wanted.clear();
    }
}

/// The default chain installed at engine construction.
pub fn default_selectors() -> SelectorMap {
    let mut selectors: SelectorMap = BTreeMap::new();
    selectors.insert(KEY_CORE.into(), Box::new(CoreSelector));
    selectors.insert(KEY_CONFIG.into(), Box::new(ConfigSelector));
    selectors.insert(KEY_SESSIONS.into(), Box::new(SessionSelector));
    selectors.insert(KEY_LOCK.into(), Box::new(LockSelector));
    selectors
}
