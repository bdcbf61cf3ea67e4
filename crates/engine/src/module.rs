// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The module capability trait and the engine handle passed to modules.
//!
//! A module is a named, parameterized, startable/stoppable unit. The
//! engine owns every instance; modules never hold a reference back to
//! the engine. Instead, each callback receives a [`ModuleCx`] exposing
//! exactly what a module may do: enqueue events, read and flip system
//! state, install selectors, and mutate the attached-session set.

use std::path::PathBuf;

use async_trait::async_trait;
use indexmap::IndexSet;
use shade_core::{IdleSince, ModuleSpec, SystemState};
use thiserror::Error;

use crate::bus::BusPacket;
use crate::event::{EventSender, ModuleEvent, ReplyTx};
use crate::selector::SelectorMap;

/// Errors from module callbacks.
#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("{0}")]
    Failed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("module does not handle socket commands")]
    UnsupportedCommand,
}

impl ModuleError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Filesystem context shared with modules.
#[derive(Debug, Clone)]
pub struct EnginePaths {
    /// Runtime directory; modules may put state here.
    pub run_dir: PathBuf,
    /// Directory holding the helper binaries (xss bridge, sleep watch).
    pub lib_dir: PathBuf,
    /// Control-socket path.
    pub socket_path: PathBuf,
}

/// The engine state modules are allowed to touch, grouped so the engine
/// can lend it out while its instance map stays under engine control.
#[derive(Default)]
pub struct CxCore {
    pub state: SystemState,
    /// Attached session specs, in attach order.
    pub sessions: IndexSet<ModuleSpec>,
    pub selectors: SelectorMap,
    /// Control connections blocked on the next unlock.
    pub unlock_waiters: Vec<ReplyTx>,
    /// Set when every session's idle cache must be dropped before the
    /// next measurement.
    pub invalidate_requested: bool,
    /// Set when a reconciliation should follow the current callback.
    pub update_requested: bool,
}

/// Engine handle passed to every module callback.
pub struct ModuleCx<'a> {
    pub core: &'a mut CxCore,
    pub events: &'a EventSender,
    pub paths: &'a EnginePaths,
    /// Consistent timestamp for this callback, epoch milliseconds.
    pub now_ms: u64,
    /// Aggregate idle timestamp over all sessions, as of this callback.
    pub idle: IdleSince,
    /// The configuration's bus block, when one is present.
    pub bus: Option<&'a shade_config::BusDef>,
}

impl ModuleCx<'_> {
    /// Schedule a reconciliation for when the current callback returns.
    pub fn request_update(&mut self) {
        self.core.update_requested = true;
    }

    /// Edge-trigger the locked state on.
    pub fn lock(&mut self) {
        self.core.state.locked = true;
        self.core.update_requested = true;
    }

    /// Edge-trigger the locked state off: invalidate all session idle
    /// caches (so the unlock does not immediately re-lock) and release
    /// anyone waiting for the unlock.
    pub fn unlock(&mut self) {
        self.core.state.locked = false;
        self.core.invalidate_requested = true;
        self.core.update_requested = true;
        for waiter in self.core.unlock_waiters.drain(..) {
            let _ = waiter.send(b"unlocked\n".to_vec());
        }
    }
}

/// The capability set module instances implement.
///
/// `start` is called at most once per instance, followed by exactly one
/// `stop` (and only if `start` succeeded). All callbacks run on the
/// engine loop; anything long-running must be delegated to a worker task
/// that reports back through `cx.events`.
#[async_trait]
pub trait Module: Send {
    async fn start(&mut self, _cx: &mut ModuleCx<'_>) -> Result<(), ModuleError> {
        Ok(())
    }

    async fn stop(&mut self, _cx: &mut ModuleCx<'_>) -> Result<(), ModuleError> {
        Ok(())
    }

    /// Adopt new parameters in place instead of a stop/start cycle.
    /// Returning `true` means this instance now corresponds to `args`.
    async fn reconfigure(&mut self, _cx: &mut ModuleCx<'_>, _args: &[String]) -> bool {
        false
    }

    /// Specs that must be running (and started) before this module.
    fn dependencies(&self) -> Vec<ModuleSpec> {
        Vec::new()
    }

    /// Handle an event addressed to this instance.
    async fn handle_event(&mut self, _cx: &mut ModuleCx<'_>, _event: ModuleEvent) {}

    /// Handle a `module` command received over the control socket.
    async fn socket_command(
        &mut self,
        _cx: &mut ModuleCx<'_>,
        _args: &[String],
    ) -> Result<Vec<u8>, ModuleError> {
        Err(ModuleError::UnsupportedCommand)
    }

    /// Inspect a packet received from the peer bus.
    fn bus_packet(&mut self, _cx: &mut ModuleCx<'_>, _packet: &BusPacket) {}

    /// The aggregate idle timestamp moved. Delivered to every running
    /// module after the reconciliation that observed the change.
    fn idle_changed(&mut self, _cx: &mut ModuleCx<'_>) {}

    // Session capabilities. Modules representing an attached user session
    // return `Some` from `idle_since`; everything else keeps the defaults.

    /// This session's cached idle timestamp.
    fn idle_since(&self) -> Option<IdleSince> {
        None
    }

    /// Drop the cached idle measurement; the next refresh reacquires
    /// ground truth.
    fn invalidate(&mut self) {}

    /// Reacquire the idle measurement if the cache was invalidated.
    async fn refresh_idle(&mut self, _cx: &mut ModuleCx<'_>) {}
}
