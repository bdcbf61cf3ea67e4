// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-session TTY activity watcher.
//!
//! Watches the session's device node for modification so the engine
//! hears about input without polling; the event just invalidates the
//! session's idle cache and triggers a reconciliation.

use async_trait::async_trait;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use shade_core::ModuleSpec;
use shade_engine::{split_helper_args, Event, Module, ModuleCx, ModuleError, ModuleEvent};
use tracing::debug;

pub struct TtyWatch {
    session: ModuleSpec,
    tty: String,
    watcher: Option<RecommendedWatcher>,
}

impl TtyWatch {
    pub fn from_spec(spec: &ModuleSpec) -> Result<Self, ModuleError> {
        let (session, _) = split_helper_args(spec)?;
        let tty = session
            .arg(0)
            .ok_or_else(|| ModuleError::failed("tty watcher needs a device path"))?
            .to_string();
        Ok(Self { session, tty, watcher: None })
    }
}

#[async_trait]
impl Module for TtyWatch {
    async fn start(&mut self, cx: &mut ModuleCx<'_>) -> Result<(), ModuleError> {
        let events = cx.events.clone();
        let session = self.session.clone();
        let mut watcher =
            notify::recommended_watcher(move |result: Result<notify::Event, notify::Error>| {
                // Runs on the watcher's own thread; only enqueues.
                if let Ok(event) = result {
                    if event.kind.is_modify() {
                        events.send(Event::Module {
                            spec: session.clone(),
                            payload: ModuleEvent::Activity,
                        });
                    }
                }
            })
            .map_err(|e| ModuleError::failed(format!("failed to create tty watcher: {e}")))?;
        watcher
            .watch(std::path::Path::new(&self.tty), RecursiveMode::NonRecursive)
            .map_err(|e| ModuleError::failed(format!("failed to watch {}: {e}", self.tty)))?;
        debug!(tty = %self.tty, "watching tty for activity");
        self.watcher = Some(watcher);
        Ok(())
    }

    async fn stop(&mut self, _cx: &mut ModuleCx<'_>) -> Result<(), ModuleError> {
        self.watcher = None;
        Ok(())
    }
}
