// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Linux TTY session module.
//!
//! Holds the device open for the session's lifetime and uses the
//! device's modification time as the idle origin; the per-session
//! watcher invalidates the cache whenever the device is written.

use std::os::unix::fs::OpenOptionsExt;
use std::time::UNIX_EPOCH;

use async_trait::async_trait;
use shade_core::IdleSince;
use shade_engine::{Module, ModuleCx, ModuleError, ModuleEvent};
use tracing::warn;

pub struct TtySession {
    tty: String,
    // NOTE(lifetime): held to keep the device open for the session's lifetime
    #[allow(dead_code)]
    device: Option<std::fs::File>,
    cached: IdleSince,
    valid: bool,
}

impl TtySession {
    pub fn new(tty: &str) -> Self {
        Self { tty: tty.to_string(), device: None, cached: IdleSince::Inhibited, valid: false }
    }
}

#[async_trait]
impl Module for TtySession {
    async fn start(&mut self, _cx: &mut ModuleCx<'_>) -> Result<(), ModuleError> {
        let device = std::fs::File::options()
            .read(true)
            .write(true)
            .custom_flags(nix::libc::O_NOCTTY)
            .open(&self.tty)?;
        self.device = Some(device);
        Ok(())
    }

    async fn stop(&mut self, _cx: &mut ModuleCx<'_>) -> Result<(), ModuleError> {
        self.device = None;
        Ok(())
    }

    async fn handle_event(&mut self, cx: &mut ModuleCx<'_>, event: ModuleEvent) {
        if let ModuleEvent::Activity = event {
            self.valid = false;
            cx.request_update();
        }
    }

    fn idle_since(&self) -> Option<IdleSince> {
        Some(self.cached)
    }

    fn invalidate(&mut self) {
        self.valid = false;
    }

    async fn refresh_idle(&mut self, _cx: &mut ModuleCx<'_>) {
        if self.valid {
            return;
        }
        self.cached = match std::fs::metadata(&self.tty)
            .and_then(|m| m.modified())
            .map(|t| t.duration_since(UNIX_EPOCH).unwrap_or_default())
        {
            Ok(mtime) => IdleSince::At(mtime.as_millis() as u64),
            Err(e) => {
                warn!(tty = %self.tty, error = %e, "failed to read tty mtime");
                IdleSince::Inhibited
            }
        };
        self.valid = true;
    }
}
