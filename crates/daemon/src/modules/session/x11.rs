// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! X11 session module.
//!
//! The idle flag follows the screen-saver events delivered by the xss
//! bridge; it can be off even when the X idle counter is large, because
//! the X screen saver honors inhibitors. The precise idle origin is
//! probed lazily with `xprintidle` and cached until invalidated.

use async_trait::async_trait;
use shade_core::IdleSince;
use shade_engine::{Module, ModuleCx, ModuleError, ModuleEvent};
use tracing::{debug, warn};

pub struct X11Session {
    display: String,
    /// Whether X currently considers the session idle. While this is
    /// false we are guaranteed an event before the first idle hook's
    /// threshold can be reached, so the session reads as non-idle.
    idle: bool,
    cached: IdleSince,
    valid: bool,
}

impl X11Session {
    pub fn new(display: &str) -> Self {
        Self { display: display.to_string(), idle: false, cached: IdleSince::Inhibited, valid: false }
    }
}

#[async_trait]
impl Module for X11Session {
    async fn handle_event(&mut self, cx: &mut ModuleCx<'_>, event: ModuleEvent) {
        if let ModuleEvent::Idle { idle } = event {
            debug!(display = %self.display, idle, "screen-saver edge");
            self.idle = idle;
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

    async fn refresh_idle(&mut self, cx: &mut ModuleCx<'_>) {
        if self.valid {
            return;
        }
        self.cached = if self.idle {
            match probe_idle_ms(&self.display).await {
                Ok(idle_ms) => IdleSince::At(cx.now_ms.saturating_sub(idle_ms)),
                Err(e) => {
                    warn!(display = %self.display, error = %e, "xprintidle probe failed");
                    IdleSince::Inhibited
                }
            }
        } else {
            IdleSince::Inhibited
        };
        self.valid = true;
    }
}

async fn probe_idle_ms(display: &str) -> Result<u64, ModuleError> {
    let output = tokio::process::Command::new("xprintidle")
        .env("DISPLAY", display)
        .output()
        .await?;
    if !output.status.success() {
        return Err(ModuleError::failed(format!("xprintidle exited with {}", output.status)));
    }
    String::from_utf8_lossy(&output.stdout)
        .trim()
        .parse()
        .map_err(|e| ModuleError::failed(format!("bad xprintidle output: {e}")))
}
