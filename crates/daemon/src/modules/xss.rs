// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-session supervisor for the X screen-saver event bridge.
//!
//! Helper contract (`$SHADE_LIB_DIR/xss`, run with `DISPLAY` set):
//! prints `init` once it has subscribed to screen-saver events, then one
//! `notify <on|off> <kind> <forced>` line per state change. It exits on
//! SIGTERM or when its display goes away.

use async_trait::async_trait;
use shade_core::ModuleSpec;
use shade_engine::{split_helper_args, Event, Module, ModuleCx, ModuleError, ModuleEvent};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::supervisor::{ChildSupervisor, Handshake};

pub struct XssBridge {
    spec: ModuleSpec,
    session: ModuleSpec,
    display: String,
    supervisor: Option<ChildSupervisor>,
}

impl XssBridge {
    pub fn from_spec(spec: &ModuleSpec) -> Result<Self, ModuleError> {
        let (session, _) = split_helper_args(spec)?;
        let display = session
            .arg(0)
            .ok_or_else(|| ModuleError::failed("xss bridge needs a display"))?
            .to_string();
        Ok(Self { spec: spec.clone(), session, display, supervisor: None })
    }
}

#[async_trait]
impl Module for XssBridge {
    async fn start(&mut self, cx: &mut ModuleCx<'_>) -> Result<(), ModuleError> {
        if self.supervisor.is_some() {
            return Ok(());
        }
        let mut command = Command::new(cx.paths.lib_dir.join("xss"));
        command.env("DISPLAY", &self.display);
        let supervisor = ChildSupervisor::spawn(
            command,
            self.spec.clone(),
            cx.events.clone(),
            Handshake::Expect("init"),
            true,
        )
        .await
        .map_err(|e| ModuleError::failed(format!("failed to start xss: {e}")))?;
        debug!(display = %self.display, pid = supervisor.pid, "started xss");
        self.supervisor = Some(supervisor);
        Ok(())
    }

    async fn stop(&mut self, _cx: &mut ModuleCx<'_>) -> Result<(), ModuleError> {
        if let Some(supervisor) = self.supervisor.take() {
            supervisor.terminate().await;
        }
        Ok(())
    }

    async fn handle_event(&mut self, cx: &mut ModuleCx<'_>, event: ModuleEvent) {
        match event {
            ModuleEvent::HelperLine { line } => {
                let words: Vec<&str> = line.split_whitespace().collect();
                match words.as_slice() {
                    ["notify", state, _kind, _forced] => {
                        cx.events.send(Event::Module {
                            spec: self.session.clone(),
                            payload: ModuleEvent::Idle { idle: *state != "off" },
                        });
                    }
                    _ => warn!(display = %self.display, line, "unknown line from xss"),
                }
            }
            ModuleEvent::ChildExited { pid } => {
                match &self.supervisor {
                    Some(supervisor) if supervisor.pid == pid => {
                        warn!(display = %self.display, pid, "xss exited unexpectedly");
                        self.supervisor = None;
                    }
                    _ => debug!(pid, "ignoring stale xss exit notification"),
                }
            }
            _ => {}
        }
    }
}
