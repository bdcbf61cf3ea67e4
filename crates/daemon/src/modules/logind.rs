// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sleep integration: lock reliably before the system suspends.
//!
//! Helper contract (`$SHADE_LIB_DIR/sleepwatch`): subscribes to the
//! login manager's sleep-prepare signal and takes a delay inhibitor,
//! then prints `init`. On the pre-sleep edge it prints `sleep` and holds
//! the inhibitor until it reads `release` on stdin; the OS may then
//! proceed. On resume it re-acquires the inhibitor before printing
//! `resume`. If the inhibitor cannot be acquired it prints `noinhibit`
//! and keeps reporting edges anyway.
//!
//! On `sleep`, the pre-sleep reconciliation (which drives idleness to
//! its maximum and so starts every idle hook, including the lock) runs
//! first; the release is queued behind it so the inhibitor is only let
//! go once the machine is locked.

use async_trait::async_trait;
use shade_core::ModuleSpec;
use shade_engine::{Event, Module, ModuleCx, ModuleError, ModuleEvent};
use tokio::io::AsyncWriteExt;
use tokio::process::{ChildStdin, Command};
use tracing::{debug, info, warn};

use crate::supervisor::{ChildSupervisor, Handshake};

pub struct LogindModule {
    spec: ModuleSpec,
    supervisor: Option<ChildSupervisor>,
    stdin: Option<ChildStdin>,
}

impl LogindModule {
    pub fn from_spec(spec: &ModuleSpec) -> Self {
        Self { spec: spec.clone(), supervisor: None, stdin: None }
    }
}

#[async_trait]
impl Module for LogindModule {
    async fn start(&mut self, cx: &mut ModuleCx<'_>) -> Result<(), ModuleError> {
        if self.supervisor.is_some() {
            return Ok(());
        }
        let mut command = Command::new(cx.paths.lib_dir.join("sleepwatch"));
        command.stdin(std::process::Stdio::piped());
        let mut supervisor = ChildSupervisor::spawn(
            command,
            self.spec.clone(),
            cx.events.clone(),
            Handshake::Expect("init"),
            true,
        )
        .await
        .map_err(|e| ModuleError::failed(format!("failed to start sleep watch: {e}")))?;
        debug!(pid = supervisor.pid, "started sleep watch");
        self.stdin = supervisor.take_stdin();
        self.supervisor = Some(supervisor);
        Ok(())
    }

    async fn stop(&mut self, _cx: &mut ModuleCx<'_>) -> Result<(), ModuleError> {
        self.stdin = None;
        if let Some(supervisor) = self.supervisor.take() {
            supervisor.terminate().await;
        }
        Ok(())
    }

    async fn handle_event(&mut self, cx: &mut ModuleCx<'_>, event: ModuleEvent) {
        match event {
            ModuleEvent::HelperLine { line } => match line.as_str() {
                "sleep" => {
                    info!("system is entering sleep");
                    cx.core.state.sleeping = true;
                    cx.request_update();
                    // Queued behind the reconciliation this requests.
                    cx.events.send(Event::Module {
                        spec: self.spec.clone(),
                        payload: ModuleEvent::InhibitorRelease,
                    });
                }
                "resume" => {
                    info!("system is exiting sleep");
                    cx.core.state.sleeping = false;
                    cx.core.invalidate_requested = true;
                    cx.request_update();
                }
                "noinhibit" => {
                    warn!("could not acquire a sleep inhibitor; locking may race suspend");
                }
                other => warn!(line = other, "unknown line from sleep watch"),
            },
            ModuleEvent::InhibitorRelease => {
                if let Some(stdin) = &mut self.stdin {
                    debug!("releasing sleep inhibitor");
                    if let Err(e) = stdin.write_all(b"release\n").await {
                        warn!(error = %e, "failed to signal inhibitor release");
                    }
                }
            }
            ModuleEvent::ChildExited { pid } => match &self.supervisor {
                Some(supervisor) if supervisor.pid == pid => {
                    warn!(pid, "sleep watch exited unexpectedly");
                    self.supervisor = None;
                    self.stdin = None;
                }
                _ => debug!(pid, "ignoring stale sleep watch exit notification"),
            },
            _ => {}
        }
    }
}
