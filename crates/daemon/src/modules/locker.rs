// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lock-screen child supervisor.
//!
//! Helper contract (`$SHADE_LIB_DIR/locker`, extra arguments forwarded
//! from the configuration): prints `init` once the screen is actually
//! locked, stays in the foreground, and exits when the user
//! authenticates (or on SIGTERM). Other security modules should be
//! ordered before this one so the machine is secure by the time the
//! lock screen becomes visible.
//!
//! Goals, in order: start the child when the module starts, abort the
//! whole locking action if it fails to initialize, kill it when the
//! module stops, and leave the locked state when it exits by itself.

use async_trait::async_trait;
use shade_core::ModuleSpec;
use shade_engine::{Module, ModuleCx, ModuleError, ModuleEvent};
use tokio::process::Command;
use tracing::{debug, info};

use crate::supervisor::{ChildSupervisor, Handshake};

pub struct LockerModule {
    spec: ModuleSpec,
    args: Vec<String>,
    supervisor: Option<ChildSupervisor>,
}

impl LockerModule {
    pub fn from_spec(spec: &ModuleSpec) -> Self {
        Self { spec: spec.clone(), args: spec.args().to_vec(), supervisor: None }
    }
}

#[async_trait]
impl Module for LockerModule {
    async fn start(&mut self, cx: &mut ModuleCx<'_>) -> Result<(), ModuleError> {
        if self.supervisor.is_some() {
            return Ok(());
        }
        let mut command = Command::new(cx.paths.lib_dir.join("locker"));
        command.args(&self.args);
        let supervisor = ChildSupervisor::spawn(
            command,
            self.spec.clone(),
            cx.events.clone(),
            Handshake::Expect("init"),
            false,
        )
        .await
        .map_err(|e| ModuleError::failed(format!("failed to start the lock screen: {e}")))?;
        debug!(pid = supervisor.pid, "started lock screen");
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
        let ModuleEvent::ChildExited { pid } = event else {
            return;
        };
        match &self.supervisor {
            Some(supervisor) if supervisor.pid == pid => {
                // Clear the handle first so our own stop does not try to
                // kill a process that no longer exists.
                self.supervisor = None;
                info!("lock screen exited, unlocking");
                cx.unlock();
            }
            _ => debug!(pid, "ignoring stale lock screen exit notification"),
        }
    }
}
