// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! UPower monitor supervisor.
//!
//! Runs `upower --monitor`; any output line means the power status
//! changed (AC plugged or unplugged), which is grounds for re-evaluating
//! the configuration.

use async_trait::async_trait;
use shade_core::ModuleSpec;
use shade_engine::{Module, ModuleCx, ModuleError, ModuleEvent};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::supervisor::{ChildSupervisor, Handshake};

pub struct UpowerModule {
    spec: ModuleSpec,
    supervisor: Option<ChildSupervisor>,
}

impl UpowerModule {
    pub fn from_spec(spec: &ModuleSpec) -> Self {
        Self { spec: spec.clone(), supervisor: None }
    }
}

#[async_trait]
impl Module for UpowerModule {
    async fn start(&mut self, cx: &mut ModuleCx<'_>) -> Result<(), ModuleError> {
        if self.supervisor.is_some() {
            return Ok(());
        }
        let mut command = Command::new("upower");
        command.arg("--monitor");
        let supervisor = ChildSupervisor::spawn(
            command,
            self.spec.clone(),
            cx.events.clone(),
            Handshake::None,
            true,
        )
        .await?;
        debug!(pid = supervisor.pid, "started upower monitor");
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
            ModuleEvent::HelperLine { .. } => {
                debug!("power status changed, reconfiguring");
                cx.request_update();
            }
            ModuleEvent::ChildExited { pid } => match &self.supervisor {
                Some(supervisor) if supervisor.pid == pid => {
                    warn!(pid, "upower monitor exited unexpectedly");
                    self.supervisor = None;
                }
                _ => debug!(pid, "ignoring stale upower exit notification"),
            },
            _ => {}
        }
    }
}
