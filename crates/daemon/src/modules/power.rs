// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runs a power action when started.
//!
//! The action should be one of suspend, hibernate, hybrid-sleep,
//! suspend-then-hibernate, or poweroff.

use async_trait::async_trait;
use shade_core::ModuleSpec;
use shade_engine::{Module, ModuleCx, ModuleError};
use tracing::debug;

pub struct PowerModule {
    action: String,
}

impl PowerModule {
    pub fn from_spec(spec: &ModuleSpec) -> Self {
        Self { action: spec.arg(0).unwrap_or("suspend").to_string() }
    }
}

#[async_trait]
impl Module for PowerModule {
    async fn start(&mut self, cx: &mut ModuleCx<'_>) -> Result<(), ModuleError> {
        if cx.core.state.sleeping {
            // The system is already on its way down.
            debug!(action = %self.action, "skipping power action during sleep prepare");
            return Ok(());
        }
        let status =
            tokio::process::Command::new("systemctl").arg(&self.action).status().await?;
        if !status.success() {
            return Err(ModuleError::failed(format!(
                "systemctl {} exited with {status}",
                self.action
            )));
        }
        Ok(())
    }
}
