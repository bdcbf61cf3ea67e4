// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Display power control, one instance per X11 session.
//!
//! Forces the displays into the configured DPMS state (default `off`)
//! while running. For most modern screens standby, suspend, and off
//! behave identically.

use async_trait::async_trait;
use shade_core::ModuleSpec;
use shade_engine::{split_helper_args, Module, ModuleCx, ModuleError};

pub struct DpmsSessionModule {
    display: String,
    state: String,
}

impl DpmsSessionModule {
    pub fn from_spec(spec: &ModuleSpec) -> Result<Self, ModuleError> {
        let (session, args) = split_helper_args(spec)?;
        let display = session
            .arg(0)
            .ok_or_else(|| ModuleError::failed("dpms needs a display"))?
            .to_string();
        let state = args.first().cloned().unwrap_or_else(|| "off".to_string());
        Ok(Self { display, state })
    }

    async fn xset(&self, args: &[&str]) -> Result<(), ModuleError> {
        let status = tokio::process::Command::new("xset")
            .args(args)
            .env("DISPLAY", &self.display)
            .status()
            .await?;
        if !status.success() {
            return Err(ModuleError::failed(format!("xset {args:?} exited with {status}")));
        }
        Ok(())
    }
}

#[async_trait]
impl Module for DpmsSessionModule {
    async fn start(&mut self, _cx: &mut ModuleCx<'_>) -> Result<(), ModuleError> {
        let state = self.state.clone();
        self.xset(&["dpms", "force", &state]).await
    }

    async fn stop(&mut self, _cx: &mut ModuleCx<'_>) -> Result<(), ModuleError> {
        self.xset(&["dpms", "force", "on"]).await?;
        // Leave DPMS timeouts disabled; this module controls them.
        self.xset(&["-dpms"]).await
    }
}
