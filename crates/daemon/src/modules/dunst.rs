// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pauses dunst notifications while the lock screen is up, so nothing
//! pops up on top of it.

use async_trait::async_trait;
use shade_engine::{Module, ModuleCx, ModuleError};

#[derive(Default)]
pub struct DunstModule;

async fn set_paused(paused: bool) -> Result<(), ModuleError> {
    let status = tokio::process::Command::new("dunstctl")
        .args(["set-paused", if paused { "true" } else { "false" }])
        .status()
        .await?;
    if !status.success() {
        return Err(ModuleError::failed(format!("dunstctl exited with {status}")));
    }
    Ok(())
}

#[async_trait]
impl Module for DunstModule {
    async fn start(&mut self, _cx: &mut ModuleCx<'_>) -> Result<(), ModuleError> {
        set_paused(true).await
    }

    async fn stop(&mut self, _cx: &mut ModuleCx<'_>) -> Result<(), ModuleError> {
        set_paused(false).await
    }
}
