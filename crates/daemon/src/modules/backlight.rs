// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Backlight fade, typically registered shortly before the lock hook so
//! the screen dims as a warning.
//!
//! Saves the current brightness, fades to black with the configured
//! `xbacklight` arguments (e.g. `-time 60000 -fps 15`), and restores the
//! saved brightness on stop — any input that resets idleness brings the
//! light back.

use async_trait::async_trait;
use shade_core::ModuleSpec;
use shade_engine::{Module, ModuleCx, ModuleError};
use tracing::debug;

pub struct BacklightModule {
    args: Vec<String>,
    saved: Option<String>,
}

impl BacklightModule {
    pub fn from_spec(spec: &ModuleSpec) -> Self {
        Self { args: spec.args().to_vec(), saved: None }
    }
}

async fn xbacklight(args: &[String]) -> Result<(), ModuleError> {
    let status = tokio::process::Command::new("xbacklight").args(args).status().await?;
    if !status.success() {
        return Err(ModuleError::failed(format!("xbacklight exited with {status}")));
    }
    Ok(())
}

#[async_trait]
impl Module for BacklightModule {
    async fn start(&mut self, _cx: &mut ModuleCx<'_>) -> Result<(), ModuleError> {
        let output = tokio::process::Command::new("xbacklight").arg("-get").output().await?;
        if !output.status.success() {
            return Err(ModuleError::failed("xbacklight -get failed"));
        }
        let current = String::from_utf8_lossy(&output.stdout).trim().to_string();
        debug!(brightness = %current, "fading backlight out");
        self.saved = Some(current);

        let mut args = self.args.clone();
        args.extend(["-set".to_string(), "0".to_string()]);
        xbacklight(&args).await
    }

    async fn stop(&mut self, _cx: &mut ModuleCx<'_>) -> Result<(), ModuleError> {
        match self.saved.take() {
            Some(brightness) => {
                debug!(%brightness, "restoring backlight");
                xbacklight(&["-set".to_string(), brightness]).await
            }
            None => Ok(()),
        }
    }
}
