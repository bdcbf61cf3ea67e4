// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Keyboard-layout swap for the lock screen.
//!
//! Saves the current XKB configuration, applies the configured one
//! (typically plain US QWERTY, so the password is typed in the layout
//! it was set in), and restores the saved configuration on stop.

use async_trait::async_trait;
use shade_core::ModuleSpec;
use shade_engine::{Module, ModuleCx, ModuleError};

pub struct XkbmapModule {
    args: Vec<String>,
    saved: Option<Vec<String>>,
}

impl XkbmapModule {
    pub fn from_spec(spec: &ModuleSpec) -> Self {
        Self { args: spec.args().to_vec(), saved: None }
    }
}

async fn setxkbmap(args: &[String]) -> Result<(), ModuleError> {
    let status = tokio::process::Command::new("setxkbmap").args(args).status().await?;
    if !status.success() {
        return Err(ModuleError::failed(format!("setxkbmap exited with {status}")));
    }
    Ok(())
}

/// Turn `setxkbmap -query` output (`rules: evdev` per line) back into
/// `-rules evdev …` arguments.
fn parse_query(output: &str) -> Vec<String> {
    let mut args = Vec::new();
    for line in output.lines() {
        if let Some((key, value)) = line.split_once(':') {
            args.push(format!("-{}", key.trim()));
            args.push(value.trim().to_string());
        }
    }
    args
}

#[async_trait]
impl Module for XkbmapModule {
    async fn start(&mut self, _cx: &mut ModuleCx<'_>) -> Result<(), ModuleError> {
        let output =
            tokio::process::Command::new("setxkbmap").arg("-query").output().await?;
        if !output.status.success() {
            return Err(ModuleError::failed("setxkbmap -query failed"));
        }
        self.saved = Some(parse_query(&String::from_utf8_lossy(&output.stdout)));
        setxkbmap(&self.args).await
    }

    async fn stop(&mut self, _cx: &mut ModuleCx<'_>) -> Result<(), ModuleError> {
        match self.saved.take() {
            Some(saved) => setxkbmap(&saved).await,
            None => Ok(()),
        }
    }
}
