// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! X screen-saver extension configurator.
//!
//! Sets the X screen saver to "activate" at the earliest configured
//! idle threshold so the xss bridge reports the first idle edge on
//! time; later hooks are the scheduler's job. Threshold changes are
//! adopted in place.

use async_trait::async_trait;
use shade_core::ModuleSpec;
use shade_engine::{Module, ModuleCx, ModuleError};
use tracing::{debug, warn};

pub struct XsetModule {
    first_threshold: u64,
}

impl XsetModule {
    pub fn from_spec(spec: &ModuleSpec) -> Result<Self, ModuleError> {
        Ok(Self { first_threshold: parse_threshold(spec.args())? })
    }
}

fn parse_threshold(args: &[String]) -> Result<u64, ModuleError> {
    match args {
        [seconds] => seconds
            .parse()
            .map_err(|e| ModuleError::failed(format!("bad screen-saver threshold: {e}"))),
        _ => Err(ModuleError::failed("screen-saver configurator takes one threshold")),
    }
}

async fn xset(args: &[&str]) -> Result<(), ModuleError> {
    let status = tokio::process::Command::new("xset").args(args).status().await?;
    if !status.success() {
        return Err(ModuleError::failed(format!("xset {args:?} exited with {status}")));
    }
    Ok(())
}

#[async_trait]
impl Module for XsetModule {
    async fn start(&mut self, _cx: &mut ModuleCx<'_>) -> Result<(), ModuleError> {
        debug!(seconds = self.first_threshold, "configuring X screen saver");
        xset(&["s", &self.first_threshold.to_string(), "0"]).await
    }

    async fn stop(&mut self, _cx: &mut ModuleCx<'_>) -> Result<(), ModuleError> {
        xset(&["s", "off"]).await
    }

    async fn reconfigure(&mut self, _cx: &mut ModuleCx<'_>, args: &[String]) -> bool {
        let Ok(threshold) = parse_threshold(args) else {
            return false;
        };
        match xset(&["s", &threshold.to_string(), "0"]).await {
            Ok(()) => {
                debug!(from = self.first_threshold, to = threshold, "screen saver re-armed");
                self.first_threshold = threshold;
                true
            }
            Err(e) => {
                warn!(error = %e, "in-place screen-saver reconfiguration failed");
                false
            }
        }
    }
}
