// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Host for the user's configuration.
//!
//! The configuration is re-evaluated on every reconciliation pass, so
//! its `when` guards and idle thresholds track the live system state.

use std::fmt::Write as _;
use std::path::PathBuf;

use shade_config::{BusDef, Config, Registrations};

/// The currently loaded configuration, if any.
#[derive(Default)]
pub struct Configurator {
    config: Option<Config>,
    path: Option<PathBuf>,
}

impl Configurator {
    pub fn new(loaded: Option<(Config, PathBuf)>) -> Self {
        match loaded {
            Some((config, path)) => Self { config: Some(config), path: Some(path) },
            None => Self::default(),
        }
    }

    /// Swap in a freshly loaded configuration (reload path).
    pub fn replace(&mut self, config: Config, path: PathBuf) {
        self.config = Some(config);
        self.path = Some(path);
    }

    /// Evaluate against the current lock state. With no configuration
    /// loaded this produces no registrations: the daemon keeps running
    /// with core modules only.
    pub fn evaluate(&self, locked: bool) -> Registrations {
        self.config
            .as_ref()
            .map(|c| c.evaluate(locked))
            .unwrap_or_default()
    }

    pub fn bus(&self) -> Option<&BusDef> {
        self.config.as_ref().and_then(|c| c.bus.as_ref())
    }

    pub fn is_loaded(&self) -> bool {
        self.config.is_some()
    }

    /// Status-report section describing the loaded configuration.
    pub fn status(&self, locked: bool) -> String {
        let mut out = String::new();
        match &self.path {
            Some(path) => {
                let _ = writeln!(out, "Configuration: {}", path.display());
            }
            None => {
                let _ = writeln!(out, "Configuration: (none found)");
            }
        }
        let regs = self.evaluate(locked);
        let _ = writeln!(out, "Configured on_start modules:");
        for spec in &regs.on_start {
            let _ = writeln!(out, "- {}", spec);
        }
        let _ = writeln!(out, "Configured on_idle modules:");
        for (threshold, spec) in &regs.on_idle {
            let _ = writeln!(out, "- {} {}", threshold, spec);
        }
        let _ = writeln!(out, "Configured on_lock modules:");
        for spec in &regs.on_lock {
            let _ = writeln!(out, "- {}", spec);
        }
        out
    }
}
