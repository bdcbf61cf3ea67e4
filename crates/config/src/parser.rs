// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration parsing and per-cycle evaluation.
//!
//! ```hcl
//! on_start "upower" {}
//!
//! on_idle "fade" {
//!   after  = 540
//!   module = "backlight"
//!   args   = ["-time", "60"]
//!   when   = "unlocked"
//! }
//!
//! on_idle "lock" { after = 600  when = "unlocked" }
//! on_idle "suspend" { after = 15  module = "power"  args = ["suspend"]  when = "locked" }
//!
//! on_lock "dunst" {}
//! on_lock "locker" { args = ["--show-failed-attempts"] }
//!
//! bus {
//!   key     = "shared-secret"
//!   listen  = "0.0.0.0:7878"
//!   connect = ["desktop.lan:7878"]
//! }
//! ```
//!
//! Block labels name the registration; the module defaults to the label
//! and can be overridden with `module` when the same module is registered
//! more than once under one hook.

use indexmap::IndexMap;
use serde::Deserialize;
use thiserror::Error;

use shade_core::ModuleSpec;

/// Errors from loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}: {message}")]
    Parse { path: String, message: String },

    #[error("{path}: on_idle {name:?}: invalid idle time - must be a positive integer")]
    InvalidIdleTime { path: String, name: String },

    #[error("{path}: bus block must set `listen` or `connect`")]
    EmptyBus { path: String },
}

/// Lock-state guard on a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum When {
    Locked,
    Unlocked,
}

impl When {
    fn matches(self, locked: bool) -> bool {
        match self {
            When::Locked => locked,
            When::Unlocked => !locked,
        }
    }
}

/// An `on_start` or `on_lock` registration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HookDef {
    /// Module to run; defaults to the block label.
    #[serde(default)]
    pub module: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub when: Option<When>,
}

/// An `on_idle` registration, gated on an idle threshold in seconds.
#[derive(Debug, Clone, Deserialize)]
pub struct IdleDef {
    pub after: u64,
    #[serde(default)]
    pub module: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub when: Option<When>,
}

/// The optional peer-bus block.
#[derive(Debug, Clone, Deserialize)]
pub struct BusDef {
    /// Shared authentication key.
    pub key: String,
    /// Address to run a bus server on.
    #[serde(default)]
    pub listen: Option<String>,
    /// Bus addresses to connect to.
    #[serde(default)]
    pub connect: Vec<String>,
}

/// A parsed, validated configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub on_start: IndexMap<String, HookDef>,
    #[serde(default)]
    pub on_idle: IndexMap<String, IdleDef>,
    #[serde(default)]
    pub on_lock: IndexMap<String, HookDef>,
    #[serde(default)]
    pub bus: Option<BusDef>,
}

/// The registrations one evaluation of the configuration produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registrations {
    pub on_start: Vec<ModuleSpec>,
    /// `(threshold seconds, spec)`, in declaration order.
    pub on_idle: Vec<(u64, ModuleSpec)>,
    pub on_lock: Vec<ModuleSpec>,
}

impl Config {
    /// Parse and validate configuration source. `path` is used in errors.
    pub fn parse(source: &str, path: &str) -> Result<Self, ConfigError> {
        let config: Config = hcl::from_str(source)
            .map_err(|e| ConfigError::Parse { path: path.to_string(), message: e.to_string() })?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &str) -> Result<(), ConfigError> {
        for (name, def) in &self.on_idle {
            // Zero is the only in-band invalid value: negative and
            // fractional thresholds already fail u64 deserialization.
            if def.after == 0 {
                return Err(ConfigError::InvalidIdleTime {
                    path: path.to_string(),
                    name: name.clone(),
                });
            }
        }
        if let Some(bus) = &self.bus {
            if bus.listen.is_none() && bus.connect.is_empty() {
                return Err(ConfigError::EmptyBus { path: path.to_string() });
            }
        }
        Ok(())
    }

    /// Evaluate the configuration against the current lock state,
    /// producing this cycle's registrations.
    pub fn evaluate(&self, locked: bool) -> Registrations {
        let active = |when: &Option<When>| when.map_or(true, |w| w.matches(locked));

        let hook = |map: &IndexMap<String, HookDef>| {
            map.iter()
                .filter(|(_, def)| active(&def.when))
                .map(|(name, def)| spec_of(name, &def.module, &def.args))
                .collect()
        };

        Registrations {
            on_start: hook(&self.on_start),
            on_idle: self
                .on_idle
                .iter()
                .filter(|(_, def)| active(&def.when))
                .map(|(name, def)| (def.after, spec_of(name, &def.module, &def.args)))
                .collect(),
            on_lock: hook(&self.on_lock),
        }
    }
}

impl Registrations {
    /// The idle thresholds (seconds) active this cycle, sorted and
    /// deduplicated. Crossing any of these requires a wake-up.
    pub fn schedule(&self) -> Vec<u64> {
        let mut schedule: Vec<u64> = self.on_idle.iter().map(|(t, _)| *t).collect();
        schedule.sort_unstable();
        schedule.dedup();
        schedule
    }
}

fn spec_of(label: &str, module: &Option<String>, args: &[String]) -> ModuleSpec {
    let name = module.as_deref().unwrap_or(label);
    ModuleSpec::new(name, args.iter().cloned())
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
