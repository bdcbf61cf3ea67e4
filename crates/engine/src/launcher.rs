// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-session module launchers.
//!
//! A launcher is a module whose only effect is to install a selector
//! that fans a helper module out over every running session of one
//! type, with the session's identity prepended to the helper's
//! parameters. Session attach/detach re-runs the selector chain, so the
//! helper set follows session membership with no further bookkeeping.

use async_trait::async_trait;
use shade_core::ModuleSpec;
use smol_str::SmolStr;

use crate::module::{Module, ModuleCx, ModuleError};
use crate::selector::{SelectCx, Selector};

/// A module that runs `per_session_name` once per running session of
/// `session_type`, forwarding `args` after the session's identity.
pub struct PerSessionLauncher {
    per_session_name: SmolStr,
    session_type: SmolStr,
    args: Vec<String>,
    selector_key: String,
}

impl PerSessionLauncher {
    /// `spec` is the launcher's own spec; its args are forwarded to each
    /// helper instance.
    pub fn new(spec: &ModuleSpec, per_session_name: &str, session_type: &str) -> Self {
        // The key embeds the launcher's full spec so two launchers of the
        // same kind with different parameters install distinct selectors.
        let selector_key = format!("40-{}-{}-{}", spec, session_type, per_session_name);
        Self {
            per_session_name: SmolStr::new(per_session_name),
            session_type: SmolStr::new(session_type),
            args: spec.args().to_vec(),
            selector_key,
        }
    }
}

#[async_trait]
impl Module for PerSessionLauncher {
    async fn start(&mut self, cx: &mut ModuleCx<'_>) -> Result<(), ModuleError> {
        cx.core.selectors.insert(
            self.selector_key.clone(),
            Box::new(PerSessionSelector {
                per_session_name: self.per_session_name.clone(),
                session_type: self.session_type.clone(),
                args: self.args.clone(),
            }),
        );
        cx.request_update();
        Ok(())
    }

    async fn stop(&mut self, cx: &mut ModuleCx<'_>) -> Result<(), ModuleError> {
        cx.core.selectors.remove(&self.selector_key);
        cx.request_update();
        Ok(())
    }
}

struct PerSessionSelector {
    per_session_name: SmolStr,
    session_type: SmolStr,
    args: Vec<String>,
}

impl Selector for PerSessionSelector {
    fn select(&self, cx: &SelectCx<'_>, wanted: &mut Vec<ModuleSpec>) {
        for spec in cx.running {
            if spec.name() == self.session_type {
                // Helper spec: session type and identity first, then the
                // launcher's own parameters.
                let args = std::iter::once(spec.name().to_string())
                    .chain(spec.args().iter().cloned())
                    .chain(self.args.iter().cloned());
                wanted.push(ModuleSpec::new(self.per_session_name.as_str(), args));
            }
        }
    }
}

/// Split a per-session helper's args back into the session spec and the
/// user parameters. Session specs carry exactly one argument (a display
/// name, device path, or instance id).
pub fn split_helper_args(spec: &ModuleSpec) -> Result<(ModuleSpec, &[String]), ModuleError> {
    match spec.args() {
        [session_type, session_arg, rest @ ..] => {
            Ok((ModuleSpec::new(session_type.as_str(), [session_arg.clone()]), rest))
        }
        _ => Err(ModuleError::failed(format!(
            "per-session helper {} is missing its session identity",
            spec
        ))),
    }
}
