// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Module factories: mapping a spec's name to an implementation.

use std::collections::HashMap;

use shade_core::{ModuleSpec, UserError};
use smol_str::SmolStr;

use crate::module::Module;

type Factory = Box<dyn Fn(&ModuleSpec) -> Result<Box<dyn Module>, UserError> + Send>;

/// Registry of module implementations by name.
#[derive(Default)]
pub struct Registry {
    factories: HashMap<SmolStr, Factory>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory for `name`. The factory receives the full spec
    /// and may reject bad parameters with a `UserError`.
    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&ModuleSpec) -> Result<Box<dyn Module>, UserError> + Send + 'static,
    {
        self.factories.insert(SmolStr::new(name), Box::new(factory));
    }

    /// Instantiate a module for `spec`.
    pub fn build(&self, spec: &ModuleSpec) -> Result<Box<dyn Module>, UserError> {
        let factory = self.factories.get(spec.name()).ok_or_else(|| {
            UserError::new(format!("Module {:?} not found", spec.name()))
        })?;
        factory(spec)
    }

    pub fn knows(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }
}
