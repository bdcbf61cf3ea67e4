// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Module specifications: the immutable identity of a module instance.
//!
//! A spec is a module name plus positional string parameters. Equality is
//! structural, and specs are used as keys in the instance map, so two specs
//! naming the same module with different parameters identify two distinct
//! instances.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt;

use crate::error::UserError;

/// The identity of a module instance: a name selecting an implementation,
/// plus positional parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleSpec {
    name: SmolStr,
    args: Vec<String>,
}

impl ModuleSpec {
    pub fn new(name: impl Into<SmolStr>, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self { name: name.into(), args: args.into_iter().map(Into::into).collect() }
    }

    /// A spec with no parameters.
    pub fn bare(name: impl Into<SmolStr>) -> Self {
        Self { name: name.into(), args: Vec::new() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }

    /// Parse a spec from whitespace-separated words: name first, then args.
    ///
    /// Parameters containing whitespace cannot be expressed in this form;
    /// it exists for the CLI `module` command and session addressing, where
    /// arguments are display names and device paths.
    pub fn parse(input: &str) -> Result<Self, UserError> {
        let mut words = input.split_whitespace();
        let name = words.next().ok_or_else(|| UserError::new("Empty module spec"))?;
        Ok(Self::new(name, words))
    }

    /// Build a spec from pre-split words (e.g. socket command arguments).
    pub fn from_words(words: &[String]) -> Result<Self, UserError> {
        match words.split_first() {
            Some((name, args)) => Ok(Self::new(name.as_str(), args.iter().cloned())),
            None => Err(UserError::new("Empty module spec")),
        }
    }
}

impl fmt::Display for ModuleSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

impl Serialize for ModuleSpec {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ModuleSpec {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[path = "spec_tests.rs"]
mod tests;
