// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration file discovery.

use std::path::PathBuf;

use crate::parser::{Config, ConfigError};

const CONFIG_FILE: &str = "shade/config.hcl";

/// Candidate configuration paths, most specific first:
/// `$XDG_CONFIG_HOME/shade/config.hcl`, then each entry of
/// `$XDG_CONFIG_DIRS` (default `/etc`).
pub fn search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Some(home) = std::env::var_os("XDG_CONFIG_HOME") {
        paths.push(PathBuf::from(home).join(CONFIG_FILE));
    } else if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join(CONFIG_FILE));
    }

    let config_dirs = std::env::var("XDG_CONFIG_DIRS").unwrap_or_else(|_| "/etc".to_string());
    for dir in config_dirs.split(':').filter(|d| !d.is_empty()) {
        paths.push(PathBuf::from(dir).join(CONFIG_FILE));
    }

    paths
}

/// Load the first configuration file found on the search path.
///
/// Returns `Ok(None)` when no file exists; the caller warns and continues
/// with an empty configuration.
pub fn find_config() -> Result<Option<(Config, PathBuf)>, ConfigError> {
    for path in search_paths() {
        if !path.exists() {
            continue;
        }
        tracing::debug!(path = %path.display(), "loading configuration");
        let source = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Config::parse(&source, &path.display().to_string())?;
        return Ok(Some((config, path)));
    }
    Ok(None)
}
