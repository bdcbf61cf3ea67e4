// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle: paths, the PID-file lock, and shutdown cleanup.

use std::fs::File;
use std::io::Write as _;
use std::path::PathBuf;

use fs2::FileExt;
use shade_engine::EnginePaths;
use thiserror::Error;
use tracing::{info, warn};

use crate::env;

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Runtime directory (e.g. `$XDG_RUNTIME_DIR/shade`)
    pub run_dir: PathBuf,
    /// Path to the control socket
    pub socket_path: PathBuf,
    /// Path to the lock/PID file
    pub lock_path: PathBuf,
    /// Path to the daemon log file
    pub log_path: PathBuf,
    /// Directory holding helper binaries
    pub lib_dir: PathBuf,
}

impl Config {
    /// Resolve paths from the environment and create the runtime
    /// directory. Losing the runtime directory is fatal at startup.
    pub fn load() -> Result<Self, LifecycleError> {
        let run_dir = env::run_dir();
        std::fs::create_dir_all(&run_dir)
            .map_err(|e| LifecycleError::RunDir(run_dir.clone(), e))?;

        Ok(Self {
            socket_path: env::socket_path(&run_dir),
            lock_path: run_dir.join("daemon.pid"),
            log_path: run_dir.join("daemon.log"),
            lib_dir: env::lib_dir(),
            run_dir,
        })
    }

    pub fn engine_paths(&self) -> EnginePaths {
        EnginePaths {
            run_dir: self.run_dir.clone(),
            lib_dir: self.lib_dir.clone(),
            socket_path: self.socket_path.clone(),
        }
    }
}

/// Holds the exclusive PID-file lock for the daemon's lifetime.
pub struct DaemonGuard {
    config: Config,
    // NOTE(lifetime): held to maintain the exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
}

impl DaemonGuard {
    /// Acquire the PID file. Fails when another daemon holds it.
    pub fn acquire(config: &Config) -> Result<Self, LifecycleError> {
        let mut lock_file = File::options()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&config.lock_path)?;
        lock_file.try_lock_exclusive().map_err(LifecycleError::LockFailed)?;

        lock_file.set_len(0)?;
        writeln!(lock_file, "{}", std::process::id())?;
        lock_file.flush()?;

        Ok(Self { config: config.clone(), lock_file })
    }

    /// Remove runtime files on clean exit. The socket file is normally
    /// removed by the server module's stop; this sweeps up after a
    /// non-graceful teardown too.
    pub fn shutdown(&self) {
        info!("shutting down daemon");
        for path in [&self.config.lock_path, &self.config.socket_path] {
            if path.exists() {
                if let Err(e) = std::fs::remove_file(path) {
                    warn!(path = %path.display(), error = %e, "failed to remove runtime file");
                }
            }
        }
        info!("daemon shutdown complete");
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("could not create runtime directory {0}: {1}")]
    RunDir(PathBuf, std::io::Error),

    #[error("failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
