// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Environment knobs for the daemon.

use std::path::PathBuf;
use std::time::Duration;

/// This session's runtime directory. Modules may put state here.
///
/// `SHADE_RUN_DIR` overrides; otherwise `$XDG_RUNTIME_DIR/shade`, with a
/// per-user tmp directory as the last resort.
pub fn run_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os("SHADE_RUN_DIR") {
        return PathBuf::from(dir);
    }
    if let Some(dir) = dirs::runtime_dir() {
        return dir.join("shade");
    }
    std::env::temp_dir().join(format!("shade-{}", nix::unistd::getuid()))
}

/// Control-socket path (`SHADE_SOCKET` overrides).
pub fn socket_path(run_dir: &std::path::Path) -> PathBuf {
    match std::env::var_os("SHADE_SOCKET") {
        Some(path) => PathBuf::from(path),
        None => run_dir.join("daemon.sock"),
    }
}

/// Directory holding the helper binaries (`SHADE_LIB_DIR` overrides).
pub fn lib_dir() -> PathBuf {
    match std::env::var_os("SHADE_LIB_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => PathBuf::from("/usr/lib/shade"),
    }
}

/// How long a connection may take to deliver its command or accept its
/// reply (`SHADE_IPC_TIMEOUT_MS` overrides).
pub fn ipc_timeout() -> Duration {
    std::env::var("SHADE_IPC_TIMEOUT_MS")
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(10))
}
