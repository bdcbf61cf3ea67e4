// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Socket client for talking to the daemon.

use std::path::PathBuf;

use anyhow::Result;
use shade_wire::{encode_request, Request};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;

use crate::exit_error::ExitError;

/// The daemon's runtime directory, resolved the same way the daemon
/// resolves it.
pub fn run_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os("SHADE_RUN_DIR") {
        return PathBuf::from(dir);
    }
    if let Some(dir) = dirs::runtime_dir() {
        return dir.join("shade");
    }
    std::env::temp_dir().join(format!("shade-{}", nix::unistd::getuid()))
}

pub fn socket_path() -> PathBuf {
    match std::env::var_os("SHADE_SOCKET") {
        Some(path) => PathBuf::from(path),
        None => run_dir().join("daemon.sock"),
    }
}

pub fn pid_path() -> PathBuf {
    run_dir().join("daemon.pid")
}

pub struct DaemonClient {
    socket_path: PathBuf,
}

impl DaemonClient {
    pub fn new() -> Self {
        Self { socket_path: socket_path() }
    }

    async fn connect(&self) -> Result<UnixStream> {
        UnixStream::connect(&self.socket_path).await.map_err(|e| {
            ExitError::not_running(format!(
                "failed to connect to daemon socket at {} ({e}); is the shade daemon running?",
                self.socket_path.display()
            ))
            .into()
        })
    }

    /// Send a command and read the full reply (the daemon closing its
    /// side terminates it).
    pub async fn query(&self, request: &Request) -> Result<Vec<u8>> {
        let mut stream = self.connect().await?;
        stream.write_all(&encode_request(request)).await?;
        stream.shutdown().await?;
        let mut reply = Vec::new();
        stream.read_to_end(&mut reply).await?;
        Ok(reply)
    }

    /// Send a command without waiting for a reply.
    pub async fn notify(&self, request: &Request) -> Result<()> {
        let mut stream = self.connect().await?;
        stream.write_all(&encode_request(request)).await?;
        Ok(())
    }
}
