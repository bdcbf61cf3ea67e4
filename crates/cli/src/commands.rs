// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI command implementations.

use std::io::Write as _;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use shade_core::ModuleSpec;
use shade_wire::Request;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::client::{pid_path, DaemonClient};
use crate::exit_error::ExitError;

const START_TIMEOUT: Duration = Duration::from_secs(15);
const STOP_TIMEOUT: Duration = Duration::from_secs(10);

/// Print an opaque daemon reply; replies beginning with `error:` exit
/// non-zero instead.
fn print_reply(reply: &[u8]) -> Result<()> {
    let text = String::from_utf8_lossy(reply);
    if let Some(message) = text.strip_prefix("error:") {
        return Err(ExitError::new(1, message.trim().to_string()).into());
    }
    print!("{text}");
    std::io::stdout().flush()?;
    Ok(())
}

pub async fn simple(request: Request) -> Result<()> {
    let reply = DaemonClient::new().query(&request).await?;
    print_reply(&reply)
}

/// Start the daemon in the background and attach the invoking session.
pub async fn start() -> Result<()> {
    let client = DaemonClient::new();
    if client.query(&Request::Ping).await.is_ok() {
        println!("Daemon already running");
        return Ok(());
    }

    let shaded = find_shaded_binary();
    let mut child = tokio::process::Command::new(&shaded)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::piped())
        .spawn()
        .with_context(|| format!("failed to start {}", shaded.display()))?;

    // The daemon prints READY once its control socket is up.
    let stdout = child.stdout.take().ok_or_else(|| anyhow!("daemon has no stdout"))?;
    let mut lines = BufReader::new(stdout).lines();
    let ready = tokio::time::timeout(START_TIMEOUT, lines.next_line()).await;
    match ready {
        Ok(Ok(Some(line))) if line == "READY" => {}
        _ => return Err(ExitError::new(1, "Daemon start-up failed").into()),
    }
    println!("Daemon started");

    // The daemon process outlives us.
    drop(child);

    if let Some(session) = current_session() {
        attach_or_detach(true, Some(session)).await?;
    }
    Ok(())
}

/// Ask the daemon to stop and wait for the process to exit.
pub async fn stop() -> Result<()> {
    let pid_file = pid_path();
    let pid = std::fs::read_to_string(&pid_file).map_err(|_| {
        ExitError::not_running(format!(
            "PID file {} does not exist - daemon not running?",
            pid_file.display()
        ))
    })?;
    let pid: i32 = pid
        .trim()
        .parse()
        .map_err(|_| ExitError::new(1, format!("malformed PID file {}", pid_file.display())))?;

    let reply = DaemonClient::new().query(&Request::Stop).await?;
    print_reply(&reply)?;

    let pid = nix::unistd::Pid::from_raw(pid);
    let deadline = std::time::Instant::now() + STOP_TIMEOUT;
    while nix::sys::signal::kill(pid, None).is_ok() {
        if std::time::Instant::now() > deadline {
            return Err(ExitError::new(1, format!("daemon (pid {pid}) did not exit")).into());
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    println!("Daemon stopped");
    Ok(())
}

/// Attach or detach a session; defaults to the session this process is
/// running in.
pub async fn attach_or_detach(attach: bool, session: Option<ModuleSpec>) -> Result<()> {
    let session = session
        .or_else(current_session)
        .ok_or_else(|| ExitError::new(1, "No session detected"))?;

    let request = if attach {
        Request::Attach { session: session.clone() }
    } else {
        Request::Detach { session: session.clone() }
    };
    let reply = DaemonClient::new().query(&request).await?;

    if reply == b"ok" {
        println!("{} {}", if attach { "Attached to" } else { "Detached from" }, session);
        Ok(())
    } else {
        Err(ExitError::new(1, String::from_utf8_lossy(&reply).into_owned()).into())
    }
}

/// Route a command to a module instance inside the daemon.
pub async fn module(words: Vec<String>) -> Result<()> {
    let split = words.iter().position(|w| w == "--").unwrap_or(words.len());
    let spec = ModuleSpec::from_words(&words[..split])
        .map_err(|e| ExitError::new(1, e.to_string()))?;
    let command = words.get(split + 1..).unwrap_or_default().to_vec();

    let reply = DaemonClient::new().query(&Request::Module { spec, command }).await?;
    print_reply(&reply)
}

/// The session this process runs in: the X display if one is set,
/// otherwise the controlling terminal.
pub fn current_session() -> Option<ModuleSpec> {
    if let Ok(display) = std::env::var("DISPLAY") {
        if !display.is_empty() {
            return Some(ModuleSpec::new("session.x11", [display]));
        }
    }
    if let Ok(tty) = nix::unistd::ttyname(std::io::stderr()) {
        return Some(ModuleSpec::new("session.tty", [tty.display().to_string()]));
    }
    None
}

/// `shaded` installed next to this binary, falling back to `$PATH`.
fn find_shaded_binary() -> std::path::PathBuf {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let candidate = dir.join("shaded");
            if candidate.exists() {
                return candidate;
            }
        }
    }
    std::path::PathBuf::from("shaded")
}

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;
