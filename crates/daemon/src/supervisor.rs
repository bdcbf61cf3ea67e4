// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervision of external helper processes.
//!
//! A supervisor owns one child with a piped stdout. A reader task blocks
//! on the pipe; its sole purpose is to be woken by output or EOF so the
//! owning module can observe lines and the child's exit without polling.
//! The reader reports through the event queue, tagged with the child's
//! pid, so a restarted supervisor can recognize and ignore stale
//! notifications.

use std::process::Stdio;
use std::time::Duration;

use shade_core::ModuleSpec;
use shade_engine::{Event, EventSender, ModuleEvent, ModuleError};
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::debug;

/// First-line handshake expected from a helper before it is considered
/// started.
pub enum Handshake {
    None,
    /// The helper must print exactly this line first; anything else
    /// aborts the start.
    Expect(&'static str),
}

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// A supervised helper process.
#[derive(Debug)]
pub struct ChildSupervisor {
    child: Child,
    pub pid: u32,
    stdin: Option<ChildStdin>,
    reader: tokio::task::JoinHandle<()>,
}

impl ChildSupervisor {
    /// Spawn `command`, perform the handshake, and start the reader
    /// task. Each stdout line is forwarded to `spec` as a `HelperLine`
    /// when `forward_lines` is set; EOF always produces `ChildExited`.
    pub async fn spawn(
        mut command: Command,
        spec: ModuleSpec,
        events: EventSender,
        handshake: Handshake,
        forward_lines: bool,
    ) -> Result<Self, ModuleError> {
        command.stdout(Stdio::piped());
        command.kill_on_drop(true);
        let mut child = command.spawn()?;
        let pid = child
            .id()
            .ok_or_else(|| ModuleError::failed("helper exited before it could be observed"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ModuleError::failed("helper has no stdout pipe"))?;
        let stdin = child.stdin.take();
        let mut lines = BufReader::new(stdout).lines();

        if let Handshake::Expect(expected) = handshake {
            let first = tokio::time::timeout(HANDSHAKE_TIMEOUT, lines.next_line()).await;
            match first {
                Ok(Ok(Some(line))) if line == expected => {}
                other => {
                    let _ = child.start_kill();
                    let _ = child.wait().await;
                    return Err(ModuleError::failed(format!(
                        "helper handshake failed: expected {expected:?}, got {other:?}"
                    )));
                }
            }
        }

        let reader = tokio::spawn(read_loop(lines, spec, pid, events, forward_lines));
        Ok(Self { child, pid, stdin, reader })
    }

    /// The child's stdin, when the command was spawned with a pipe.
    pub fn take_stdin(&mut self) -> Option<ChildStdin> {
        self.stdin.take()
    }

    /// Send SIGTERM, wait for the exit, and join the reader.
    pub async fn terminate(mut self) {
        debug!(pid = self.pid, "terminating helper");
        let _ = nix::sys::signal::kill(
            nix::unistd::Pid::from_raw(self.pid as i32),
            nix::sys::signal::Signal::SIGTERM,
        );
        let _ = self.child.wait().await;
        let _ = self.reader.await;
        debug!(pid = self.pid, "helper terminated");
    }
}

async fn read_loop(
    mut lines: Lines<BufReader<ChildStdout>>,
    spec: ModuleSpec,
    pid: u32,
    events: EventSender,
    forward_lines: bool,
) {
    while let Ok(Some(line)) = lines.next_line().await {
        if forward_lines {
            events.send(Event::Module {
                spec: spec.clone(),
                payload: ModuleEvent::HelperLine { line },
            });
        }
    }
    // EOF: all write ends closed, i.e. the child exited.
    events.send(Event::Module { spec, payload: ModuleEvent::ChildExited { pid } });
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
