// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control-command handling on the engine loop.
//!
//! The listener worker only parses and enqueues; this is where commands
//! actually touch the engine. Each branch consumes the connection's
//! reply channel exactly once (or parks it with the unlock waiters).

use shade_core::Clock;
use shade_engine::{Engine, Event, ReplyTx};
use shade_wire::Request;
use tracing::info;

pub async fn handle<C: Clock>(engine: &mut Engine<C>, request: Request, reply: ReplyTx) {
    match request {
        Request::Ping => {
            let _ = reply.send(b"pong\n".to_vec());
        }

        Request::Status => {
            let _ = reply.send(engine.status_report().into_bytes());
        }

        Request::Stop => {
            // Reply first; shutdown is driven by the loop so the daemon
            // drains cleanly instead of dying inside a handler.
            let _ = reply.send(b"stopping\n".to_vec());
            engine.events().send(Event::Stop);
        }

        Request::Reload => {
            let _ = reply.send(match engine.reload().await {
                Ok(()) => b"reloaded\n".to_vec(),
                Err(e) => format!("error: {e}\n").into_bytes(),
            });
        }

        Request::Lock { wait } => {
            info!("locking the screen due to user request");
            match engine.lock_now().await {
                Ok(locked_now) => {
                    if wait {
                        // Parked until the next unlock notifies it.
                        engine.core.unlock_waiters.push(reply);
                    } else if locked_now {
                        let _ = reply.send(b"Locked.\n".to_vec());
                    } else {
                        let _ = reply.send(b"Already locked.\n".to_vec());
                    }
                }
                Err(e) => {
                    let _ = reply.send(format!("error: {e}\n").into_bytes());
                }
            }
        }

        Request::Unlock => {
            info!("unlocking the screen due to user request");
            let _ = reply.send(match engine.unlock_now().await {
                Ok(true) => b"Unlocked.\n".to_vec(),
                Ok(false) => b"Already unlocked.\n".to_vec(),
                Err(e) => format!("error: {e}\n").into_bytes(),
            });
        }

        Request::Attach { session } => {
            let _ = reply.send(match engine.attach(session).await {
                Ok(()) => b"ok".to_vec(),
                Err(e) => e.to_string().into_bytes(),
            });
        }

        Request::Detach { session } => {
            let _ = reply.send(match engine.detach(&session).await {
                Ok(()) => b"ok".to_vec(),
                Err(e) => e.to_string().into_bytes(),
            });
        }

        Request::Module { spec, command } => {
            let _ = reply.send(match engine.module_command(&spec, &command).await {
                Ok(bytes) => bytes,
                Err(e) => format!("error: {e}\n").into_bytes(),
            });
        }
    }
}

#[cfg(test)]
#[path = "control_tests.rs"]
mod tests;
