// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control-socket server module.
//!
//! Binds the Unix socket and accepts connections on a worker task. Each
//! connection reads one newline-terminated JSON command, enqueues it to
//! the engine loop, and holds the connection open until the loop has
//! produced the reply bytes, so replies are never truncated by an early
//! close.

use async_trait::async_trait;
use shade_engine::{Event, EventSender, Module, ModuleCx, ModuleError};
use shade_wire::ProtocolError;
use tokio::io::AsyncWriteExt;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::env;

#[derive(Default)]
pub struct ServerModule {
    accept_task: Option<tokio::task::JoinHandle<()>>,
    cancel: Option<CancellationToken>,
}

#[async_trait]
impl Module for ServerModule {
    async fn start(&mut self, cx: &mut ModuleCx<'_>) -> Result<(), ModuleError> {
        let path = &cx.paths.socket_path;

        // Remove a stale socket from an unclean exit.
        match std::fs::remove_file(path) {
            Ok(()) => debug!(path = %path.display(), "removed stale socket"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let listener = UnixListener::bind(path).map_err(|e| {
            ModuleError::failed(format!("failed to bind control socket at {}: {e}", path.display()))
        })?;
        debug!(path = %path.display(), "control socket listening");

        let cancel = CancellationToken::new();
        self.accept_task =
            Some(tokio::spawn(accept_loop(listener, cx.events.clone(), cancel.clone())));
        self.cancel = Some(cancel);
        Ok(())
    }

    async fn stop(&mut self, cx: &mut ModuleCx<'_>) -> Result<(), ModuleError> {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
        if let Some(task) = self.accept_task.take() {
            let _ = task.await;
        }
        let _ = std::fs::remove_file(&cx.paths.socket_path);
        Ok(())
    }
}

async fn accept_loop(listener: UnixListener, events: EventSender, cancel: CancellationToken) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            result = listener.accept() => match result {
                Ok((stream, _)) => {
                    let events = events.clone();
                    tokio::spawn(async move {
                        handle_connection(stream, events).await;
                    });
                }
                Err(e) => error!("accept error on control socket: {}", e),
            }
        }
    }
    debug!("control socket accept loop stopped");
}

async fn handle_connection(stream: UnixStream, events: EventSender) {
    let (reader, mut writer) = stream.into_split();

    let request = match shade_wire::read_request(reader, env::ipc_timeout()).await {
        Ok(request) => request,
        Err(ProtocolError::UnknownCommand(verb)) => {
            warn!(verb, "ignoring unknown daemon command");
            return;
        }
        Err(ProtocolError::ConnectionClosed) => {
            debug!("client disconnected before sending a command");
            return;
        }
        Err(e) => {
            warn!(error = %e, "dropping bad control connection");
            return;
        }
    };

    debug!(?request, "received command");

    // The reply may be deferred arbitrarily long (lock-and-wait), so the
    // connection simply stays open until the loop answers.
    let (reply_tx, reply_rx) = oneshot::channel();
    events.send(Event::Control { request, reply: reply_tx });

    if let Ok(reply) = reply_rx.await {
        if let Err(e) = writer.write_all(&reply).await {
            debug!(error = %e, "client went away before reading the reply");
        }
    }
    // Dropping the writer closes our side and terminates the reply.
}
