// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Peer-bus client.
//!
//! Maintains a connection to a bus server, answering its challenge and
//! then fanning every received frame onto the engine loop, where
//! running modules inspect it. Reconnects with a short backoff; a drop
//! is surfaced locally as a synthetic `disconnect` frame so remote
//! sessions are purged.

use async_trait::async_trait;
use shade_engine::{
    BusMessage, BusPacket, Event, EventSender, Module, ModuleCx, ModuleError, ModuleEvent,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::bus_server::{bus_key, challenge_digest};

const RECONNECT_DELAY: std::time::Duration = std::time::Duration::from_secs(1);

pub struct BusClientModule {
    addr: String,
    instance_id: String,
    outbox: Option<mpsc::UnboundedSender<String>>,
    task: Option<tokio::task::JoinHandle<()>>,
    cancel: Option<CancellationToken>,
}

impl BusClientModule {
    pub fn new(addr: &str) -> Self {
        Self {
            addr: addr.to_string(),
            instance_id: uuid::Uuid::new_v4().to_string(),
            outbox: None,
            task: None,
            cancel: None,
        }
    }
}

#[async_trait]
impl Module for BusClientModule {
    async fn start(&mut self, cx: &mut ModuleCx<'_>) -> Result<(), ModuleError> {
        let key = bus_key(cx)?;
        let (outbox_tx, outbox_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        self.task = Some(tokio::spawn(connect_loop(
            self.addr.clone(),
            self.instance_id.clone(),
            key,
            cx.events.clone(),
            outbox_rx,
            cancel.clone(),
        )));
        self.outbox = Some(outbox_tx);
        self.cancel = Some(cancel);
        Ok(())
    }

    async fn stop(&mut self, _cx: &mut ModuleCx<'_>) -> Result<(), ModuleError> {
        self.outbox = None;
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
        Ok(())
    }

    async fn handle_event(&mut self, _cx: &mut ModuleCx<'_>, event: ModuleEvent) {
        if let ModuleEvent::BusSend(message) = event {
            self.send_message(message);
        }
    }
}

impl BusClientModule {
    fn send_message(&self, message: BusMessage) {
        let packet = BusPacket::Message { id: None, message };
        let Some(outbox) = &self.outbox else {
            debug!("bus client not started, dropping message");
            return;
        };
        if let Ok(frame) = serde_json::to_string(&packet) {
            let _ = outbox.send(frame);
        }
    }
}

async fn connect_loop(
    addr: String,
    instance_id: String,
    key: Vec<u8>,
    events: EventSender,
    mut outbox: mpsc::UnboundedReceiver<String>,
    cancel: CancellationToken,
) {
    loop {
        match TcpStream::connect(&addr).await {
            Ok(stream) => {
                debug!(addr = %addr, "connected to bus");
                run_connection(stream, &instance_id, &key, &events, &mut outbox, &cancel).await;
                if cancel.is_cancelled() {
                    return;
                }
                events.send(Event::Bus(BusPacket::Disconnect));
            }
            Err(e) => {
                if cancel.is_cancelled() {
                    return;
                }
                warn!(addr = %addr, error = %e, "bus connection failed");
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(RECONNECT_DELAY) => {}
        }
    }
}

async fn run_connection(
    stream: TcpStream,
    instance_id: &str,
    key: &[u8],
    events: &EventSender,
    outbox: &mut mpsc::UnboundedReceiver<String>,
    cancel: &CancellationToken,
) {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,

            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    _ => return,
                };
                let packet: BusPacket = match serde_json::from_str(&line) {
                    Ok(packet) => packet,
                    Err(e) => {
                        warn!(error = %e, "malformed bus frame");
                        return;
                    }
                };
                match packet {
                    BusPacket::Challenge { challenge } => {
                        let Ok(challenge) = hex::decode(&challenge) else {
                            warn!("undecodable bus challenge");
                            return;
                        };
                        let hello = BusPacket::Hello {
                            digest: challenge_digest(key, &challenge),
                            id: instance_id.to_string(),
                        };
                        // Arrays and maps of strings always serialize.
                        let frame = serde_json::to_string(&hello).unwrap_or_default();
                        if writer.write_all(frame.as_bytes()).await.is_err()
                            || writer.write_all(b"\n").await.is_err()
                        {
                            return;
                        }
                    }
                    other => events.send(Event::Bus(other)),
                }
            }

            frame = outbox.recv() => {
                let Some(frame) = frame else { return };
                if writer.write_all(frame.as_bytes()).await.is_err()
                    || writer.write_all(b"\n").await.is_err()
                {
                    return;
                }
            }
        }
    }
}
