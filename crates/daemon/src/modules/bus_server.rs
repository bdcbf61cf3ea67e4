// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Peer-bus server: an authenticated TCP relay.
//!
//! Carries no logic of its own; it admits clients that answer the
//! challenge with a correct `sha256(key ‖ challenge)` digest and passes
//! `message` frames between them, stamping the sender's id. Local
//! consumption happens through a bus client connected to this server
//! like any other peer.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::RngCore;
use sha2::{Digest, Sha256};
use shade_engine::{BusPacket, Module, ModuleCx, ModuleError};
use subtle::ConstantTimeEq;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Admitted clients: instance id → frame sender for its writer task.
type Clients = Arc<Mutex<HashMap<String, mpsc::UnboundedSender<String>>>>;

pub struct BusServerModule {
    addr: String,
    clients: Clients,
    accept_task: Option<tokio::task::JoinHandle<()>>,
    cancel: Option<CancellationToken>,
}

impl BusServerModule {
    pub fn new(addr: &str) -> Self {
        Self {
            addr: addr.to_string(),
            clients: Arc::default(),
            accept_task: None,
            cancel: None,
        }
    }
}

#[async_trait]
impl Module for BusServerModule {
    async fn start(&mut self, cx: &mut ModuleCx<'_>) -> Result<(), ModuleError> {
        let key = bus_key(cx)?;
        let listener = TcpListener::bind(&self.addr)
            .await
            .map_err(|e| ModuleError::failed(format!("failed to bind bus at {}: {e}", self.addr)))?;
        info!(addr = %self.addr, "bus server listening");

        let cancel = CancellationToken::new();
        self.accept_task = Some(tokio::spawn(accept_loop(
            listener,
            self.clients.clone(),
            key,
            cancel.clone(),
        )));
        self.cancel = Some(cancel);
        Ok(())
    }

    async fn stop(&mut self, _cx: &mut ModuleCx<'_>) -> Result<(), ModuleError> {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
        if let Some(task) = self.accept_task.take() {
            let _ = task.await;
        }
        // Dropping the senders ends every client's writer task.
        self.clients.lock().clear();
        Ok(())
    }
}

pub(crate) fn bus_key(cx: &ModuleCx<'_>) -> Result<Vec<u8>, ModuleError> {
    cx.bus
        .map(|bus| bus.key.as_bytes().to_vec())
        .ok_or_else(|| ModuleError::failed("bus key is not configured"))
}

pub(crate) fn challenge_digest(key: &[u8], challenge: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key);
    hasher.update(challenge);
    hex::encode(hasher.finalize())
}

async fn accept_loop(listener: TcpListener, clients: Clients, key: Vec<u8>, cancel: CancellationToken) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            result = listener.accept() => match result {
                Ok((stream, addr)) => {
                    info!(%addr, "accepted bus connection");
                    let clients = clients.clone();
                    let key = key.clone();
                    let cancel = cancel.clone();
                    tokio::spawn(async move {
                        serve_client(stream, clients, key, cancel).await;
                    });
                }
                Err(e) => {
                    error!("error accepting bus connection: {}", e);
                    break;
                }
            }
        }
    }
    debug!("bus accept loop stopped");
}

fn send_frame(tx: &mpsc::UnboundedSender<String>, packet: &BusPacket) {
    if let Ok(frame) = serde_json::to_string(packet) {
        let _ = tx.send(frame);
    }
}

fn broadcast(clients: &Clients, packet: &BusPacket, exclude: Option<&str>) {
    for (id, tx) in clients.lock().iter() {
        if Some(id.as_str()) != exclude {
            send_frame(tx, packet);
        }
    }
}

async fn serve_client(stream: TcpStream, clients: Clients, key: Vec<u8>, cancel: CancellationToken) {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    // Writer task: serializes frames from the relay onto this socket.
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let writer_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if writer.write_all(frame.as_bytes()).await.is_err()
                || writer.write_all(b"\n").await.is_err()
            {
                break;
            }
        }
    });

    let mut challenge = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut challenge);
    send_frame(&tx, &BusPacket::Challenge { challenge: hex::encode(challenge) });

    let mut client_id: Option<String> = None;

    loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => break,
            line = lines.next_line() => match line {
                Ok(Some(line)) => line,
                _ => break,
            },
        };
        let packet: BusPacket = match serde_json::from_str(&line) {
            Ok(packet) => packet,
            Err(e) => {
                warn!(error = %e, "dropping bus client after malformed frame");
                break;
            }
        };

        match packet {
            BusPacket::Hello { digest, id } if client_id.is_none() => {
                let expected = challenge_digest(&key, &challenge);
                let ok: bool = expected.as_bytes().ct_eq(digest.as_bytes()).into();
                if !ok {
                    warn!(id, "bus authentication failed");
                    break;
                }
                {
                    let mut admitted = clients.lock();
                    if admitted.remove(&id).is_some() {
                        warn!(id, "duplicate bus instance id, dropping older connection");
                    }
                    admitted.insert(id.clone(), tx.clone());
                }
                info!(id, "bus client admitted");
                broadcast(&clients, &BusPacket::Join { id: id.clone() }, Some(&id));
                let roster = clients.lock().keys().cloned().collect();
                send_frame(&tx, &BusPacket::Welcome { clients: roster });
                client_id = Some(id);
            }
            BusPacket::Message { message, .. } if client_id.is_some() => {
                let id = client_id.clone();
                broadcast(
                    &clients,
                    &BusPacket::Message { id: id.clone(), message },
                    id.as_deref(),
                );
            }
            other => {
                warn!(?other, "ignoring unexpected bus frame");
            }
        }
    }

    if let Some(id) = client_id {
        clients.lock().remove(&id);
        broadcast(&clients, &BusPacket::Leave { id }, None);
    }
    drop(tx);
    let _ = writer_task.await;
}
