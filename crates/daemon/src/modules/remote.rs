// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Idle-state sharing across bus peers.
//!
//! The sender broadcasts this instance's aggregate idle timestamp over
//! its bus client whenever a reconciliation observes it change, with a
//! coarse re-send interval as a safety net. The receiver materializes a
//! `session.remote` session
//! per peer instance, so remote activity keeps the local screen awake;
//! peers that leave or a dropped bus connection purge those sessions.

use async_trait::async_trait;
use shade_core::{IdleSince, ModuleSpec};
use shade_engine::{
    names, BusMessage, BusPacket, Event, Module, ModuleCx, ModuleError, ModuleEvent,
};
use tokio_util::sync::CancellationToken;
use tracing::debug;

const SEND_INTERVAL: std::time::Duration = std::time::Duration::from_secs(5);

pub struct RemoteSenderModule {
    spec: ModuleSpec,
    bus_client: ModuleSpec,
    last_sent: Option<IdleSince>,
    tick_task: Option<tokio::task::JoinHandle<()>>,
    cancel: Option<CancellationToken>,
}

impl RemoteSenderModule {
    pub fn from_spec(spec: &ModuleSpec) -> Result<Self, ModuleError> {
        let addr = spec
            .arg(0)
            .ok_or_else(|| ModuleError::failed("remote sender needs a bus address"))?;
        Ok(Self {
            spec: spec.clone(),
            bus_client: ModuleSpec::new(names::BUS_CLIENT, [addr]),
            last_sent: None,
            tick_task: None,
            cancel: None,
        })
    }

    fn push(&mut self, cx: &ModuleCx<'_>, force: bool) {
        if !force && self.last_sent == Some(cx.idle) {
            return;
        }
        debug!(idle = %cx.idle, "sharing idle state with bus peers");
        cx.events.send(Event::Module {
            spec: self.bus_client.clone(),
            payload: ModuleEvent::BusSend(BusMessage::IdleSince { idle_since: cx.idle }),
        });
        self.last_sent = Some(cx.idle);
    }
}

#[async_trait]
impl Module for RemoteSenderModule {
    fn dependencies(&self) -> Vec<ModuleSpec> {
        vec![self.bus_client.clone()]
    }

    async fn start(&mut self, cx: &mut ModuleCx<'_>) -> Result<(), ModuleError> {
        // The timely pushes come from `idle_changed`; the interval only
        // re-offers the current value so a peer that missed a frame
        // converges.
        let cancel = CancellationToken::new();
        let events = cx.events.clone();
        let spec = self.spec.clone();
        let token = cancel.clone();
        self.tick_task = Some(tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => return,
                    _ = tokio::time::sleep(SEND_INTERVAL) => {
                        events.send(Event::Module {
                            spec: spec.clone(),
                            payload: ModuleEvent::Tick,
                        });
                    }
                }
            }
        }));
        self.cancel = Some(cancel);
        Ok(())
    }

    async fn stop(&mut self, _cx: &mut ModuleCx<'_>) -> Result<(), ModuleError> {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
        if let Some(task) = self.tick_task.take() {
            let _ = task.await;
        }
        Ok(())
    }

    async fn handle_event(&mut self, cx: &mut ModuleCx<'_>, event: ModuleEvent) {
        if let ModuleEvent::Tick = event {
            self.push(cx, false);
        }
    }

    fn idle_changed(&mut self, cx: &mut ModuleCx<'_>) {
        self.push(cx, false);
    }

    fn bus_packet(&mut self, cx: &mut ModuleCx<'_>, packet: &BusPacket) {
        if matches!(packet, BusPacket::Welcome { .. } | BusPacket::Join { .. }) {
            self.push(cx, true);
        }
    }
}

/// Materializes remote sessions from bus traffic. One instance serves
/// every connected bus.
#[derive(Default)]
pub struct RemoteReceiverModule;

#[async_trait]
impl Module for RemoteReceiverModule {
    fn bus_packet(&mut self, cx: &mut ModuleCx<'_>, packet: &BusPacket) {
        match packet {
            BusPacket::Message { id: Some(id), .. } => {
                let session = ModuleSpec::new(names::SESSION_REMOTE, [id.as_str()]);
                if !cx.core.sessions.contains(&session) {
                    debug!(instance = %id, "attaching remote session");
                    cx.core.sessions.insert(session);
                    cx.request_update();
                    // Replay so the freshly attached session sees the
                    // message that introduced its peer.
                    cx.events.send(Event::Bus(packet.clone()));
                }
            }
            BusPacket::Leave { id } => {
                let session = ModuleSpec::new(names::SESSION_REMOTE, [id.as_str()]);
                if cx.core.sessions.shift_remove(&session) {
                    debug!(instance = %id, "detaching remote session");
                    cx.request_update();
                }
            }
            BusPacket::Disconnect => {
                let remote: Vec<ModuleSpec> = cx
                    .core
                    .sessions
                    .iter()
                    .filter(|s| s.name() == names::SESSION_REMOTE)
                    .cloned()
                    .collect();
                if !remote.is_empty() {
                    debug!(count = remote.len(), "bus dropped, detaching remote sessions");
                    for session in remote {
                        cx.core.sessions.shift_remove(&session);
                    }
                    cx.request_update();
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
#[path = "remote_tests.rs"]
mod tests;
