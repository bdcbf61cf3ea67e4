// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote session: another shade instance seen over the peer bus.
//!
//! Its idle timestamp arrives in `idle_since` messages, so the remote
//! user's activity participates in the local idle decision. A remote may
//! also ask us to lock or unlock.

use async_trait::async_trait;
use shade_core::IdleSince;
use shade_engine::{BusMessage, BusPacket, Module, ModuleCx};
use tracing::info;

pub struct RemoteSession {
    instance_id: String,
    idle: IdleSince,
}

impl RemoteSession {
    pub fn new(instance_id: &str) -> Self {
        Self { instance_id: instance_id.to_string(), idle: IdleSince::Inhibited }
    }
}

#[async_trait]
impl Module for RemoteSession {
    fn idle_since(&self) -> Option<IdleSince> {
        Some(self.idle)
    }

    fn bus_packet(&mut self, cx: &mut ModuleCx<'_>, packet: &BusPacket) {
        let BusPacket::Message { id: Some(id), message } = packet else {
            return;
        };
        if *id != self.instance_id {
            return;
        }
        match message {
            BusMessage::IdleSince { idle_since } => {
                self.idle = *idle_since;
                cx.request_update();
            }
            BusMessage::Lock if !cx.core.state.locked => {
                info!(instance = %self.instance_id, "locking on behalf of remote instance");
                cx.lock();
            }
            BusMessage::Unlock if cx.core.state.locked => {
                info!(instance = %self.instance_id, "unlocking on behalf of remote instance");
                cx.unlock();
            }
            _ => {}
        }
    }
}
