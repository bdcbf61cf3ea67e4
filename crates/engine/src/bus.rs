// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Peer-bus frame types.
//!
//! Frames are newline-terminated JSON objects tagged by `type`. The
//! server greets every connection with a `challenge`; the client must
//! answer with a `hello` carrying `sha256(key ‖ challenge)` before any
//! other frame is accepted. Admitted clients exchange `message` frames,
//! which the server relays to every other client with the sender's id
//! filled in.

use serde::{Deserialize, Serialize};
use shade_core::IdleSince;

/// One frame on the bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BusPacket {
    /// Server → client: authentication nonce, hex-encoded.
    Challenge { challenge: String },
    /// Client → server: `sha256(key ‖ challenge)` hex digest plus the
    /// client's instance id.
    Hello { digest: String, id: String },
    /// Server → client: admission confirmation with the ids present.
    Welcome { clients: Vec<String> },
    /// Server → clients: a peer was admitted.
    Join { id: String },
    /// Server → clients: a peer disconnected.
    Leave { id: String },
    /// Application payload. `id` names the originating instance when
    /// relayed by the server; clients send it unset.
    Message {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        message: BusMessage,
    },
    /// Synthetic local frame: this instance's bus connection dropped.
    /// Never sent on the wire.
    Disconnect,
}

/// Application payloads relayed between instances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BusMessage {
    /// The sender's aggregate idle timestamp.
    IdleSince { idle_since: IdleSince },
    /// Ask peers to lock.
    Lock,
    /// Ask peers to unlock.
    Unlock,
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
