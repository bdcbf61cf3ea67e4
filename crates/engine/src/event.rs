// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The event queue feeding the engine loop.
//!
//! Every external stimulus — a control-socket command, a helper process
//! line or exit, a timer fire, a signal, a bus packet — is marshalled by
//! its worker task into one queue with a single consumer. Effects on
//! engine state are observed in dequeue order.

use shade_core::ModuleSpec;
use shade_wire::Request;
use tokio::sync::{mpsc, oneshot};

use crate::bus::BusPacket;

/// Channel on which a control connection receives its opaque reply.
pub type ReplyTx = oneshot::Sender<Vec<u8>>;

/// An event delivered to the engine loop.
#[derive(Debug)]
pub enum Event {
    /// A control-socket command. The connection worker holds the other
    /// end of `reply` open until the loop has produced the reply bytes.
    Control { request: Request, reply: ReplyTx },
    /// A payload addressed to one module instance. Dropped with a debug
    /// log when the instance is no longer running (stale notification).
    Module { spec: ModuleSpec, payload: ModuleEvent },
    /// A packet from the peer bus, fanned out to all running modules.
    Bus(BusPacket),
    /// Request a reconciliation pass.
    Update,
    /// Re-read the configuration file and reconcile.
    Reload,
    /// Begin graceful shutdown.
    Stop,
}

/// A payload addressed to a specific module instance.
#[derive(Debug)]
pub enum ModuleEvent {
    /// A supervised child's stdout reached EOF; `pid` is the child the
    /// reader was watching, so restarted supervisors can ignore stale
    /// notifications.
    ChildExited { pid: u32 },
    /// One line from a supervised helper's stdout.
    HelperLine { line: String },
    /// An idle/unidle edge for a session, as reported by the screen-saver
    /// event bridge.
    Idle { idle: bool },
    /// Input activity on a watched TTY device.
    Activity,
    /// The idle scheduler's sleep elapsed. `deadline_ms` identifies the
    /// arming; fires from a superseded arming are ignored.
    TimerFired { deadline_ms: u64 },
    /// A periodic or deferred prod for the module's own bookkeeping,
    /// delivered after any reconciliation already in the queue.
    Tick,
    /// Tell the sleep integration module to let the pending suspend
    /// proceed. Enqueued behind the pre-sleep reconciliation so the
    /// inhibitor is only released once that reconciliation has run.
    InhibitorRelease,
    /// Ask a bus client to transmit a message frame.
    BusSend(crate::bus::BusMessage),
}

/// Thread-safe producer half of the event queue. `send` never blocks.
#[derive(Debug, Clone)]
pub struct EventSender(mpsc::UnboundedSender<Event>);

/// Consumer half, owned by the engine loop.
pub type EventReader = mpsc::UnboundedReceiver<Event>;

impl EventSender {
    pub fn send(&self, event: Event) {
        if self.0.send(event).is_err() {
            tracing::debug!("event loop has exited, dropping event");
        }
    }
}

/// Create the event queue.
pub fn channel() -> (EventSender, EventReader) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSender(tx), rx)
}
