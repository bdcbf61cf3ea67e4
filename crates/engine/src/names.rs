// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Well-known module names shared between the selector chain and the
//! builtin module implementations.

/// Control-socket server.
pub const SERVER: &str = "server";
/// X screen-saver event bridge launcher.
pub const XSS: &str = "xss";
/// Per-X11-session bridge helper.
pub const XSS_SESSION: &str = "xss.session";
/// TTY activity monitor launcher.
pub const TTY_IDLE: &str = "tty_idle";
/// Per-TTY-session watcher.
pub const TTY_IDLE_SESSION: &str = "tty_idle.session";
/// X screen-saver extension configurator.
pub const XSET: &str = "xset";
/// Idle scheduler.
pub const TIMER: &str = "timer";
/// Lock-state edge trigger.
pub const LOCK: &str = "lock";
/// X11 session.
pub const SESSION_X11: &str = "session.x11";
/// TTY session.
pub const SESSION_TTY: &str = "session.tty";
/// Remote (bus-fed) session.
pub const SESSION_REMOTE: &str = "session.remote";
/// Peer-bus server and client.
pub const BUS_SERVER: &str = "bus_server";
pub const BUS_CLIENT: &str = "bus_client";
/// Idle-state sharing over the bus.
pub const REMOTE_SENDER: &str = "remote_sender";
pub const REMOTE_RECEIVER: &str = "remote_receiver";
