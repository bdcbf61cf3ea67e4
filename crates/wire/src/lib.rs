// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! shade-wire: control-socket protocol.
//!
//! Wire format: one newline-terminated JSON array of strings per
//! connection, the command verb first. Replies are opaque bytes,
//! terminated by the server closing its write side.

mod request;
mod codec;

pub use codec::{encode_request, read_request, ProtocolError, MAX_REQUEST_LEN};
pub use request::Request;
