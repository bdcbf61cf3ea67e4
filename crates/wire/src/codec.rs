// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Line codec for the control socket.

use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};

use crate::request::Request;

/// Upper bound on an encoded request line, in bytes.
pub const MAX_REQUEST_LEN: usize = 64 * 1024;

/// Errors from reading or decoding a request.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("connection closed before a full command line arrived")]
    ConnectionClosed,

    #[error("timed out waiting for a command")]
    Timeout,

    #[error("malformed command: {0}")]
    Malformed(String),

    #[error("unknown command: {0:?}")]
    UnknownCommand(String),
}

/// Encode a request as its newline-terminated JSON-array line.
pub fn encode_request(request: &Request) -> Vec<u8> {
    // Arrays of strings never fail to serialize.
    let mut line = serde_json::to_vec(&request.to_words()).unwrap_or_default();
    line.push(b'\n');
    line
}

/// Decode one JSON-array line into a request.
pub fn decode_line(line: &str) -> Result<Request, ProtocolError> {
    let words: Vec<String> = serde_json::from_str(line.trim_end())
        .map_err(|e| ProtocolError::Malformed(e.to_string()))?;
    Request::from_words(&words)
}

/// Read one newline-terminated request from `reader`, within `timeout`.
pub async fn read_request<R>(reader: R, timeout: Duration) -> Result<Request, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut line = String::new();
    let mut reader = BufReader::new(reader).take(MAX_REQUEST_LEN as u64);

    let read = tokio::time::timeout(timeout, reader.read_line(&mut line))
        .await
        .map_err(|_| ProtocolError::Timeout)??;
    if read == 0 || !line.ends_with('\n') {
        return Err(ProtocolError::ConnectionClosed);
    }

    decode_line(&line)
}

#[cfg(test)]
#[path = "codec_tests.rs"]
mod tests;

#[cfg(test)]
#[path = "property_tests.rs"]
mod property_tests;
