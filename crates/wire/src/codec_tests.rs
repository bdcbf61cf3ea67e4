// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(1);

#[test]
fn encode_produces_a_json_array_line() {
    let line = encode_request(&Request::Lock { wait: true });
    assert_eq!(line, b"[\"lock\",\"wait\"]\n");
}

#[tokio::test]
async fn read_request_decodes_a_line() {
    let request = read_request(&b"[\"ping\"]\n"[..], TIMEOUT).await.unwrap();
    assert_eq!(request, Request::Ping);
}

#[tokio::test]
async fn read_request_rejects_unterminated_input() {
    let err = read_request(&b"[\"ping\"]"[..], TIMEOUT).await.unwrap_err();
    assert!(matches!(err, ProtocolError::ConnectionClosed));
}

#[tokio::test]
async fn read_request_rejects_non_json() {
    let err = read_request(&b"ping\n"[..], TIMEOUT).await.unwrap_err();
    assert!(matches!(err, ProtocolError::Malformed(_)));
}

#[tokio::test]
async fn read_request_times_out_on_a_silent_peer() {
    let (client, _server) = tokio::io::duplex(64);
    let err = read_request(client, Duration::from_millis(10)).await.unwrap_err();
    assert!(matches!(err, ProtocolError::Timeout));
}
