// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    challenge = { BusPacket::Challenge { challenge: "aa55".into() },
                  r#"{"type":"challenge","challenge":"aa55"}"# },
    hello = { BusPacket::Hello { digest: "00ff".into(), id: "inst-1".into() },
              r#"{"type":"hello","digest":"00ff","id":"inst-1"}"# },
    join = { BusPacket::Join { id: "inst-2".into() },
             r#"{"type":"join","id":"inst-2"}"# },
)]
fn frames_round_trip(packet: BusPacket, json: &str) {
    assert_eq!(serde_json::to_string(&packet).unwrap(), json);
    let back: BusPacket = serde_json::from_str(json).unwrap();
    assert_eq!(back, packet);
}

#[test]
fn message_id_is_omitted_when_unset() {
    let packet = BusPacket::Message {
        id: None,
        message: BusMessage::IdleSince { idle_since: shade_core::IdleSince::At(1_000) },
    };
    let json = serde_json::to_string(&packet).unwrap();
    assert_eq!(
        json,
        r#"{"type":"message","message":{"type":"idle_since","idle_since":1000}}"#
    );

    // The relayed form carries the originating instance id.
    let relayed: BusPacket = serde_json::from_str(
        r#"{"type":"message","id":"inst-1","message":{"type":"lock"}}"#,
    )
    .unwrap();
    assert_eq!(relayed, BusPacket::Message { id: Some("inst-1".into()), message: BusMessage::Lock });
}
