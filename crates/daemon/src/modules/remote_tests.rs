// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::modules::test_cx::{cx_parts, module_cx, Cx};
use shade_engine::Event;

fn sender() -> RemoteSenderModule {
    RemoteSenderModule::from_spec(&ModuleSpec::parse("remote_sender host:7878").unwrap()).unwrap()
}

fn expect_idle_frame(parts: &mut Cx, expected: IdleSince) {
    match parts.rx.try_recv().unwrap() {
        Event::Module { spec, payload: ModuleEvent::BusSend(message) } => {
            assert_eq!(spec, ModuleSpec::new("bus_client", ["host:7878"]));
            assert_eq!(message, BusMessage::IdleSince { idle_since: expected });
        }
        other => panic!("expected a bus send, got {other:?}"),
    }
}

#[test]
fn pushes_when_the_idle_timestamp_moves() {
    let mut parts = cx_parts();
    let mut module = sender();

    {
        let mut cx = module_cx(&mut parts, 1_000_000, IdleSince::At(500));
        module.idle_changed(&mut cx);
    }
    expect_idle_frame(&mut parts, IdleSince::At(500));

    // The same value again is not re-broadcast.
    {
        let mut cx = module_cx(&mut parts, 1_001_000, IdleSince::At(500));
        module.idle_changed(&mut cx);
    }
    assert!(parts.rx.try_recv().is_err());

    {
        let mut cx = module_cx(&mut parts, 1_002_000, IdleSince::Inhibited);
        module.idle_changed(&mut cx);
    }
    expect_idle_frame(&mut parts, IdleSince::Inhibited);
}

#[test]
fn joining_peers_force_a_resend() {
    let mut parts = cx_parts();
    let mut module = sender();

    {
        let mut cx = module_cx(&mut parts, 1_000_000, IdleSince::At(500));
        module.idle_changed(&mut cx);
    }
    expect_idle_frame(&mut parts, IdleSince::At(500));

    // Nothing changed locally, but the newcomer needs the value.
    {
        let mut cx = module_cx(&mut parts, 1_001_000, IdleSince::At(500));
        module.bus_packet(&mut cx, &BusPacket::Join { id: "peer-2".into() });
    }
    expect_idle_frame(&mut parts, IdleSince::At(500));
}

#[tokio::test]
async fn the_interval_tick_only_resends_changes() {
    let mut parts = cx_parts();
    let mut module = sender();

    {
        let mut cx = module_cx(&mut parts, 1_000_000, IdleSince::At(500));
        module.handle_event(&mut cx, ModuleEvent::Tick).await;
    }
    expect_idle_frame(&mut parts, IdleSince::At(500));

    {
        let mut cx = module_cx(&mut parts, 1_005_000, IdleSince::At(500));
        module.handle_event(&mut cx, ModuleEvent::Tick).await;
    }
    assert!(parts.rx.try_recv().is_err(), "unchanged idle must stay quiet");
}
