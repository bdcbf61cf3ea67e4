// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared `ModuleCx` scaffolding for module unit tests.

use shade_core::IdleSince;
use shade_engine::{channel, CxCore, EnginePaths, EventReader, EventSender, ModuleCx};

pub struct Cx {
    pub core: CxCore,
    pub events: EventSender,
    pub rx: EventReader,
    pub paths: EnginePaths,
}

pub fn cx_parts() -> Cx {
    let (events, rx) = channel();
    let paths = EnginePaths {
        run_dir: "/tmp/shade-test".into(),
        lib_dir: "/tmp/shade-test/lib".into(),
        socket_path: "/tmp/shade-test/daemon.sock".into(),
    };
    Cx { core: CxCore::default(), events, rx, paths }
}

pub fn module_cx<'a>(parts: &'a mut Cx, now_ms: u64, idle: IdleSince) -> ModuleCx<'a> {
    ModuleCx {
        core: &mut parts.core,
        events: &parts.events,
        paths: &parts.paths,
        now_ms,
        idle,
        bus: None,
    }
}
