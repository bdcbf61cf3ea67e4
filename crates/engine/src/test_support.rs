// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake modules and an engine harness for reconciliation tests.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use shade_config::Config;
use shade_core::{FakeClock, IdleSince, ModuleSpec};

use crate::configurator::Configurator;
use crate::engine::Engine;
use crate::event::{channel, EventReader};
use crate::launcher::PerSessionLauncher;
use crate::lock::LockModule;
use crate::module::{EnginePaths, Module, ModuleCx, ModuleError};
use crate::names;
use crate::registry::Registry;

/// One observed lifecycle action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Start(ModuleSpec),
    Stop(ModuleSpec),
    Reconfigure(ModuleSpec, Vec<String>),
    Invalidate(ModuleSpec),
    IdleChanged(ModuleSpec),
}

/// Shared recorder for lifecycle actions across all fake modules.
#[derive(Clone, Default)]
pub struct ActionLog(Arc<Mutex<Vec<Action>>>);

impl ActionLog {
    pub fn record(&self, action: Action) {
        self.0.lock().push(action);
    }

    /// Drain and return everything recorded so far.
    pub fn take(&self) -> Vec<Action> {
        std::mem::take(&mut *self.0.lock())
    }
}

/// A module that records its lifecycle and optionally misbehaves.
pub struct FakeModule {
    spec: ModuleSpec,
    log: ActionLog,
    reconfigurable: bool,
    fail_start: bool,
    fail_stop: bool,
    dependencies: Vec<ModuleSpec>,
}

#[async_trait]
impl Module for FakeModule {
    async fn start(&mut self, _cx: &mut ModuleCx<'_>) -> Result<(), ModuleError> {
        self.log.record(Action::Start(self.spec.clone()));
        if self.fail_start {
            return Err(ModuleError::failed("refusing to start"));
        }
        Ok(())
    }

    async fn stop(&mut self, _cx: &mut ModuleCx<'_>) -> Result<(), ModuleError> {
        self.log.record(Action::Stop(self.spec.clone()));
        if self.fail_stop {
            return Err(ModuleError::failed("refusing to stop"));
        }
        Ok(())
    }

    async fn reconfigure(&mut self, _cx: &mut ModuleCx<'_>, args: &[String]) -> bool {
        if !self.reconfigurable {
            return false;
        }
        self.log.record(Action::Reconfigure(self.spec.clone(), args.to_vec()));
        self.spec = ModuleSpec::new(self.spec.name(), args.iter().cloned());
        true
    }

    fn dependencies(&self) -> Vec<ModuleSpec> {
        self.dependencies.clone()
    }

    fn idle_changed(&mut self, _cx: &mut ModuleCx<'_>) {
        self.log.record(Action::IdleChanged(self.spec.clone()));
    }
}

/// Ground-truth idle values, keyed by session spec.
pub type IdleTruth = Arc<Mutex<HashMap<ModuleSpec, IdleSince>>>;

/// A session module whose idle measurement comes from shared ground
/// truth, reacquired only after invalidation.
pub struct FakeSession {
    spec: ModuleSpec,
    log: ActionLog,
    truth: IdleTruth,
    cached: IdleSince,
    valid: bool,
}

#[async_trait]
impl Module for FakeSession {
    async fn start(&mut self, _cx: &mut ModuleCx<'_>) -> Result<(), ModuleError> {
        self.log.record(Action::Start(self.spec.clone()));
        Ok(())
    }

    async fn stop(&mut self, _cx: &mut ModuleCx<'_>) -> Result<(), ModuleError> {
        self.log.record(Action::Stop(self.spec.clone()));
        Ok(())
    }

    fn idle_since(&self) -> Option<IdleSince> {
        Some(self.cached)
    }

    fn invalidate(&mut self) {
        self.log.record(Action::Invalidate(self.spec.clone()));
        self.valid = false;
    }

    async fn refresh_idle(&mut self, _cx: &mut ModuleCx<'_>) {
        if !self.valid {
            self.cached =
                self.truth.lock().get(&self.spec).copied().unwrap_or(IdleSince::Inhibited);
            self.valid = true;
        }
    }
}

pub fn spec(input: &str) -> ModuleSpec {
    ModuleSpec::parse(input).unwrap()
}

/// Engine + fakes wired together for tests.
pub struct Harness {
    pub engine: Engine<FakeClock>,
    pub clock: FakeClock,
    pub log: ActionLog,
    pub truth: IdleTruth,
    pub events: EventReader,
}

impl Harness {
    /// Set a session's ground-truth idle value and drop its cache.
    pub fn set_idle(&mut self, session: &ModuleSpec, value: IdleSince) {
        self.truth.lock().insert(session.clone(), value);
        self.engine.core.invalidate_requested = true;
    }

    pub fn running_names(&self) -> Vec<String> {
        self.engine.running().iter().map(|s| s.name().to_string()).collect()
    }
}

fn register_fake(registry: &mut Registry, name: &str, log: &ActionLog, reconfigurable: bool) {
    let log = log.clone();
    registry.register(name, move |spec| {
        Ok(Box::new(FakeModule {
            spec: spec.clone(),
            log: log.clone(),
            reconfigurable,
            fail_start: false,
            fail_stop: false,
            dependencies: Vec::new(),
        }))
    });
}

/// Build an engine whose registry is all fakes except the real lock
/// module and a real per-session launcher (`dpms` over X11 sessions).
pub fn harness(config_source: &str) -> Harness {
    let log = ActionLog::default();
    let truth: IdleTruth = Arc::default();
    let clock = FakeClock::new();
    let mut registry = Registry::new();

    for name in [names::SERVER, names::XSS, names::TTY_IDLE, "upower", "dunst", "locker", "backlight", "power", "dpms.session"] {
        register_fake(&mut registry, name, &log, false);
    }
    // The screen-saver configurator and the scheduler adopt new
    // parameters in place.
    for name in [names::XSET, names::TIMER] {
        register_fake(&mut registry, name, &log, true);
    }

    registry.register(names::LOCK, |_| Ok(Box::new(LockModule)));

    registry.register("dpms", |spec| {
        Ok(Box::new(PerSessionLauncher::new(spec, "dpms.session", names::SESSION_X11)))
    });

    // A module with a dependency, for ordering tests.
    {
        let log = log.clone();
        registry.register("parent", move |spec| {
            Ok(Box::new(FakeModule {
                spec: spec.clone(),
                log: log.clone(),
                reconfigurable: false,
                fail_start: false,
                fail_stop: false,
                dependencies: vec![ModuleSpec::bare("child")],
            }))
        });
    }
    register_fake(&mut registry, "child", &log, false);

    // Misbehaving modules.
    {
        let log = log.clone();
        registry.register("failstart", move |spec| {
            Ok(Box::new(FakeModule {
                spec: spec.clone(),
                log: log.clone(),
                reconfigurable: false,
                fail_start: true,
                fail_stop: false,
                dependencies: Vec::new(),
            }))
        });
    }
    {
        let log = log.clone();
        registry.register("failstop", move |spec| {
            Ok(Box::new(FakeModule {
                spec: spec.clone(),
                log: log.clone(),
                reconfigurable: false,
                fail_start: false,
                fail_stop: true,
                dependencies: Vec::new(),
            }))
        });
    }

    for name in [names::SESSION_X11, names::SESSION_TTY] {
        let log = log.clone();
        let truth = truth.clone();
        registry.register(name, move |spec| {
            Ok(Box::new(FakeSession {
                spec: spec.clone(),
                log: log.clone(),
                truth: truth.clone(),
                cached: IdleSince::Inhibited,
                valid: false,
            }))
        });
    }

    let configurator = if config_source.is_empty() {
        Configurator::default()
    } else {
        let config = Config::parse(config_source, "test.hcl").unwrap();
        Configurator::new(Some((config, PathBuf::from("test.hcl"))))
    };

    let (tx, rx) = channel();
    let paths = EnginePaths {
        run_dir: PathBuf::from("/tmp/shade-test"),
        lib_dir: PathBuf::from("/tmp/shade-test/lib"),
        socket_path: PathBuf::from("/tmp/shade-test/daemon.sock"),
    };
    let engine = Engine::new(registry, configurator, tx, paths, clock.clone());

    Harness { engine, clock, log, truth, events: rx }
}

/// Parse config source for `Engine::replace_config` in tests.
pub fn parse_config(source: &str) -> (Config, PathBuf) {
    (Config::parse(source, "test.hcl").unwrap(), PathBuf::from("test.hcl"))
}
