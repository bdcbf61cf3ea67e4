// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The engine: instance map, running list, and the reconciliation loop.
//!
//! Reconciliation is re-entrant in effect: module callbacks may install
//! selectors, attach sessions, or flip state, all of which change what
//! the next pass wants. The loop therefore rebuilds the wanted list and
//! performs at most one action per pass, looping until a pass is a
//! no-op. Passes are capped at `|wanted| + |running| + 1` so adversarial
//! reconfigurations cannot live-lock the daemon.

use std::collections::HashMap;
use std::fmt::Write as _;

use indexmap::IndexSet;
use shade_core::{Clock, IdleSince, ModuleSpec, UserError};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::bus::BusPacket;
use crate::configurator::Configurator;
use crate::event::{Event, EventSender, ModuleEvent};
use crate::module::{CxCore, EnginePaths, Module, ModuleCx, ModuleError};
use crate::registry::Registry;
use crate::selector::{default_selectors, SelectCx, ShutdownSelector, KEY_SHUTDOWN};

/// Errors from a reconciliation.
#[derive(Debug, Error)]
pub enum UpdateError {
    /// A module's `start` refused to complete; the reconciliation was
    /// aborted and the module was discarded without a `stop`.
    #[error("failed to start module {spec}: {source}")]
    Start { spec: ModuleSpec, source: ModuleError },

    /// One or more `stop`s raised. The modules were removed from the
    /// running list anyway and the rest of the reconciliation ran; this
    /// is a soft failure.
    #[error("failed to stop some modules: {specs:?}")]
    StopFailures { specs: Vec<ModuleSpec> },

    #[error(transparent)]
    User(#[from] UserError),
}

/// The module lifecycle engine. Owned and driven by the event loop; all
/// mutation happens on its single consumer.
pub struct Engine<C: Clock> {
    registry: Registry,
    instances: HashMap<ModuleSpec, Box<dyn Module>>,
    /// Started specs, in start order. Teardown walks this in reverse.
    running: Vec<ModuleSpec>,
    pub core: CxCore,
    configurator: Configurator,
    events: EventSender,
    paths: EnginePaths,
    clock: C,
    /// Aggregate idle value as of the last completed reconciliation,
    /// for edge-detecting `idle_changed` notifications.
    last_idle: IdleSince,
}

impl<C: Clock> Engine<C> {
    pub fn new(
        registry: Registry,
        configurator: Configurator,
        events: EventSender,
        paths: EnginePaths,
        clock: C,
    ) -> Self {
        let core = CxCore { selectors: default_selectors(), ..Default::default() };
        Self {
            registry,
            instances: HashMap::new(),
            running: Vec::new(),
            core,
            configurator,
            events,
            paths,
            clock,
            last_idle: IdleSince::Inhibited,
        }
    }

    pub fn running(&self) -> &[ModuleSpec] {
        &self.running
    }

    pub fn has_instance(&self, spec: &ModuleSpec) -> bool {
        self.instances.contains_key(spec)
    }

    pub fn events(&self) -> &EventSender {
        &self.events
    }

    fn cx(&mut self, now_ms: u64) -> ModuleCx<'_> {
        let idle = self.global_idle();
        ModuleCx {
            core: &mut self.core,
            events: &self.events,
            paths: &self.paths,
            now_ms,
            idle,
            bus: self.configurator.bus(),
        }
    }

    /// The aggregate idle timestamp: the user is idle only when every
    /// attached session is. During sleep-prepare everything counts as
    /// maximally idle so each idle hook fires before the system sleeps.
    pub fn global_idle(&self) -> IdleSince {
        if self.core.state.sleeping {
            return IdleSince::Forever;
        }
        self.core
            .sessions
            .iter()
            .map(|spec| {
                self.instances
                    .get(spec)
                    .and_then(|m| m.idle_since())
                    .unwrap_or(IdleSince::Inhibited)
            })
            .max()
            .unwrap_or(IdleSince::Inhibited)
    }

    /// Process one event from the queue, then run any reconciliation the
    /// handler asked for.
    pub async fn handle_event(&mut self, event: Event) -> Result<(), UpdateError> {
        match event {
            Event::Module { spec, payload } => self.dispatch(spec, payload).await,
            Event::Bus(packet) => self.dispatch_bus(packet).await,
            Event::Update => self.core.update_requested = true,
            Event::Reload => return self.reload().await,
            Event::Stop => return self.shutdown().await,
            Event::Control { .. } => {
                warn!("control event reached the engine without a listener handler");
            }
        }
        self.settle().await
    }

    /// Apply pending invalidation and reconcile if a callback asked for it.
    async fn settle(&mut self) -> Result<(), UpdateError> {
        self.apply_invalidation();
        if std::mem::take(&mut self.core.update_requested) {
            self.update().await
        } else {
            Ok(())
        }
    }

    async fn dispatch(&mut self, spec: ModuleSpec, payload: ModuleEvent) {
        let Some(mut module) = self.instances.remove(&spec) else {
            debug!(%spec, ?payload, "dropping event for absent module");
            return;
        };
        let now_ms = self.clock.epoch_ms();
        let mut cx = self.cx(now_ms);
        module.handle_event(&mut cx, payload).await;
        self.instances.insert(spec, module);
    }

    async fn dispatch_bus(&mut self, packet: BusPacket) {
        for spec in self.running.clone() {
            let Some(mut module) = self.instances.remove(&spec) else {
                continue;
            };
            let now_ms = self.clock.epoch_ms();
            let mut cx = self.cx(now_ms);
            module.bus_packet(&mut cx, &packet);
            self.instances.insert(spec, module);
        }
    }

    /// Reconcile running modules against what the selector chain wants.
    pub async fn update(&mut self) -> Result<(), UpdateError> {
        let mut failures = Vec::new();
        let mut passes = 0usize;
        let mut cap = self.running.len() + 1;

        let result = loop {
            self.apply_invalidation();
            self.refresh_sessions().await;

            let wanted = match self.build_wanted() {
                Ok(wanted) => wanted,
                Err(e) => break Err(e),
            };
            cap = cap.max(wanted.len() + self.running.len() + 1);

            match self.reconcile_one(&wanted, &mut failures).await {
                Ok(true) => {}
                Ok(false) => break Ok(()),
                Err(e) => break Err(e),
            }

            passes += 1;
            if passes > cap {
                warn!(passes, "reconciliation did not settle, giving up this cycle");
                break Ok(());
            }
        };

        self.core.update_requested = false;
        self.notify_idle_changed();

        match result {
            Ok(()) if failures.is_empty() => {
                debug!("modules are synchronized");
                Ok(())
            }
            Ok(()) => Err(UpdateError::StopFailures { specs: failures }),
            Err(e) => Err(e),
        }
    }

    /// Edge-detect the aggregate idle timestamp and tell running
    /// modules when it moved, so idle-dependent side channels (the bus
    /// sender) react without polling.
    fn notify_idle_changed(&mut self) {
        let current = self.global_idle();
        if current == self.last_idle {
            return;
        }
        self.last_idle = current;
        for spec in self.running.clone() {
            let Some(mut module) = self.instances.remove(&spec) else {
                continue;
            };
            let now_ms = self.clock.epoch_ms();
            let mut cx = self.cx(now_ms);
            module.idle_changed(&mut cx);
            self.instances.insert(spec, module);
        }
    }

    /// One pass of the selector chain plus dependency expansion.
    fn build_wanted(&mut self) -> Result<Vec<ModuleSpec>, UpdateError> {
        let registrations = self.configurator.evaluate(self.core.state.locked);
        let schedule = registrations.schedule();
        let idle = self.global_idle();
        let now_ms = self.clock.epoch_ms();

        let mut wanted = Vec::new();
        {
            let cx = SelectCx {
                state: &self.core.state,
                sessions: &self.core.sessions,
                running: &self.running,
                registrations: &registrations,
                schedule: &schedule,
                idle,
                now_ms,
                bus: self.configurator.bus(),
            };
            for selector in self.core.selectors.values() {
                selector.select(&cx, &mut wanted);
            }
        }

        // Prepend each spec's dependencies (recursively) so dependencies
        // start first, preserving first-occurrence order overall.
        let mut expanded = IndexSet::new();
        let mut stack = Vec::new();
        for spec in wanted {
            self.expand(spec, &mut expanded, &mut stack)?;
        }
        Ok(expanded.into_iter().collect())
    }

    fn expand(
        &mut self,
        spec: ModuleSpec,
        out: &mut IndexSet<ModuleSpec>,
        stack: &mut Vec<ModuleSpec>,
    ) -> Result<(), UpdateError> {
        if out.contains(&spec) {
            return Ok(());
        }
        if stack.contains(&spec) {
            warn!(%spec, "dependency cycle detected, breaking");
            return Ok(());
        }
        self.ensure_instance(&spec)?;
        let dependencies = self
            .instances
            .get(&spec)
            .map(|m| m.dependencies())
            .unwrap_or_default();
        stack.push(spec.clone());
        for dependency in dependencies {
            self.expand(dependency, out, stack)?;
        }
        stack.pop();
        out.insert(spec);
        Ok(())
    }

    fn ensure_instance(&mut self, spec: &ModuleSpec) -> Result<(), UpdateError> {
        if !self.instances.contains_key(spec) {
            let module = self.registry.build(spec)?;
            self.instances.insert(spec.clone(), module);
        }
        Ok(())
    }

    /// Perform at most one reconciliation action. Returns whether an
    /// action was taken (so the caller keeps looping).
    async fn reconcile_one(
        &mut self,
        wanted: &[ModuleSpec],
        failures: &mut Vec<ModuleSpec>,
    ) -> Result<bool, UpdateError> {
        // 1. Reconfigure: a wanted spec matches a running module by name
        // whose own spec is no longer wanted, and the instance accepts
        // the new parameters in place.
        for want in wanted {
            if self.running.contains(want) {
                continue;
            }
            for i in 0..self.running.len() {
                let current = self.running[i].clone();
                if current.name() != want.name() || wanted.contains(&current) {
                    continue;
                }
                let Some(mut module) = self.instances.remove(&current) else {
                    continue;
                };
                let now_ms = self.clock.epoch_ms();
                let mut cx = self.cx(now_ms);
                if module.reconfigure(&mut cx, want.args()).await {
                    self.running[i] = want.clone();
                    self.instances.insert(want.clone(), module);
                    debug!(from = %current, to = %want, "reconfigured module");
                    return Ok(true);
                }
                self.instances.insert(current, module);
            }
        }

        // 2. Stop modules no longer wanted, in reverse start order. A
        // failing stop must not pin its siblings: log, record, continue.
        for i in (0..self.running.len()).rev() {
            if wanted.contains(&self.running[i]) {
                continue;
            }
            let spec = self.running.remove(i);
            debug!(%spec, "stopping module");
            let Some(mut module) = self.instances.remove(&spec) else {
                warn!(%spec, "running module had no instance");
                return Ok(true);
            };
            let now_ms = self.clock.epoch_ms();
            let mut cx = self.cx(now_ms);
            if let Err(e) = module.stop(&mut cx).await {
                tracing::error!(%spec, error = %e, "error stopping module");
                failures.push(spec);
            } else {
                debug!("stopped module");
            }
            return Ok(true);
        }

        // 3. Start the first wanted module that is not running yet. It
        // goes to the tail of the running list so dependents started in
        // its wake are stopped before it on teardown.
        for want in wanted {
            if self.running.contains(want) {
                continue;
            }
            self.ensure_instance(want)?;
            self.running.push(want.clone());
            debug!(spec = %want, "starting module");
            let Some(mut module) = self.instances.remove(want) else {
                return Ok(true);
            };
            let now_ms = self.clock.epoch_ms();
            let mut cx = self.cx(now_ms);
            match module.start(&mut cx).await {
                Ok(()) => {
                    self.instances.insert(want.clone(), module);
                    debug!(spec = %want, "started module");
                    return Ok(true);
                }
                Err(source) => {
                    // Never started: drop it without a stop and abort the
                    // containing action.
                    self.running.retain(|spec| spec != want);
                    return Err(UpdateError::Start { spec: want.clone(), source });
                }
            }
        }

        Ok(false)
    }

    fn apply_invalidation(&mut self) {
        if !std::mem::take(&mut self.core.invalidate_requested) {
            return;
        }
        for module in self.instances.values_mut() {
            module.invalidate();
        }
    }

    /// Reacquire ground truth for any session whose cache was dropped.
    async fn refresh_sessions(&mut self) {
        for spec in self.core.sessions.clone() {
            let Some(mut module) = self.instances.remove(&spec) else {
                continue;
            };
            let now_ms = self.clock.epoch_ms();
            let mut cx = self.cx(now_ms);
            module.refresh_idle(&mut cx).await;
            self.instances.insert(spec, module);
        }
    }

    /// Attach a session. Rolled back if the resulting reconciliation
    /// fails, so a bad session spec does not linger.
    pub async fn attach(&mut self, session: ModuleSpec) -> Result<(), UserError> {
        if !self.registry.knows(session.name()) {
            return Err(UserError::new(format!(
                "Unknown session type {:?}",
                session.name()
            )));
        }
        if self.core.sessions.contains(&session) {
            return Err(UserError::new("Already attached to this session"));
        }
        self.core.sessions.insert(session.clone());
        if let Err(e) = self.update().await {
            self.core.sessions.shift_remove(&session);
            if let Err(rollback) = self.update().await {
                warn!(error = %rollback, "rollback reconciliation after failed attach");
            }
            return Err(UserError::new(e.to_string()));
        }
        Ok(())
    }

    pub async fn detach(&mut self, session: &ModuleSpec) -> Result<(), UserError> {
        if !self.core.sessions.shift_remove(session) {
            return Err(UserError::new("Already not attached to this session"));
        }
        self.update().await.map_err(|e| UserError::new(e.to_string()))
    }

    /// Explicit lock request. Returns false when already locked.
    pub async fn lock_now(&mut self) -> Result<bool, UpdateError> {
        if self.core.state.locked {
            return Ok(false);
        }
        let now_ms = self.clock.epoch_ms();
        self.cx(now_ms).lock();
        self.update().await?;
        Ok(true)
    }

    /// Explicit unlock request. Returns false when already unlocked.
    pub async fn unlock_now(&mut self) -> Result<bool, UpdateError> {
        if !self.core.state.locked {
            return Ok(false);
        }
        let now_ms = self.clock.epoch_ms();
        self.cx(now_ms).unlock();
        self.update().await?;
        Ok(true)
    }

    /// Swap in an already parsed configuration. Startup and tests use
    /// this; the `reload` path goes through the filesystem.
    pub fn replace_config(&mut self, config: shade_config::Config, path: std::path::PathBuf) {
        self.configurator.replace(config, path);
    }

    /// Re-read the configuration and reconcile. A file that fails to
    /// parse keeps the previous configuration; a file that disappeared
    /// leaves the daemon running with no user modules.
    pub async fn reload(&mut self) -> Result<(), UpdateError> {
        info!("reloading configuration");
        match shade_config::find_config() {
            Ok(Some((config, path))) => self.configurator.replace(config, path),
            Ok(None) => {
                warn!("no configuration file found; continuing with no user modules");
                self.configurator = Configurator::default();
            }
            Err(e) => {
                warn!(error = %e, "configuration reload failed; keeping previous configuration");
            }
        }
        self.update().await
    }

    /// Stop every module by installing the shutdown selector.
    pub async fn shutdown(&mut self) -> Result<(), UpdateError> {
        debug!("shutting down: stopping all modules");
        self.core
            .selectors
            .insert(KEY_SHUTDOWN.into(), Box::new(ShutdownSelector));
        self.update().await
    }

    /// Route a `module` socket command to an instance, creating it on
    /// first reference.
    pub async fn module_command(
        &mut self,
        spec: &ModuleSpec,
        args: &[String],
    ) -> Result<Vec<u8>, UserError> {
        self.ensure_instance(spec)
            .map_err(|e| UserError::new(e.to_string()))?;
        let Some(mut module) = self.instances.remove(spec) else {
            return Err(UserError::new(format!("Module {} not available", spec)));
        };
        let now_ms = self.clock.epoch_ms();
        let mut cx = self.cx(now_ms);
        let result = module.socket_command(&mut cx, args).await;
        self.instances.insert(spec.clone(), module);
        let reply = result.map_err(|e| UserError::new(e.to_string()))?;
        self.settle().await.map_err(|e| UserError::new(e.to_string()))?;
        Ok(reply)
    }

    /// Multi-line human-readable summary for the `status` command.
    pub fn status_report(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Currently locked: {}", self.core.state.locked);
        let _ = writeln!(out, "Sleeping: {}", self.core.state.sleeping);
        let _ = writeln!(out, "Sessions:");
        for spec in &self.core.sessions {
            let idle = self
                .instances
                .get(spec)
                .and_then(|m| m.idle_since())
                .unwrap_or(IdleSince::Inhibited);
            let _ = writeln!(out, "- {} (idle since: {})", spec, idle);
        }
        let _ = writeln!(out, "Running modules:");
        for spec in &self.running {
            let _ = writeln!(out, "- {}", spec);
        }
        out.push_str(&self.configurator.status(self.core.state.locked));
        out
    }
}

#[cfg(test)]
#[path = "test_support.rs"]
pub(crate) mod test_support;

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
