// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Idle scheduler.
//!
//! Parameterized by the full set of configured idle thresholds. While
//! idleness is measurable, it sleeps until the nearest threshold
//! strictly ahead of the current idle time, then invalidates the
//! session idle caches and reconciles so the hooks that just became due
//! start. Rescheduling happens on a deferred tick so the fresh idle
//! measurement from that reconciliation is what gets armed against.

use async_trait::async_trait;
use shade_core::{IdleSince, ModuleSpec};
use shade_engine::{Event, Module, ModuleCx, ModuleError, ModuleEvent};
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub struct TimerModule {
    spec: ModuleSpec,
    /// Idle thresholds in seconds, ascending.
    schedule: Vec<u64>,
    armed: Option<(u64, CancellationToken)>,
}

impl TimerModule {
    pub fn from_spec(spec: &ModuleSpec) -> Result<Self, ModuleError> {
        Ok(Self { spec: spec.clone(), schedule: parse_schedule(spec.args())?, armed: None })
    }

    fn arm(&mut self, cx: &ModuleCx<'_>) {
        self.disarm();

        let Some(idle_ms) = cx.idle.idle_for_ms(cx.now_ms) else {
            return;
        };
        if cx.idle == IdleSince::Forever {
            return;
        }
        // Nearest threshold strictly ahead of the current idle time; a
        // 1ms margin keeps the fire on the far side of the threshold.
        let Some(residual_ms) = self
            .schedule
            .iter()
            .map(|t| t.saturating_mul(1000))
            .filter(|t| *t > idle_ms)
            .min()
            .map(|t| t - idle_ms + 1)
        else {
            return;
        };

        let deadline_ms = cx.now_ms + residual_ms;
        let cancel = CancellationToken::new();
        let events = cx.events.clone();
        let spec = self.spec.clone();
        let token = cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(std::time::Duration::from_millis(residual_ms)) => {
                    events.send(Event::Module {
                        spec,
                        payload: ModuleEvent::TimerFired { deadline_ms },
                    });
                }
            }
        });
        debug!(residual_ms, "armed idle timer");
        self.armed = Some((deadline_ms, cancel));
    }

    fn disarm(&mut self) {
        if let Some((_, cancel)) = self.armed.take() {
            cancel.cancel();
        }
    }
}

fn parse_schedule(args: &[String]) -> Result<Vec<u64>, ModuleError> {
    if args.is_empty() {
        return Err(ModuleError::failed("scheduler needs at least one threshold"));
    }
    let mut schedule = Vec::with_capacity(args.len());
    for arg in args {
        schedule.push(
            arg.parse()
                .map_err(|e| ModuleError::failed(format!("bad idle threshold {arg:?}: {e}")))?,
        );
    }
    schedule.sort_unstable();
    schedule.dedup();
    Ok(schedule)
}

#[async_trait]
impl Module for TimerModule {
    async fn start(&mut self, cx: &mut ModuleCx<'_>) -> Result<(), ModuleError> {
        self.arm(cx);
        Ok(())
    }

    async fn stop(&mut self, _cx: &mut ModuleCx<'_>) -> Result<(), ModuleError> {
        self.disarm();
        Ok(())
    }

    async fn reconfigure(&mut self, cx: &mut ModuleCx<'_>, args: &[String]) -> bool {
        let Ok(schedule) = parse_schedule(args) else {
            return false;
        };
        debug!(?schedule, "rescheduling idle timer");
        self.schedule = schedule;
        self.spec = ModuleSpec::new(self.spec.name(), args.iter().cloned());
        self.arm(cx);
        true
    }

    async fn handle_event(&mut self, cx: &mut ModuleCx<'_>, event: ModuleEvent) {
        match event {
            ModuleEvent::TimerFired { deadline_ms } => {
                match self.armed {
                    Some((armed_deadline, _)) if armed_deadline == deadline_ms => {}
                    _ => {
                        debug!(deadline_ms, "ignoring stale timer fire");
                        return;
                    }
                }
                self.armed = None;
                // Force fresh idle measurements, reconcile, and re-arm
                // afterwards against the post-reconciliation idle time.
                cx.core.invalidate_requested = true;
                cx.request_update();
                cx.events.send(Event::Module {
                    spec: self.spec.clone(),
                    payload: ModuleEvent::Tick,
                });
            }
            ModuleEvent::Tick => self.arm(cx),
            _ => {}
        }
    }
}

#[cfg(test)]
#[path = "timer_tests.rs"]
mod tests;
