// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The lock module: edge-triggers the locked state.
//!
//! The lock state can be flipped by several sources (idle hooks, the
//! lock/unlock commands, a peer instance), so this module only changes
//! the state on its own start and stop edges rather than enforcing it
//! for as long as it runs. The `50-lock` selector keeps it running while
//! the state is locked, which makes an explicit lock command and an
//! idle-triggered lock converge on the same running set.

use async_trait::async_trait;
use tracing::debug;

use crate::module::{Module, ModuleCx, ModuleError};

#[derive(Default)]
pub struct LockModule;

#[async_trait]
impl Module for LockModule {
    async fn start(&mut self, cx: &mut ModuleCx<'_>) -> Result<(), ModuleError> {
        debug!("locking (lock module enabled)");
        cx.lock();
        Ok(())
    }

    async fn stop(&mut self, cx: &mut ModuleCx<'_>) -> Result<(), ModuleError> {
        debug!("unlocking (lock module disabled)");
        cx.unlock();
        Ok(())
    }
}
