// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Expected failure modes surfaced to the user.

use thiserror::Error;

/// An expected failure ultimately caused by misconfiguration or the
/// environment (daemon not running, invalid idle threshold, missing
/// module). Surfaced as a one-line message with no backtrace.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct UserError(pub String);

impl UserError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}
