// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Requests accepted on the control socket.

use shade_core::ModuleSpec;

use crate::codec::ProtocolError;

/// A command received over (or sent to) the control socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Liveness probe; the daemon replies `pong`.
    Ping,
    /// Multi-line human-readable state summary.
    Status,
    /// Begin graceful shutdown.
    Stop,
    /// Re-read the configuration file and reconcile.
    Reload,
    /// Activate the lock screen. With `wait`, the reply is delayed until
    /// the next unlock, so a caller can block on the lock screen exiting.
    Lock { wait: bool },
    /// Deactivate the lock screen.
    Unlock,
    /// Attach a session (e.g. `session.x11 :0`).
    Attach { session: ModuleSpec },
    /// Detach a previously attached session.
    Detach { session: ModuleSpec },
    /// Route a command to a running module instance. The words before the
    /// `--` separator form the spec, the rest the command.
    Module { spec: ModuleSpec, command: Vec<String> },
}

impl Request {
    /// Decode a request from the words of the wire-level JSON array.
    pub fn from_words(words: &[String]) -> Result<Self, ProtocolError> {
        let (verb, rest) = words
            .split_first()
            .ok_or_else(|| ProtocolError::Malformed("empty command".into()))?;

        let request = match verb.as_str() {
            "ping" => Self::Ping,
            "status" => Self::Status,
            "stop" => Self::Stop,
            "reload" => Self::Reload,
            "lock" => match rest {
                [] => Self::Lock { wait: false },
                [w] if w == "wait" => Self::Lock { wait: true },
                _ => return Err(ProtocolError::Malformed("lock takes at most `wait`".into())),
            },
            "unlock" => Self::Unlock,
            "attach" => Self::Attach { session: session_spec(rest)? },
            "detach" => Self::Detach { session: session_spec(rest)? },
            "module" => {
                let split = rest.iter().position(|w| w == "--").unwrap_or(rest.len());
                let spec = ModuleSpec::from_words(&rest[..split])
                    .map_err(|e| ProtocolError::Malformed(e.to_string()))?;
                let command = rest.get(split + 1..).unwrap_or_default().to_vec();
                Self::Module { spec, command }
            }
            other => return Err(ProtocolError::UnknownCommand(other.to_string())),
        };
        Ok(request)
    }

    /// Encode this request as the words of the wire-level JSON array.
    pub fn to_words(&self) -> Vec<String> {
        fn spec_words(spec: &ModuleSpec) -> Vec<String> {
            std::iter::once(spec.name().to_string())
                .chain(spec.args().iter().cloned())
                .collect()
        }

        match self {
            Self::Ping => vec!["ping".into()],
            Self::Status => vec!["status".into()],
            Self::Stop => vec!["stop".into()],
            Self::Reload => vec!["reload".into()],
            Self::Lock { wait: false } => vec!["lock".into()],
            Self::Lock { wait: true } => vec!["lock".into(), "wait".into()],
            Self::Unlock => vec!["unlock".into()],
            Self::Attach { session } => {
                let mut words = vec!["attach".into()];
                words.extend(spec_words(session));
                words
            }
            Self::Detach { session } => {
                let mut words = vec!["detach".into()];
                words.extend(spec_words(session));
                words
            }
            Self::Module { spec, command } => {
                let mut words = vec!["module".into()];
                words.extend(spec_words(spec));
                words.push("--".into());
                words.extend(command.iter().cloned());
                words
            }
        }
    }
}

fn session_spec(words: &[String]) -> Result<ModuleSpec, ProtocolError> {
    ModuleSpec::from_words(words).map_err(|e| ProtocolError::Malformed(e.to_string()))
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
