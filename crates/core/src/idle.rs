// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Idle timestamps with sentinel values.
//!
//! A session reports the point in time since which it has been idle. Two
//! sentinels extend the timeline: `Inhibited` (the session cannot become
//! idle in its current state, e.g. a wake-lock is held) and `Forever`
//! (pretend the session has been idle since the beginning of time, used
//! while the system is preparing to sleep so every idle hook fires).
//!
//! The user is idle only when every session is, so aggregation over
//! sessions takes the maximum: `Forever < At(_) < Inhibited`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The point in time since which a session has been idle, in milliseconds
/// since the UNIX epoch, or a sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleSince {
    /// Pretend maximally idle: idle since forever ago.
    Forever,
    /// Idle since this timestamp (epoch milliseconds).
    At(u64),
    /// Cannot currently become idle, no matter how much time passes.
    Inhibited,
}

impl IdleSince {
    /// How long the session has been idle as of `now_ms`.
    ///
    /// Returns `None` for `Inhibited` (never idle), `u64::MAX` for
    /// `Forever`, and a saturating difference otherwise.
    pub fn idle_for_ms(self, now_ms: u64) -> Option<u64> {
        match self {
            IdleSince::Inhibited => None,
            IdleSince::Forever => Some(u64::MAX),
            IdleSince::At(since) => Some(now_ms.saturating_sub(since)),
        }
    }

    /// Whether the session has been idle for at least `threshold_secs`
    /// as of `now_ms`. The comparison is inclusive: a session exactly at
    /// the threshold counts as idle.
    pub fn idle_for(self, now_ms: u64, threshold_secs: u64) -> bool {
        match self.idle_for_ms(now_ms) {
            Some(ms) => ms >= threshold_secs.saturating_mul(1000),
            None => false,
        }
    }

    /// Whether this is a finite timestamp (idleness is measurable).
    pub fn is_finite(self) -> bool {
        matches!(self, IdleSince::At(_))
    }

    fn rank(self) -> u8 {
        match self {
            IdleSince::Forever => 0,
            IdleSince::At(_) => 1,
            IdleSince::Inhibited => 2,
        }
    }
}

impl Ord for IdleSince {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        match (self, other) {
            (IdleSince::At(a), IdleSince::At(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for IdleSince {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for IdleSince {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdleSince::Forever => write!(f, "forever"),
            IdleSince::At(ms) => write!(f, "{}", ms),
            IdleSince::Inhibited => write!(f, "inhibited"),
        }
    }
}

// The bus exchanges idle timestamps as JSON: a number for finite values,
// the strings "forever" / "inhibited" for the sentinels.
impl Serialize for IdleSince {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            IdleSince::At(ms) => serializer.serialize_u64(*ms),
            IdleSince::Forever => serializer.serialize_str("forever"),
            IdleSince::Inhibited => serializer.serialize_str("inhibited"),
        }
    }
}

impl<'de> Deserialize<'de> for IdleSince {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error;

        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Millis(u64),
            Sentinel(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Millis(ms) => Ok(IdleSince::At(ms)),
            Repr::Sentinel(s) => match s.as_str() {
                "forever" => Ok(IdleSince::Forever),
                "inhibited" => Ok(IdleSince::Inhibited),
                other => Err(D::Error::custom(format!("unknown idle sentinel: {other:?}"))),
            },
        }
    }
}

#[cfg(test)]
#[path = "idle_tests.rs"]
mod tests;
