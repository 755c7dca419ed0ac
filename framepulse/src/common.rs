//! Common, primitive types shared across the engine.
//!
//! This module defines the callback identity key, the fixed phase sequence,
//! and the per-tick timing state handed to every callback. Using distinct
//! types improves type safety and code clarity.

use serde::Deserialize;
use slotmap::new_key_type;
use std::fmt;
use std::str::FromStr;

new_key_type! {
    /// Uniquely and safely identifies a registered callback within the engine.
    ///
    /// This key is returned by [`FrameEngine::schedule`](crate::engine::FrameEngine::schedule)
    /// and is the sole handle for later cancellation. Keys are never reused,
    /// preventing stale ID bugs: cancelling a key that was already removed is
    /// a safe no-op.
    pub struct CallbackId;
}

/// A stage of the frame cycle, executed in the fixed order
/// `Read` → `Update` → `Render` on every tick.
///
/// Read-phase side effects are observable by update-phase callbacks in the
/// same tick, and update-phase side effects by render-phase callbacks, never
/// the reverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Read,
    Update,
    Render,
}

impl Phase {
    /// All phases, in execution order.
    pub const ALL: [Phase; 3] = [Phase::Read, Phase::Update, Phase::Render];

    /// Number of phases in the cycle.
    pub const COUNT: usize = Self::ALL.len();

    /// A human-readable label for logging purposes.
    pub fn label(self) -> &'static str {
        match self {
            Phase::Read => "read",
            Phase::Update => "update",
            Phase::Render => "render",
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Phase {
    type Err = UnknownPhase;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(Phase::Read),
            "update" => Ok(Phase::Update),
            "render" => Ok(Phase::Render),
            other => Err(UnknownPhase(other.to_string())),
        }
    }
}

/// Error returned when parsing a phase name fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPhase(pub String);

impl fmt::Display for UnknownPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown phase '{}' (expected read, update or render)", self.0)
    }
}

impl std::error::Error for UnknownPhase {}

/// Timing state for the current tick, passed to every phase callback.
///
/// The engine exclusively owns and mutates this; callbacks receive a
/// read-only snapshot valid for the duration of their invocation.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameState {
    /// Elapsed time attributed to the current tick, in milliseconds.
    pub delta: f64,
    /// Monotonic time of the current tick in milliseconds, with paused
    /// duration subtracted out.
    pub timestamp: f64,
    /// True only while phases are being executed.
    pub is_running: bool,
    /// True while the engine is paused. Never true together with
    /// `is_running` during phase execution: a paused engine runs no phases.
    pub is_paused: bool,
}

/// Options controlling how a callback is queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScheduleOptions {
    /// Re-arm the callback on every tick until it is cancelled.
    pub looping: bool,
    /// When scheduled from inside a running drain of the same phase, execute
    /// within the current drain instead of waiting a full tick. Has no effect
    /// outside a drain.
    pub run_now: bool,
}

impl ScheduleOptions {
    /// One-shot callback for the next tick.
    pub const ONCE: ScheduleOptions = ScheduleOptions {
        looping: false,
        run_now: false,
    };

    /// Recurring callback, invoked once per tick until cancelled.
    pub const LOOP: ScheduleOptions = ScheduleOptions {
        looping: true,
        run_now: false,
    };

    /// One-shot callback that joins an in-progress drain of its phase.
    pub const RUN_NOW: ScheduleOptions = ScheduleOptions {
        looping: false,
        run_now: true,
    };
}
