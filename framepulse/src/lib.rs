//! # Framepulse
//!
//! A phase-ordered frame scheduler for Rust.
//!
//! Framepulse drives time-based work (animation state mutation, layout
//! reads, rendering writes) in lockstep with a host refresh signal. Client
//! code registers callbacks against named phases; the engine guarantees
//! phase ordering, handles re-entrant scheduling during a running tick,
//! tracks recurring callbacks, and supports pause/resume with wall-clock
//! correction.
//!
//! ## Core Concepts
//!
//! - **Phases**: every tick executes the fixed sequence read → update →
//!   render. Read-phase side effects are visible to update callbacks in the
//!   same tick, and update side effects to render callbacks, never the
//!   reverse.
//! - **Recurring callbacks**: a callback scheduled with
//!   [`ScheduleOptions::LOOP`](common::ScheduleOptions::LOOP) runs once per
//!   tick until cancelled, and keeps the tick driver armed.
//! - **Lazy ticking**: the engine only requests host ticks while there is
//!   work. An idle engine costs nothing; the next `schedule` call wakes it.
//! - **Fixed tick rate**: an optional `fps` target throttles phase work with
//!   drift correction, independent of the host's native refresh rate.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use framepulse::prelude::*;
//!
//! let config = FrameConfig::default();
//! let mut engine = FrameEngine::new(&config);
//!
//! // A recurring update-phase callback that cancels itself after 100 frames.
//! let mut frames = 0;
//! let handle = std::sync::Arc::new(std::sync::Mutex::new(None));
//! let slot = handle.clone();
//! let id = engine.schedule(Phase::Update, ScheduleOptions::LOOP, move |state, engine| {
//!     frames += 1;
//!     println!("frame {frames}: delta {:.2} ms", state.delta);
//!     if frames >= 100 {
//!         if let Some(id) = *slot.lock().unwrap() {
//!             engine.cancel(id);
//!         }
//!     }
//! });
//! *handle.lock().unwrap() = Some(id);
//! ```

pub const ENGINE_NAME: &str = "Pulse Engine";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod common;
pub(crate) mod components;
pub mod config;
pub mod engine;
pub mod runner;
pub mod time;

/// A prelude module for easy importing of the most common framepulse types.
pub mod prelude {
    pub use crate::common::{CallbackId, FrameState, Phase, ScheduleOptions};
    pub use crate::config::{FrameConfig, RefreshRate};
    pub use crate::engine::{FrameEngine, TimestampDriver};
    pub use crate::runner::FrameRunner;
    pub use crate::time::{Clock, MonotonicClock, PollSource, TickHandle, TickSource};
}
