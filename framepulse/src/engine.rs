//! The core engine that runs the phased frame cycle.

use crate::common::{CallbackId, FrameState, Phase, ScheduleOptions};
use crate::components::loops::LoopRegistry;
use crate::components::phase::PhaseRegistry;
use crate::config::FrameConfig;
use crate::time::{Clock, MonotonicClock, TickDriver, TickSource};
use slotmap::SlotMap;
use tracing::{debug, info, trace};

/// Tick rate assumed for the very first delta, before real spacing between
/// host ticks has been observed.
const NOMINAL_FPS: f64 = 60.0;
const NOMINAL_INTERVAL: f64 = 1000.0 / NOMINAL_FPS;

/// Floor for the variable-step delta, guarding against zero or negative
/// values on clock anomalies.
const MIN_DELTA: f64 = 1.0;

/// A callback scheduled into a phase.
///
/// Receives the timing state for the current tick and the engine itself, so
/// re-entrant scheduling and cancellation need no shared global handle.
pub type PhaseCallback = Box<dyn FnMut(&FrameState, &mut FrameEngine) + Send>;

struct CallbackSlot {
    phase: Phase,
    func: Option<PhaseCallback>,
}

/// The frame engine.
///
/// Drives registered callbacks through the read → update → render cycle in
/// lockstep with a host refresh signal. Everything is synchronous and
/// single-threaded: the only suspension point is waiting for the host to
/// deliver the next tick via [`deliver_tick`](FrameEngine::deliver_tick).
///
/// The engine only runs while there is work: registering a callback while
/// the tick driver is idle arms it, and the driver is released again after a
/// tick that leaves no recurring or pending work behind.
pub struct FrameEngine {
    callbacks: SlotMap<CallbackId, CallbackSlot>,
    phases: PhaseRegistry,
    loops: LoopRegistry,
    ticker: TickDriver,
    clock: Box<dyn Clock>,
    state: FrameState,
    frame_interval: Option<f64>,
    max_delta: f64,
    last_frame_time: f64,
    last_pause_time: Option<f64>,
    total_paused_time: f64,
    is_paused: bool,
    keep_ticking: bool,
    use_nominal_delta: bool,
}

impl FrameEngine {
    /// Creates an engine with no host timing source.
    ///
    /// Such an engine is inert: callbacks queue up but no tick is ever
    /// requested. Useful for environments without a refresh signal and for
    /// hosts that deliver ticks entirely by hand.
    pub fn new(config: &FrameConfig) -> Self {
        Self::with_host(config, None, Box::new(MonotonicClock::new()))
    }

    /// Creates an engine wired to a host [`TickSource`] and [`Clock`].
    pub fn with_host(
        config: &FrameConfig,
        source: Option<Box<dyn TickSource>>,
        clock: Box<dyn Clock>,
    ) -> Self {
        let frame_interval = config.fps.filter(|fps| *fps > 0.0).map(|fps| 1000.0 / fps);
        // A configured ceiling below the delta floor would invert the clamp.
        let max_delta = config.max_delta.max(MIN_DELTA);
        if let Some(interval) = frame_interval {
            info!(interval_ms = interval, "engine locked to fixed tick rate");
        }
        Self {
            callbacks: SlotMap::with_key(),
            phases: PhaseRegistry::default(),
            loops: LoopRegistry::default(),
            ticker: TickDriver::new(source),
            clock,
            state: FrameState::default(),
            frame_interval,
            max_delta,
            last_frame_time: 0.0,
            last_pause_time: None,
            total_paused_time: 0.0,
            is_paused: false,
            keep_ticking: false,
            use_nominal_delta: true,
        }
    }

    /// Registers `callback` into `phase` and returns its cancellation handle.
    ///
    /// With [`ScheduleOptions::LOOP`] the callback re-arms itself every tick
    /// until cancelled. Scheduling while the tick driver is idle implicitly
    /// starts it, unless the engine is paused (a paused engine runs no
    /// phases; queued work waits for [`play`](FrameEngine::play)).
    pub fn schedule<F>(&mut self, phase: Phase, options: ScheduleOptions, callback: F) -> CallbackId
    where
        F: FnMut(&FrameState, &mut FrameEngine) + Send + 'static,
    {
        let id = self.callbacks.insert(CallbackSlot {
            phase,
            func: Some(Box::new(callback)),
        });
        if options.looping {
            self.loops.mark(id);
        }
        self.phases.queue_mut(phase).enqueue(id, options.run_now);
        debug!(phase = %phase, ?id, looping = options.looping, "callback scheduled");

        // Lazy activation. Mid-tick the end-of-tick decision re-arms instead,
        // and a paused engine stays stopped until played.
        if !self.state.is_running && !self.is_paused && !self.ticker.is_running() {
            self.use_nominal_delta = true;
            self.last_frame_time = self.clock.now() - self.total_paused_time;
            self.ticker.start();
        }
        id
    }

    /// Cancels a callback everywhere.
    ///
    /// Once this returns the callback will not run on any future tick; it
    /// may already have completed its current-tick invocation. Unknown or
    /// stale handles are safe no-ops.
    pub fn cancel(&mut self, id: CallbackId) {
        if let Some(slot) = self.callbacks.remove(id) {
            self.phases.cancel_everywhere(id);
            self.loops.unmark(id);
            debug!(phase = %slot.phase, ?id, "callback cancelled");
        }
    }

    /// Resumes a paused engine, correcting for the wall-clock time spent
    /// paused so it never surfaces as elapsed animation time.
    ///
    /// No-op unless the engine is paused and recurring work is pending.
    pub fn play(&mut self) {
        if !self.is_paused || self.loops.active_count() == 0 {
            return;
        }
        self.is_paused = false;
        let now = self.clock.now();
        if let Some(paused_at) = self.last_pause_time.take() {
            self.total_paused_time += now - paused_at;
        }
        self.last_frame_time = now - self.total_paused_time;
        self.state.timestamp = self.last_frame_time;
        info!(paused_ms = self.total_paused_time, "engine resumed");
        self.ticker.start();
    }

    /// Pauses the engine: stops the tick driver and records the pause time
    /// for later wall-clock correction. No-op if already paused.
    pub fn pause(&mut self) {
        if self.is_paused {
            return;
        }
        self.is_paused = true;
        self.ticker.stop();
        self.last_pause_time = Some(self.clock.now());
        info!("engine paused");
    }

    /// Returns the engine to its just-constructed condition: timing state at
    /// defaults, all queues and registrations emptied, tick driver stopped.
    pub fn clear(&mut self) {
        self.state = FrameState::default();
        self.phases.clear_all();
        self.loops.clear();
        self.callbacks.clear();
        self.ticker.stop();
        self.last_frame_time = 0.0;
        self.last_pause_time = None;
        self.total_paused_time = 0.0;
        self.is_paused = false;
        self.keep_ticking = false;
        self.use_nominal_delta = true;
        info!("engine cleared");
    }

    /// Delivers one raw host tick at host time `now` (milliseconds).
    ///
    /// Called by the host once per granted tick request. Computes the timing
    /// state for this tick, runs all phases in order, and decides whether to
    /// request another tick.
    pub fn deliver_tick(&mut self, now: f64) {
        // The one-shot request has fired; the driver is idle until re-armed.
        self.ticker.acknowledge();

        // Pausing cancels the pending request, so no tick should arrive
        // here; a host that delivers one anyway runs no phases.
        if self.is_paused {
            return;
        }

        let time = now - self.total_paused_time;
        self.keep_ticking = self.loops.active_count() > 0;

        if let Some(interval) = self.frame_interval {
            let elapsed = time - self.last_frame_time;
            if elapsed < interval {
                // Faster than the target rate: skip the phase work and wait
                // for the next host tick.
                self.ticker.start();
                return;
            }
            // Carry the remainder forward so the achieved rate averages to
            // the target instead of drifting upward.
            self.last_frame_time = time - (elapsed % interval);
            self.state.delta = interval;
        } else {
            self.state.delta = if self.use_nominal_delta {
                NOMINAL_INTERVAL
            } else {
                (time - self.state.timestamp).clamp(MIN_DELTA, self.max_delta)
            };
            self.last_frame_time = time;
        }

        self.state.timestamp = time;
        self.state.is_paused = self.is_paused;
        trace!(
            timestamp = time,
            delta = self.state.delta,
            "tick delivered"
        );

        self.state.is_running = true;
        for phase in Phase::ALL {
            self.run_phase(phase);
        }
        self.state.is_running = false;

        // Keep ticking while recurring work is active or a drain left
        // something queued; otherwise release the host until the next
        // schedule call.
        if !self.is_paused && (self.keep_ticking || self.phases.has_pending()) {
            self.use_nominal_delta = false;
            self.ticker.start();
        } else {
            self.ticker.stop();
        }
    }

    /// Drains one phase, honoring re-entrant triggers.
    fn run_phase(&mut self, phase: Phase) {
        if !self.phases.queue_mut(phase).try_begin() {
            return;
        }
        loop {
            self.phases.queue_mut(phase).swap();
            let mut index = 0;
            while let Some(id) = self.phases.queue(phase).current(index) {
                index += 1;
                // Re-arm recurring callbacks before invoking them, so a
                // callback cancelling itself also removes the re-arm.
                if self.loops.is_marked(id) {
                    self.phases.queue_mut(phase).enqueue(id, false);
                }
                self.invoke(id);
            }
            if !self.phases.queue_mut(phase).finish_pass() {
                break;
            }
        }
    }

    /// Invokes one callback, skipping ids cancelled earlier in the tick.
    fn invoke(&mut self, id: CallbackId) {
        let Some(mut func) = self.callbacks.get_mut(id).and_then(|slot| slot.func.take()) else {
            return;
        };
        let state = self.state;
        func(&state, self);
        // Only recurring callbacks keep their slot. A drained one-shot
        // leaves the arena entirely; a callback that cancelled itself is
        // already gone on both paths.
        if self.loops.is_marked(id) {
            if let Some(slot) = self.callbacks.get_mut(id) {
                slot.func = Some(func);
            }
        } else {
            self.callbacks.remove(id);
        }
    }

    /// Snapshot of the timing state for the current tick.
    pub fn state(&self) -> FrameState {
        self.state
    }

    /// Number of active recurring callbacks.
    pub fn active_loop_count(&self) -> usize {
        self.loops.active_count()
    }

    pub fn is_paused(&self) -> bool {
        self.is_paused
    }

    /// True while a tick request is pending with the host.
    pub fn tick_requested(&self) -> bool {
        self.ticker.is_running()
    }

    /// The host clock's current time in milliseconds.
    pub fn host_now(&self) -> f64 {
        self.clock.now()
    }
}

/// Start/stop adapter that feeds per-frame timestamps to a consumer.
///
/// This is the hook an animation engine uses: `start` registers a recurring
/// update-phase callback that forwards each tick's timestamp to `update`,
/// and `stop` cancels it.
#[derive(Debug, Default)]
pub struct TimestampDriver {
    id: Option<CallbackId>,
}

impl TimestampDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begins forwarding timestamps. Restarting an already-running driver
    /// replaces the previous registration.
    pub fn start<F>(&mut self, engine: &mut FrameEngine, mut update: F)
    where
        F: FnMut(f64) + Send + 'static,
    {
        self.stop(engine);
        let id = engine.schedule(Phase::Update, ScheduleOptions::LOOP, move |state, _| {
            update(state.timestamp);
        });
        self.id = Some(id);
    }

    /// Stops forwarding. No-op if not running.
    pub fn stop(&mut self, engine: &mut FrameEngine) {
        if let Some(id) = self.id.take() {
            engine.cancel(id);
        }
    }
}
