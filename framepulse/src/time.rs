//! Host timing capabilities and the tick driver.
//!
//! The engine treats the host purely as two capabilities: a monotonic
//! [`Clock`] and a one-shot [`TickSource`] ("request a callback at the next
//! display refresh" / "cancel a pending request"). [`TickDriver`] is the thin
//! idle/running state machine the engine uses to arm and disarm the source.
//! An engine constructed without a source is inert rather than an error.

use std::time::Instant;

/// An opaque handle for a pending tick request, minted by a [`TickSource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TickHandle(pub u64);

/// One-shot host refresh signal.
///
/// `request_tick` asks the host to deliver exactly one tick at the next
/// refresh; the host then calls
/// [`FrameEngine::deliver_tick`](crate::engine::FrameEngine::deliver_tick)
/// with its current timestamp. This is not a recurring subscription: the
/// engine re-requests explicitly after each delivered tick.
pub trait TickSource: Send {
    /// Requests one tick at the next refresh.
    fn request_tick(&mut self) -> TickHandle;

    /// Cancels a pending request. Must tolerate handles that already fired.
    fn cancel_tick(&mut self, handle: TickHandle);
}

/// Monotonic time in milliseconds, in the same unit as tick timestamps.
pub trait Clock: Send {
    fn now(&self) -> f64;
}

/// Production [`Clock`] backed by [`std::time::Instant`], measuring
/// milliseconds since construction.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// A [`TickSource`] for hosts that poll
/// [`tick_requested`](crate::engine::FrameEngine::tick_requested) from their
/// own loop.
///
/// Requests are granted unconditionally; the host checks `tick_requested`
/// before each delivery, so a cancelled request simply never fires.
#[derive(Debug, Default)]
pub struct PollSource {
    serial: u64,
}

impl PollSource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TickSource for PollSource {
    fn request_tick(&mut self) -> TickHandle {
        self.serial += 1;
        TickHandle(self.serial)
    }

    fn cancel_tick(&mut self, _handle: TickHandle) {}
}

/// Idle/running state machine over an optional [`TickSource`].
///
/// `running` means a one-shot request is pending with the host. Delivery
/// acknowledges the request (back to idle) before the engine decides whether
/// to start again. Without a source every transition is a safe no-op.
pub(crate) struct TickDriver {
    source: Option<Box<dyn TickSource>>,
    pending: Option<TickHandle>,
}

impl TickDriver {
    pub(crate) fn new(source: Option<Box<dyn TickSource>>) -> Self {
        Self {
            source,
            pending: None,
        }
    }

    /// Requests the next tick. No-op if a request is already pending or no
    /// source exists.
    pub(crate) fn start(&mut self) {
        if self.pending.is_some() {
            return;
        }
        if let Some(source) = self.source.as_mut() {
            self.pending = Some(source.request_tick());
        }
    }

    /// Cancels any pending request and forces idle.
    pub(crate) fn stop(&mut self) {
        if let Some(handle) = self.pending.take() {
            if let Some(source) = self.source.as_mut() {
                source.cancel_tick(handle);
            }
        }
    }

    /// Marks the pending request as delivered, transitioning to idle.
    pub(crate) fn acknowledge(&mut self) {
        self.pending = None;
    }

    pub(crate) fn is_running(&self) -> bool {
        self.pending.is_some()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Arc, Mutex};

    /// A [`TickSource`] that records requests and cancellations so tests can
    /// observe the engine's arming decisions while delivering ticks by hand.
    pub(crate) struct ManualTicker {
        serial: u64,
        requested: Arc<AtomicU64>,
        cancelled: Arc<AtomicU64>,
    }

    impl ManualTicker {
        pub(crate) fn new() -> (Self, Arc<AtomicU64>, Arc<AtomicU64>) {
            let requested = Arc::new(AtomicU64::new(0));
            let cancelled = Arc::new(AtomicU64::new(0));
            let ticker = Self {
                serial: 0,
                requested: requested.clone(),
                cancelled: cancelled.clone(),
            };
            (ticker, requested, cancelled)
        }
    }

    impl TickSource for ManualTicker {
        fn request_tick(&mut self) -> TickHandle {
            self.serial += 1;
            self.requested.fetch_add(1, Ordering::Relaxed);
            TickHandle(self.serial)
        }

        fn cancel_tick(&mut self, _handle: TickHandle) {
            self.cancelled.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// A [`Clock`] whose current time is set explicitly by the test.
    #[derive(Clone)]
    pub(crate) struct TestClock {
        now: Arc<Mutex<f64>>,
    }

    impl TestClock {
        pub(crate) fn new() -> Self {
            Self {
                now: Arc::new(Mutex::new(0.0)),
            }
        }

        pub(crate) fn set(&self, now: f64) {
            *self.now.lock().unwrap() = now;
        }
    }

    impl Clock for TestClock {
        fn now(&self) -> f64 {
            *self.now.lock().unwrap()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::ManualTicker;
    use super::*;
    use std::sync::atomic::Ordering;

    #[test]
    fn start_is_one_shot_until_acknowledged() {
        let (ticker, requested, _) = ManualTicker::new();
        let mut driver = TickDriver::new(Some(Box::new(ticker)));

        driver.start();
        driver.start();
        assert_eq!(requested.load(Ordering::Relaxed), 1);
        assert!(driver.is_running());

        driver.acknowledge();
        assert!(!driver.is_running());
        driver.start();
        assert_eq!(requested.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn stop_cancels_the_pending_request() {
        let (ticker, requested, cancelled) = ManualTicker::new();
        let mut driver = TickDriver::new(Some(Box::new(ticker)));

        driver.stop();
        assert_eq!(cancelled.load(Ordering::Relaxed), 0);

        driver.start();
        driver.stop();
        assert_eq!(requested.load(Ordering::Relaxed), 1);
        assert_eq!(cancelled.load(Ordering::Relaxed), 1);
        assert!(!driver.is_running());
    }

    #[test]
    fn missing_source_degrades_to_noop() {
        let mut driver = TickDriver::new(None);
        driver.start();
        assert!(!driver.is_running());
        driver.stop();
        driver.acknowledge();
    }

    #[test]
    fn monotonic_clock_does_not_go_backwards() {
        let clock = MonotonicClock::new();
        let first = clock.now();
        let second = clock.now();
        assert!(second >= first);
    }
}
