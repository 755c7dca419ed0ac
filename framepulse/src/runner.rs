//! Async host loop that feeds an engine with refresh ticks.
//!
//! [`FrameRunner`] plays the role a display link or `requestAnimationFrame`
//! plays in a windowing host: it delivers one-shot ticks at the configured
//! [`RefreshRate`](crate::config::RefreshRate) whenever the engine has a
//! request pending, and parks on a [`Notify`] while the engine is idle so an
//! idle engine consumes nothing.

use crate::config::FrameConfig;
use crate::engine::FrameEngine;
use crate::time::{MonotonicClock, TickHandle, TickSource};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Notify};
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

/// [`TickSource`] that wakes the runner task when the engine arms itself.
struct NotifySource {
    serial: u64,
    waker: Arc<Notify>,
}

impl TickSource for NotifySource {
    fn request_tick(&mut self) -> TickHandle {
        self.serial += 1;
        self.waker.notify_one();
        TickHandle(self.serial)
    }

    fn cancel_tick(&mut self, _handle: TickHandle) {
        // The drive loop re-checks `tick_requested` before every delivery,
        // so a cancelled request simply never fires.
    }
}

/// Owns a [`FrameEngine`] and drives it from a tokio interval.
pub struct FrameRunner {
    engine: FrameEngine,
    waker: Arc<Notify>,
    period: Duration,
}

impl FrameRunner {
    /// Creates a runner and an engine wired to it.
    pub fn new(config: &FrameConfig) -> Self {
        let waker = Arc::new(Notify::new());
        let source = NotifySource {
            serial: 0,
            waker: waker.clone(),
        };
        let engine = FrameEngine::with_host(
            config,
            Some(Box::new(source)),
            Box::new(MonotonicClock::new()),
        );
        Self {
            engine,
            waker,
            period: config.refresh.period(),
        }
    }

    /// The engine, for registering work before (or while) the runner runs.
    pub fn engine_mut(&mut self) -> &mut FrameEngine {
        &mut self.engine
    }

    /// Runs the drive loop until a Ctrl+C signal is received.
    ///
    /// This method will:
    /// 1. Spawn the drive task that delivers ticks at the refresh cadence.
    /// 2. Wait for a Ctrl+C signal to initiate a graceful shutdown.
    pub async fn run(self) -> anyhow::Result<()> {
        info!(
            period_ms = self.period.as_secs_f64() * 1000.0,
            "frame runner starting"
        );
        let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);

        let driver = tokio::spawn(Self::drive(self.engine, self.waker, self.period, shutdown_rx));

        tokio::signal::ctrl_c().await?;
        info!("Shutdown signal received.");
        if shutdown_tx.send(()).is_err() {
            error!("Failed to send shutdown signal to the drive task.");
        }
        driver.await.ok();
        info!("Frame runner has shut down.");
        Ok(())
    }

    /// The drive loop itself, for embedders that manage their own shutdown.
    pub async fn drive(
        mut engine: FrameEngine,
        waker: Arc<Notify>,
        period: Duration,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            if engine.tick_requested() {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.recv() => break,
                    _ = interval.tick() => {
                        let now = engine.host_now();
                        engine.deliver_tick(now);
                    }
                }
            } else {
                // Idle: park until a schedule call arms the engine.
                tokio::select! {
                    biased;
                    _ = shutdown_rx.recv() => break,
                    _ = waker.notified() => {
                        interval.reset();
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{Phase, ScheduleOptions};
    use std::sync::atomic::{AtomicU64, Ordering};

    #[tokio::test(start_paused = true)]
    async fn drive_loop_delivers_ticks_while_work_is_pending() {
        let config = FrameConfig {
            refresh: crate::config::RefreshRate::Custom { ticks_per_second: 100 },
            ..Default::default()
        };
        let mut runner = FrameRunner::new(&config);

        let count = Arc::new(AtomicU64::new(0));
        let handle: Arc<std::sync::Mutex<Option<crate::common::CallbackId>>> =
            Arc::new(std::sync::Mutex::new(None));
        let (c, slot) = (count.clone(), handle.clone());
        let id = runner
            .engine_mut()
            .schedule(Phase::Update, ScheduleOptions::LOOP, move |_, engine| {
                if c.fetch_add(1, Ordering::Relaxed) + 1 >= 3 {
                    if let Some(id) = *slot.lock().unwrap() {
                        engine.cancel(id);
                    }
                }
            });
        *handle.lock().unwrap() = Some(id);

        let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);
        let FrameRunner { engine, waker, period } = runner;
        let driver = tokio::spawn(FrameRunner::drive(engine, waker, period, shutdown_rx));

        // Give the loop a few simulated frames, then stop it.
        tokio::time::sleep(Duration::from_millis(100)).await;
        shutdown_tx.send(()).unwrap();
        driver.await.unwrap();

        assert_eq!(count.load(Ordering::Relaxed), 3);
    }
}
