use anyhow::Result;
use framepulse::prelude::*;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_target(false)
        .init();

    // 2. Load configuration: framepulse.toml if present, FRAMEPULSE_* env
    //    overrides on top, defaults otherwise.
    let config = FrameConfig::load(None)?;
    info!(?config, "configuration loaded");

    // 3. Create the runner and register demo work against the engine.
    let mut runner = FrameRunner::new(&config);
    register_demo_callbacks(runner.engine_mut());

    // 4. Drive the engine. Shuts down on Ctrl+C.
    runner.run().await?;

    Ok(())
}

/// Registers callbacks that exercise the engine's core behavior.
fn register_demo_callbacks(engine: &mut FrameEngine) {
    // --- A read → update → render pipeline sharing one value ---
    let measured = Arc::new(AtomicU64::new(0));

    let m = measured.clone();
    engine.schedule(Phase::Read, ScheduleOptions::LOOP, move |state, _| {
        // Pretend to measure layout; phase ordering makes this visible to
        // update and render within the same tick.
        m.store(state.timestamp as u64, Ordering::Relaxed);
    });

    let m = measured.clone();
    engine.schedule(Phase::Render, ScheduleOptions::LOOP, move |state, _| {
        let frames = m.load(Ordering::Relaxed) / 1000;
        if state.timestamp as u64 % 1000 < state.delta as u64 {
            info!(seconds = frames, delta_ms = state.delta, "render heartbeat");
        }
    });

    // --- A looping counter that cancels itself after 300 frames ---
    let frames = Arc::new(AtomicU64::new(0));
    let handle: Arc<Mutex<Option<CallbackId>>> = Arc::new(Mutex::new(None));

    let (f, slot) = (frames.clone(), handle.clone());
    let id = engine.schedule(Phase::Update, ScheduleOptions::LOOP, move |state, engine| {
        let n = f.fetch_add(1, Ordering::Relaxed) + 1;
        if n % 60 == 0 {
            info!(frame = n, timestamp_ms = state.timestamp, "update loop");
        }
        if n >= 300 {
            if let Some(id) = *slot.lock().unwrap() {
                engine.cancel(id);
                info!(frame = n, "update loop finished, cancelling itself");
            }
        }
    });
    *handle.lock().unwrap() = Some(id);
}
