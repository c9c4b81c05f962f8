//! Headless weft demo: a scrolling gradient rendered by every worker.
//!
//! Demonstrates:
//!   1. Loading an `EngineConfig` (TOML path as the first argument, or defaults)
//!   2. Writing a `FrameTask` that draws its own rows
//!   3. Driving the engine with `DisplayDriver` for a fixed number of frames
//!   4. Reading `EngineEvent::Stats` and shutting down
//!
//! Run with:
//!   cargo run --example headless [config.toml]

use std::sync::Arc;

use weft_core::{EngineConfig, PresentError, WorkerIdx};
use weft_engine::{DisplayDriver, Engine, EngineEvent, FrameContext, FrameImage, FrameTask};
use weft_memory::rgba;

const FRAMES: u64 = 180;

// ─── Frame task ─────────────────────────────────────────────────

struct Gradient;

impl FrameTask for Gradient {
    fn render(&mut self, frame: &mut FrameContext<'_>) {
        let fb = frame.frame_buffer();
        let shift = (frame.frame_start_us() / 10_000) as u32;
        let tint = (frame.worker().0 * 40) as u8;
        for y in frame.rows() {
            for x in 0..fb.width() {
                let v = x.wrapping_add(y).wrapping_add(shift) as u8;
                fb.set_pixel(x, y, rgba(v, v / 2, tint, 0xFF));
            }
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::from_path(&path)?,
        None => EngineConfig::default(),
    };
    println!(
        "{}x{} frame, {} workers, {} UPS, {} RPS",
        config.frame_width, config.frame_height, config.num_workers, config.target_ups, config.target_rps
    );

    let (surface_width, surface_height) = (config.frame_width, config.frame_height);
    let driver = DisplayDriver::new(&config).max_frames(FRAMES);
    let mut engine = Engine::build(config, Arc::new(|_: WorkerIdx| Box::new(Gradient) as Box<dyn FrameTask>))?;
    let events = engine.events();

    let mut checksum = 0u64;
    let mut sink = |image: &FrameImage| -> Result<(), PresentError> {
        image.check_size(surface_width, surface_height)?;
        checksum = image
            .pixels()
            .iter()
            .fold(checksum, |acc, &p| acc.rotate_left(5) ^ u64::from(p));
        Ok(())
    };
    let ticks = driver.run(&mut engine, &mut sink)?;

    for event in events.try_iter() {
        let EngineEvent::Stats(values) = event;
        println!(
            "FPS {:>6.1}  UPS {:>6.1}  UFPS {:>8.1}  MEM {:>6.3} MiB",
            values.fps.unwrap_or(0.0),
            values.ups.unwrap_or(0.0),
            values.ufps.unwrap_or(0.0),
            values.mem.unwrap_or(0.0),
        );
    }

    let report = engine.shutdown();
    println!(
        "{ticks} ticks, {} presented, {} workers joined, checksum {checksum:016x}",
        report.frames_presented, report.workers_joined
    );
    Ok(())
}
