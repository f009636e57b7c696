//! Headless sphere simulation
//!
//! Runs the solver for a fixed number of frames and logs progress.
//! Usage: `spheres [config.json]` (RUST_LOG=debug for per-step statistics).

mod config;
mod frame_log;
mod scene;

use config::RunConfig;
use frame_log::{FrameLogger, FrameTimes};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sphere_simulation::{Solver, StepStats};
use std::path::PathBuf;
use std::time::Instant;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger (RUST_LOG=debug for verbose output)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match std::env::args().nth(1).map(PathBuf::from) {
        Some(path) => {
            log::info!("Loading configuration from {:?}", path);
            RunConfig::load(&path)?
        }
        None => RunConfig::default(),
    };

    let seed = config.seed.unwrap_or_else(|| rand::rng().random());
    log::info!("Starting sphere simulation (seed {})...", seed);

    let store = scene::spawn(&config, &mut StdRng::seed_from_u64(seed))?;
    let mut solver = Solver::new(store, config.bounds, config.solver.clone())?;

    let mut logger = FrameLogger::new(config.log_interval);
    let mut frame_times = FrameTimes::new(100);
    let mut totals = StepStats::default();
    let started = Instant::now();

    for iteration in 0..config.frames {
        let frame_start = Instant::now();
        let stats = solver.step(config.dt, iteration);
        frame_times.push(frame_start.elapsed().as_secs_f32() * 1000.0);

        totals.contacts += stats.contacts;
        totals.impulses += stats.impulses;
        totals.wall_hits += stats.wall_hits;
        totals.resets += stats.resets;
        totals.sanitized += stats.sanitized;

        logger.log(|| {
            format!(
                "{} particles, {:.2}ms/step, {} contacts, {} cells (max {}), mean height {:.1}",
                solver.store().count(),
                frame_times.average(),
                stats.contacts,
                stats.occupied_cells,
                stats.max_cell_occupancy,
                scene::summarize(solver.store()).mean_height
            )
        });
    }

    let summary = scene::summarize(solver.store());
    log::info!(
        "✓ Finished {} frames in {:.2}s",
        config.frames,
        started.elapsed().as_secs_f32()
    );
    log::info!(
        "  contacts={} impulses={} wall_hits={} resets={}",
        totals.contacts,
        totals.impulses,
        totals.wall_hits,
        totals.resets
    );
    log::info!(
        "  mean height {:.2}, max speed {:.2}, kinetic energy {:.1}",
        summary.mean_height,
        summary.max_speed,
        summary.kinetic_energy
    );
    if totals.sanitized > 0 {
        log::warn!("{} non-finite components were reset", totals.sanitized);
    }

    Ok(())
}
