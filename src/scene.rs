//! Initial particle cloud and end-of-run summary

use crate::config::{RunConfig, SpawnConfig};
use glam::Vec3;
use rand::Rng;
use sphere_physics::{ParticleStore, PhysicsError};

/// Fill a store with a jittered cube of particles moving along a swirl of
/// directions. Positions are clamped into the box.
pub fn spawn<R: Rng>(config: &RunConfig, rng: &mut R) -> Result<ParticleStore, PhysicsError> {
    let mut store = ParticleStore::new(config.particle_count, config.radius)?;

    let lower = Vec3::splat(config.radius);
    let upper = config.bounds - lower;
    if !upper.cmpge(lower).all() {
        return Err(PhysicsError::InvalidBounds {
            width: config.bounds.x,
            height: config.bounds.y,
            depth: config.bounds.z,
            min: 2.0 * config.radius,
        });
    }

    let SpawnConfig {
        origin_fraction,
        spread,
        speed,
        swirl,
    } = config.spawn;
    let origin = origin_fraction * config.bounds;

    for i in 0..store.count() {
        let jitter = Vec3::new(rng.random(), rng.random(), rng.random()) * spread;
        store.set_position(i, (origin + jitter).clamp(lower, upper));

        let phase = i as f32 * swirl;
        store.set_velocity(i, Vec3::new(phase.cos(), phase.sin(), phase.sin()) * speed);
    }

    log::info!(
        "✓ Spawned {} particles (radius {}) around {:?}",
        store.count(),
        config.radius,
        origin
    );
    Ok(store)
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Summary {
    pub mean_height: f32,
    pub max_speed: f32,
    /// Sum of 0.5 * |v|^2 (unit mass)
    pub kinetic_energy: f32,
}

pub fn summarize(store: &ParticleStore) -> Summary {
    if store.is_empty() {
        return Summary::default();
    }

    let mut summary = Summary::default();
    store.for_each(|s, i| {
        let v = s.velocity(i);
        summary.mean_height += s.position(i).y;
        summary.max_speed = summary.max_speed.max(v.length());
        summary.kinetic_energy += 0.5 * v.length_squared();
    });
    summary.mean_height /= store.count() as f32;
    summary
}
