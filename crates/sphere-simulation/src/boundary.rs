//! Boundary constraints
//!
//! The simulation volume is the box `[0, bounds]`. A particle is kept so that
//! its whole sphere stays inside, i.e. its centre in `[radius, bounds - radius]`
//! on every axis. Side walls and the ceiling clamp and reflect; the floor
//! uses a time-to-impact bounce so fast particles do not gain or lose energy
//! from being clamped late.

use crate::params::{BoundaryMode, BowlConfig, HoleConfig, SolverConfig};
use glam::Vec3;
use sphere_physics::{Axis, ParticleStore};

/// Counts from one boundary pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoundaryStats {
    /// Wall or bowl contacts
    pub wall_hits: usize,
    /// Particles relocated through the hole
    pub resets: usize,
    /// Non-finite position/velocity components replaced
    pub sanitized: usize,
}

/// Apply the configured boundary to every particle.
pub fn apply_boundary_constraints(
    store: &mut ParticleStore,
    bounds: Vec3,
    config: &SolverConfig,
    dt: f32,
    iteration: u64,
) -> BoundaryStats {
    let mut stats = BoundaryStats::default();

    for index in 0..store.count() {
        let radius = Vec3::splat(store.radius(index));
        let lower = radius;
        let upper = bounds - radius;

        stats.sanitized += sanitize(store, index, lower, upper);

        match &config.boundary {
            BoundaryMode::Walls => {}
            BoundaryMode::Hole(hole) => {
                if hole.is_open(iteration)
                    && relocate_through_hole(store, index, hole, lower, upper, iteration)
                {
                    stats.resets += 1;
                    continue;
                }
            }
            BoundaryMode::Bowl(bowl) => {
                if constrain_to_bowl(store, index, bowl, config.wall_dampening) {
                    stats.wall_hits += 1;
                }
            }
        }

        stats.wall_hits += constrain_to_walls(store, index, lower, upper, config, dt);
    }

    stats
}

/// Replace non-finite components: positions go to the middle of the allowed
/// range, velocities to zero. Returns the number of components replaced.
fn sanitize(store: &mut ParticleStore, index: usize, lower: Vec3, upper: Vec3) -> usize {
    let mut replaced = 0;
    for axis in Axis::ALL {
        if !store.position_axis(index, axis).is_finite() {
            let middle = 0.5 * (lower[axis.index()] + upper[axis.index()]);
            store.set_position_axis(index, axis, middle);
            store.set_velocity_axis(index, axis, 0.0);
            replaced += 1;
        }
        if !store.velocity_axis(index, axis).is_finite() {
            store.set_velocity_axis(index, axis, 0.0);
            replaced += 1;
        }
    }
    replaced
}

fn relocate_through_hole(
    store: &mut ParticleStore,
    index: usize,
    hole: &HoleConfig,
    lower: Vec3,
    upper: Vec3,
    iteration: u64,
) -> bool {
    let position = store.position(index);
    let floor = lower[Axis::VERTICAL.index()];
    if position[Axis::VERTICAL.index()] >= floor || !hole.contains(position.x, position.z) {
        return false;
    }

    store.set_position(index, spawn_point(hole, index, iteration).clamp(lower, upper));
    store.set_velocity(index, hole.reset_velocity);
    true
}

/// Deterministic spread over the spawn box (additive recurrence in 3D), so
/// particles relocated in the same step do not land on top of each other.
fn spawn_point(hole: &HoleConfig, index: usize, iteration: u64) -> Vec3 {
    const ALPHA: [f64; 3] = [0.819_172_513_396_164, 0.671_043_606_703_789, 0.549_700_477_901_970];
    let n = (index as u64).wrapping_add(iteration.wrapping_mul(7919)) % (1 << 24);
    let u = ALPHA.map(|a| (0.5 + n as f64 * a).fract() as f32);
    hole.spawn_min + (hole.spawn_max - hole.spawn_min) * Vec3::from_array(u)
}

fn constrain_to_bowl(
    store: &mut ParticleStore,
    index: usize,
    bowl: &BowlConfig,
    dampening: f32,
) -> bool {
    let limit = (bowl.radius - store.radius(index)).max(0.0);
    let offset = store.position(index) - bowl.center;
    if offset.length_squared() <= limit * limit {
        return false;
    }
    let Some(normal) = offset.try_normalize() else {
        return false;
    };

    store.set_position(index, bowl.center + normal * limit);
    let velocity = store.velocity(index);
    let outward = velocity.dot(normal);
    if outward > 0.0 {
        store.set_velocity(index, velocity - normal * (outward * (1.0 + dampening)));
    }
    true
}

fn constrain_to_walls(
    store: &mut ParticleStore,
    index: usize,
    lower: Vec3,
    upper: Vec3,
    config: &SolverConfig,
    dt: f32,
) -> usize {
    let dampening = config.wall_dampening;
    let mut hits = 0;

    for axis in Axis::ALL {
        let low = lower[axis.index()];
        let high = upper[axis.index()];
        let mut position = store.position_axis(index, axis);
        let mut velocity = store.velocity_axis(index, axis);
        let before = (position, velocity);

        if position < low {
            hits += 1;
            (position, velocity) = if axis == Axis::VERTICAL {
                floor_bounce(position, velocity, low, config.gravity, dt, dampening)
            } else {
                (low, reflect(velocity, -1.0, dampening))
            };
        }
        if position > high {
            hits += 1;
            (position, velocity) = (high, reflect(velocity, 1.0, dampening));
        }

        if (position, velocity) != before {
            store.set_position_axis(index, axis, position);
            store.set_velocity_axis(index, axis, velocity);
        }
    }

    hits
}

/// Flip and damp `velocity` if it points out through a wall facing `outward`.
fn reflect(velocity: f32, outward: f32, dampening: f32) -> f32 {
    if velocity * outward > 0.0 {
        -velocity * dampening
    } else {
        velocity
    }
}

/// Bounce off the floor at height `floor` for a particle currently at `y`
/// (below the floor) moving with `vy` under constant `gravity`.
///
/// Works back to the instant within the last `dt` at which the particle
/// crossed the floor, reflects and damps the velocity it had at that
/// instant, then integrates forward again over the remaining time. Falls
/// back to clamp-and-reflect when no crossing inside the step exists (for
/// example a particle placed below the floor from outside).
pub fn floor_bounce(
    y: f32,
    vy: f32,
    floor: f32,
    gravity: f32,
    dt: f32,
    dampening: f32,
) -> (f32, f32) {
    // only the velocity from the start of the step is reflected, so gravity
    // gained while resting on the floor never turns into an upward kick
    let clamped = (floor, reflect(vy - gravity * dt, -1.0, dampening));

    let Some(since) = time_since_impact(y - floor, vy, gravity, dt) else {
        return clamped;
    };
    let impact_velocity = vy - gravity * since;
    if impact_velocity >= 0.0 {
        return clamped;
    }

    let bounce = -impact_velocity * dampening;
    let y_after = floor + bounce * since + 0.5 * gravity * since * since;
    let vy_after = bounce + gravity * since;
    if y_after < floor {
        // too slow to climb back out within the step: rest on the floor
        (floor, vy_after.max(0.0))
    } else {
        (y_after, vy_after)
    }
}

/// Smallest `t` in `(0, dt]` with `depth - vy * t + 0.5 * gravity * t² = 0`,
/// i.e. how long ago the particle was exactly at the floor.
fn time_since_impact(depth: f32, vy: f32, gravity: f32, dt: f32) -> Option<f32> {
    let a = 0.5 * gravity;
    let b = -vy;
    let c = depth;

    let since = if a.abs() < f32::EPSILON {
        if b == 0.0 {
            return None;
        }
        -c / b
    } else {
        let discriminant = b * b - 4.0 * a * c;
        if discriminant < 0.0 {
            return None;
        }
        let root = discriminant.sqrt();
        [(-b - root) / (2.0 * a), (-b + root) / (2.0 * a)]
            .into_iter()
            .filter(|t| *t > 0.0)
            .fold(f32::INFINITY, f32::min)
    };

    // slack for rounding when the crossing is right at the start of the step
    (since.is_finite() && since > 0.0 && since <= dt * (1.0 + 1e-4)).then_some(since.min(dt))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOUNDS: Vec3 = Vec3::new(100.0, 80.0, 60.0);

    fn store_with(position: Vec3, velocity: Vec3) -> ParticleStore {
        ParticleStore::from_parts(2.0, vec![position], vec![velocity]).unwrap()
    }

    fn apply(store: &mut ParticleStore, config: &SolverConfig) -> BoundaryStats {
        apply_boundary_constraints(store, BOUNDS, config, 0.05, 0)
    }

    #[test]
    fn test_floor_bounce_recovers_crossing_instant() {
        // hit the floor at -10 exactly 0.01 ago under g = -100
        let (y, vy) = floor_bounce(-0.105, -11.0, 0.0, -100.0, 0.05, 1.0);
        assert!((y - 0.095).abs() < 1e-4, "y = {}", y);
        assert!((vy - 9.0).abs() < 1e-3, "vy = {}", vy);
    }

    #[test]
    fn test_floor_bounce_damps_impact_speed() {
        let (_, vy) = floor_bounce(-0.105, -11.0, 0.0, -100.0, 0.05, 0.5);
        // 0.5 * 10 up, minus g * 0.01
        assert!((vy - 4.0).abs() < 1e-3);
    }

    #[test]
    fn test_floor_bounce_without_gravity() {
        let (y, vy) = floor_bounce(-0.1, -10.0, 0.0, 0.0, 0.05, 1.0);
        assert!((y - 0.1).abs() < 1e-5);
        assert!((vy - 10.0).abs() < 1e-5);
    }

    #[test]
    fn test_floor_bounce_falls_back_to_clamp() {
        // placed deep below the floor, far more than one step of travel
        // entered the step moving down at 1, left it at 6
        let (y, vy) = floor_bounce(-50.0, -6.0, 0.0, -100.0, 0.05, 0.8);
        assert_eq!(y, 0.0);
        assert!((vy - 0.8).abs() < 1e-5);

        // already moving up
        let (y, vy) = floor_bounce(-0.5, 3.0, 0.0, -100.0, 0.05, 0.8);
        assert_eq!(y, 0.0);
        assert!((vy - 8.0).abs() < 1e-5);
    }

    #[test]
    fn test_floor_bounce_resting_particle_gains_nothing() {
        let (gravity, dt) = (-100.0_f32, 0.05_f32);
        let (y, vy) = floor_bounce(0.5 * gravity * dt * dt, gravity * dt, 0.0, gravity, dt, 0.8);
        assert_eq!(y, 0.0);
        assert!(vy.abs() < 1e-4, "vy = {}", vy);
    }

    #[test]
    fn test_side_walls_clamp_and_reflect() {
        let mut store = store_with(Vec3::new(-1.0, 40.0, 65.0), Vec3::new(-5.0, 0.0, 4.0));
        let stats = apply(&mut store, &SolverConfig::default());

        assert_eq!(stats.wall_hits, 2);
        assert_eq!(store.position(0), Vec3::new(2.0, 40.0, 58.0));
        assert!((store.velocity(0).x - 4.0).abs() < 1e-6);
        assert!((store.velocity(0).z + 3.2).abs() < 1e-6);
    }

    #[test]
    fn test_wall_keeps_inward_velocity() {
        let mut store = store_with(Vec3::new(1.0, 40.0, 30.0), Vec3::new(5.0, 0.0, 0.0));
        apply(&mut store, &SolverConfig::default());
        assert_eq!(store.position(0).x, 2.0);
        assert_eq!(store.velocity(0).x, 5.0);
    }

    #[test]
    fn test_ceiling() {
        let mut store = store_with(Vec3::new(50.0, 79.5, 30.0), Vec3::new(0.0, 10.0, 0.0));
        apply(&mut store, &SolverConfig::default());
        assert_eq!(store.position(0).y, 78.0);
        assert!((store.velocity(0).y + 8.0).abs() < 1e-6);
    }

    #[test]
    fn test_inside_particle_untouched() {
        let mut store = store_with(Vec3::new(50.0, 40.0, 30.0), Vec3::new(1.0, 2.0, 3.0));
        let before = store.clone();
        let stats = apply(&mut store, &SolverConfig::default());
        assert_eq!(stats, BoundaryStats::default());
        assert_eq!(store, before);
    }

    #[test]
    fn test_non_finite_values_are_sanitized() {
        let mut store = store_with(
            Vec3::new(f32::NAN, 40.0, 30.0),
            Vec3::new(1.0, f32::INFINITY, 0.0),
        );
        let stats = apply(&mut store, &SolverConfig::default());

        assert_eq!(stats.sanitized, 2);
        assert!(store.position(0).is_finite());
        assert!(store.velocity(0).is_finite());
        assert_eq!(store.position(0).x, 50.0);
        assert_eq!(store.velocity(0), Vec3::ZERO);
    }

    #[test]
    fn test_hole_relocates_instead_of_bouncing() {
        let hole = HoleConfig {
            center_x: 50.0,
            center_z: 30.0,
            radius: 10.0,
            spawn_min: Vec3::new(10.0, 60.0, 10.0),
            spawn_max: Vec3::new(20.0, 70.0, 20.0),
            reset_velocity: Vec3::new(0.0, -5.0, 0.0),
            ..Default::default()
        };
        let config = SolverConfig::default().with_boundary(BoundaryMode::Hole(hole));

        let mut store = store_with(Vec3::new(52.0, 1.0, 31.0), Vec3::new(0.0, -20.0, 0.0));
        let stats = apply(&mut store, &config);

        assert_eq!(stats.resets, 1);
        assert_eq!(stats.wall_hits, 0);
        let p = store.position(0);
        assert!(p.cmpge(hole.spawn_min).all() && p.cmple(hole.spawn_max).all());
        assert_eq!(store.velocity(0), hole.reset_velocity);

        // outside the opening the floor still bounces
        let mut store = store_with(Vec3::new(5.0, 1.0, 5.0), Vec3::new(0.0, -20.0, 0.0));
        let stats = apply(&mut store, &config);
        assert_eq!(stats.resets, 0);
        assert!(store.position(0).y >= 2.0);
        assert!(store.velocity(0).y > 0.0);
    }

    #[test]
    fn test_closed_hole_acts_as_floor() {
        let hole = HoleConfig {
            center_x: 50.0,
            center_z: 30.0,
            radius: 10.0,
            cycle: 10,
            open_steps: 2,
            ..Default::default()
        };
        let config = SolverConfig::default().with_boundary(BoundaryMode::Hole(hole));
        let mut store = store_with(Vec3::new(50.0, 1.0, 30.0), Vec3::new(0.0, -20.0, 0.0));

        let stats = apply_boundary_constraints(&mut store, BOUNDS, &config, 0.05, 5);
        assert_eq!(stats.resets, 0);
        assert!(store.position(0).y >= 2.0);
    }

    #[test]
    fn test_spawn_points_spread_out() {
        let hole = HoleConfig {
            spawn_min: Vec3::ZERO,
            spawn_max: Vec3::splat(10.0),
            ..Default::default()
        };
        let a = spawn_point(&hole, 0, 3);
        let b = spawn_point(&hole, 1, 3);
        assert_ne!(a, b);
        for p in [a, b] {
            assert!(p.cmpge(Vec3::ZERO).all() && p.cmple(Vec3::splat(10.0)).all());
        }
    }

    #[test]
    fn test_bowl_projects_and_reflects() {
        let bowl = BowlConfig {
            center: Vec3::new(50.0, 40.0, 30.0),
            radius: 20.0,
        };
        let config = SolverConfig::default()
            .with_wall_dampening(1.0)
            .with_boundary(BoundaryMode::Bowl(bowl));
        let mut store = store_with(Vec3::new(75.0, 40.0, 30.0), Vec3::new(6.0, 1.0, 0.0));

        let stats = apply(&mut store, &config);

        assert_eq!(stats.wall_hits, 1);
        let p = store.position(0);
        assert!((p - Vec3::new(68.0, 40.0, 30.0)).length() < 1e-4);
        let v = store.velocity(0);
        assert!((v - Vec3::new(-6.0, 1.0, 0.0)).length() < 1e-4);
    }
}
