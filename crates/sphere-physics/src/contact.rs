//! Pairwise response between two particles
//!
//! Hard contacts get a restitution impulse (only while approaching) plus a
//! soft positional correction. The optional cohesion response is a weak,
//! distance-dependent velocity impulse used for clumping.
//!
//! NOTE: All particles share one mass, so the impulse divides by
//! `2 * INV_MASS`. Nothing is written back unless every new value is finite.

use crate::constants::{DEGENERATE_DISTANCE, INV_MASS};
use crate::store::ParticleStore;
use glam::Vec3;

/// Parameters for hard contacts
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactParams {
    /// Restitution coefficient in [0, 1]
    pub restitution: f32,
    /// Fraction of the overlap removed per resolution pass
    pub positional_correction: f32,
}

/// Parameters for the cohesion response
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CohesionParams {
    /// Interaction reach as a multiple of the contact distance (> 1)
    pub radius_factor: f32,
    /// Peak velocity change per second
    pub strength: f32,
}

/// What happened to a candidate pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactOutcome {
    /// Not overlapping
    Apart,
    /// Centres coincide (or are NaN); no normal, nothing applied
    Degenerate,
    /// Overlapping but not approaching: positional correction only
    Separating,
    /// Overlapping and approaching: impulse and positional correction
    Impulse,
    /// The response produced non-finite state and was discarded
    NonFinite,
}

impl ContactOutcome {
    pub fn is_contact(self) -> bool {
        matches!(self, ContactOutcome::Separating | ContactOutcome::Impulse)
    }
}

/// Unit normal pointing from `j` to `i` and the centre distance, or `None`
/// when the centres are too close to define a direction.
fn contact_normal(store: &ParticleStore, i: usize, j: usize) -> Option<(Vec3, f32)> {
    let axis = store.position(i) - store.position(j);
    let distance = axis.length();
    // also rejects NaN
    if !(distance > DEGENERATE_DISTANCE) {
        return None;
    }
    Some((axis / distance, distance))
}

/// Resolve a hard contact between `i` and `j`.
pub fn resolve_collision(
    store: &mut ParticleStore,
    i: usize,
    j: usize,
    params: &ContactParams,
) -> ContactOutcome {
    let min_distance = store.radius(i) + store.radius(j);
    let separation = store.position(i) - store.position(j);
    if separation.length_squared() >= min_distance * min_distance {
        return ContactOutcome::Apart;
    }

    let Some((normal, distance)) = contact_normal(store, i, j) else {
        return ContactOutcome::Degenerate;
    };

    let mut velocity_i = store.velocity(i);
    let mut velocity_j = store.velocity(j);
    let along_normal = (velocity_i - velocity_j).dot(normal);

    let outcome = if along_normal < 0.0 {
        let impulse = -(1.0 + params.restitution) * along_normal / (INV_MASS + INV_MASS);
        velocity_i += normal * (impulse * INV_MASS);
        velocity_j -= normal * (impulse * INV_MASS);
        ContactOutcome::Impulse
    } else {
        ContactOutcome::Separating
    };

    let push = normal * (0.5 * params.positional_correction * (min_distance - distance));
    let position_i = store.position(i) + push;
    let position_j = store.position(j) - push;

    if !(position_i.is_finite()
        && position_j.is_finite()
        && velocity_i.is_finite()
        && velocity_j.is_finite())
    {
        return ContactOutcome::NonFinite;
    }

    store.set_position(i, position_i);
    store.set_position(j, position_j);
    store.set_velocity(i, velocity_i);
    store.set_velocity(j, velocity_j);
    outcome
}

/// Cohesion profile over centre distance `d`, for contact distance `contact`
/// and reach `reach`.
///
/// Negative (repulsive) inside contact distance, positive (attractive) between
/// contact and reach, zero at both ends and continuous everywhere in `[0, reach]`.
pub fn cohesion_profile(d: f32, contact: f32, reach: f32) -> f32 {
    if d >= reach {
        0.0
    } else if d < contact {
        (d - contact) / contact
    } else {
        let t = (d - contact) / (reach - contact);
        4.0 * t * (1.0 - t)
    }
}

/// Apply the cohesion impulse between `i` and `j`. Returns whether anything
/// was applied.
pub fn apply_cohesion(
    store: &mut ParticleStore,
    i: usize,
    j: usize,
    params: &CohesionParams,
    dt: f32,
) -> bool {
    let contact = store.radius(i) + store.radius(j);
    let reach = contact * params.radius_factor;
    let separation = store.position(i) - store.position(j);
    if separation.length_squared() >= reach * reach {
        return false;
    }
    let Some((normal, distance)) = contact_normal(store, i, j) else {
        return false;
    };

    let strength = params.strength * cohesion_profile(distance, contact, reach) * dt;
    // positive strength pulls the pair together
    let delta = normal * (0.5 * strength);
    let velocity_i = store.velocity(i) - delta;
    let velocity_j = store.velocity(j) + delta;
    if !(velocity_i.is_finite() && velocity_j.is_finite()) {
        return false;
    }

    store.set_velocity(i, velocity_i);
    store.set_velocity(j, velocity_j);
    strength != 0.0
}
