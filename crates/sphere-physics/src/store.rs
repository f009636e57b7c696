//! Structure-of-arrays particle storage
//!
//! Every particle is an index into two dense arrays (positions and velocities)
//! that are allocated once and never grow or shrink. Passes over the
//! population stream through contiguous memory, and a renderer can read the
//! position array directly after each step.

use crate::error::PhysicsError;
use glam::Vec3;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Coordinate axis for the per-axis accessors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X = 0,
    Y = 1,
    Z = 2,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Gravity acts along this axis only
    pub const VERTICAL: Axis = Axis::Y;

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Positions and velocities for a fixed population of equal-radius spheres
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleStore {
    radius: f32,
    positions: Vec<Vec3>,
    velocities: Vec<Vec3>,
}

impl ParticleStore {
    /// Allocate `count` particles at the origin, at rest.
    pub fn new(count: usize, radius: f32) -> Result<Self, PhysicsError> {
        Self::from_parts(radius, vec![Vec3::ZERO; count], vec![Vec3::ZERO; count])
    }

    /// Build a store from existing state. Both arrays must have the same length.
    pub fn from_parts(
        radius: f32,
        positions: Vec<Vec3>,
        velocities: Vec<Vec3>,
    ) -> Result<Self, PhysicsError> {
        if !(radius.is_finite() && radius > 0.0) {
            return Err(PhysicsError::InvalidRadius(radius));
        }
        if positions.len() != velocities.len() {
            return Err(PhysicsError::LengthMismatch {
                positions: positions.len(),
                velocities: velocities.len(),
            });
        }
        Ok(Self {
            radius,
            positions,
            velocities,
        })
    }

    pub fn count(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Radius of particle `index`. Currently shared by all particles.
    #[inline]
    pub fn radius(&self, _index: usize) -> f32 {
        self.radius
    }

    /// Advance every particle by `dt`.
    ///
    /// Semi-implicit update: position moves with the current velocity, the
    /// velocity is scaled by `drag`, then gravity is added on the vertical
    /// axis to both position (`0.5 * g * dt²`) and velocity (`g * dt`).
    pub fn integrate(&mut self, dt: f32, gravity: f32, drag: f32) {
        let fall = 0.5 * gravity * dt * dt;
        let kick = gravity * dt;
        let advance = move |(position, velocity): (&mut Vec3, &mut Vec3)| {
            *position += *velocity * dt;
            *velocity *= drag;
            position.y += fall;
            velocity.y += kick;
        };

        #[cfg(feature = "parallel")]
        self.positions
            .par_iter_mut()
            .zip(self.velocities.par_iter_mut())
            .for_each(advance);

        #[cfg(not(feature = "parallel"))]
        self.positions
            .iter_mut()
            .zip(self.velocities.iter_mut())
            .for_each(advance);
    }

    /// Visit every particle in index order.
    pub fn for_each<F: FnMut(&Self, usize)>(&self, mut f: F) {
        for index in 0..self.count() {
            f(self, index);
        }
    }

    // Accessors index the arrays directly; callers only produce indices in
    // `[0, count)`, and an out-of-range index panics.

    #[inline]
    pub fn position(&self, index: usize) -> Vec3 {
        self.positions[index]
    }

    #[inline]
    pub fn velocity(&self, index: usize) -> Vec3 {
        self.velocities[index]
    }

    #[inline]
    pub fn set_position(&mut self, index: usize, position: Vec3) {
        self.positions[index] = position;
    }

    #[inline]
    pub fn set_velocity(&mut self, index: usize, velocity: Vec3) {
        self.velocities[index] = velocity;
    }

    #[inline]
    pub fn position_axis(&self, index: usize, axis: Axis) -> f32 {
        self.positions[index][axis.index()]
    }

    #[inline]
    pub fn velocity_axis(&self, index: usize, axis: Axis) -> f32 {
        self.velocities[index][axis.index()]
    }

    #[inline]
    pub fn set_position_axis(&mut self, index: usize, axis: Axis, value: f32) {
        self.positions[index][axis.index()] = value;
    }

    #[inline]
    pub fn set_velocity_axis(&mut self, index: usize, axis: Axis, value: f32) {
        self.velocities[index][axis.index()] = value;
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn velocities(&self) -> &[Vec3] {
        &self.velocities
    }

    /// Raw bytes of the position array (tightly packed `[f32; 3]`), ready
    /// for upload into an instance buffer.
    pub fn position_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.positions)
    }

    /// Permute the population so that new index `k` holds the particle that
    /// was at `order[k]`. `order` must be a permutation of `0..count`.
    pub fn reorder(&mut self, order: &[usize]) -> Result<(), PhysicsError> {
        let count = self.count();
        if order.len() != count {
            return Err(PhysicsError::LengthMismatch {
                positions: count,
                velocities: order.len(),
            });
        }

        let mut seen = vec![false; count];
        for &index in order {
            if index >= count {
                return Err(PhysicsError::IndexOutOfRange { index, count });
            }
            if std::mem::replace(&mut seen[index], true) {
                return Err(PhysicsError::DuplicateIndex { index });
            }
        }

        self.positions = order.iter().map(|&i| self.positions[i]).collect();
        self.velocities = order.iter().map(|&i| self.velocities[i]).collect();
        Ok(())
    }
}
