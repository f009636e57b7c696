//! Construction-time validation errors
//!
//! Stepping the simulation never fails; numerical trouble inside a step is
//! skipped or clamped instead. These errors only come from building a store
//! or solver with unusable parameters.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PhysicsError {
    #[error("particle radius must be positive and finite, got {0}")]
    InvalidRadius(f32),

    #[error(
        "simulation bounds must be finite and at least {min} (one particle diameter) on every axis, \
         got {width} x {height} x {depth}"
    )]
    InvalidBounds {
        width: f32,
        height: f32,
        depth: f32,
        min: f32,
    },

    #[error("cell factor must be at least {min} to cover touching pairs, got {value}")]
    InvalidCellFactor { value: f32, min: f32 },

    #[error("parameter `{name}` out of range: {value}")]
    InvalidParameter { name: &'static str, value: f32 },

    #[error("particle index {index} out of range (count: {count})")]
    IndexOutOfRange { index: usize, count: usize },

    #[error("particle {index} appears more than once in the reorder permutation")]
    DuplicateIndex { index: usize },

    #[error("position and velocity arrays differ in length ({positions} vs {velocities})")]
    LengthMismatch { positions: usize, velocities: usize },
}
