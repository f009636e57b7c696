//! # Sphere Simulation
//!
//! CPU solver that advances a [`sphere_physics::ParticleStore`] once per
//! frame: integration, boundary constraints, grid broad phase and pair
//! resolution, configured through [`SolverConfig`].

pub mod boundary;
pub mod params;
pub mod solver;

pub use boundary::*;
pub use params::*;
pub use solver::*;
