//! # Sphere Physics Engine
//!
//! Core data and math for simulating a large population of equal-sized spheres:
//! structure-of-arrays particle storage, a uniform hash grid for finding
//! candidate contacts, and the per-pair collision/cohesion response.

pub mod constants;
pub mod contact;
pub mod error;
pub mod grid;
pub mod store;

pub use constants::*;
pub use contact::*;
pub use error::*;
pub use grid::*;
pub use store::*;
